use chrono::NaiveDate;
use std::path::PathBuf;

mod audit;
mod backfill;
mod common;
mod download;
mod klines;
mod scan;
mod tidy;
mod to_json;
mod verify;

pub use to_json::RecordKind;

pub enum Command {
    Download { from: NaiveDate, to: NaiveDate },
    Verify { dir: Option<PathBuf> },
    ScanGaps { dir: Option<PathBuf>, since: Option<NaiveDate> },
    Backfill { since: Option<NaiveDate> },
    Tidy,
    Klines { interval: Option<String>, dir: Option<PathBuf>, format: String },
    AuditKlines { file: PathBuf, interval: Option<String> },
    ToJson {
        record: RecordKind,
        from_dir: PathBuf,
        to_dir: PathBuf,
        parallelism: Option<usize>,
    },
}

pub fn run(config_path: Option<PathBuf>, command: Command) -> Result<(), String> {
    match command {
        Command::Download { from, to } => {
            download::run_download(&common::load(config_path)?, from, to)
        }
        Command::Verify { dir } => verify::run_verify(&common::load(config_path)?, dir),
        Command::ScanGaps { dir, since } => {
            scan::run_scan_gaps(&common::load(config_path)?, dir, since)
        }
        Command::Backfill { since } => backfill::run_backfill(&common::load(config_path)?, since),
        Command::Tidy => tidy::run_tidy(&common::load(config_path)?),
        Command::Klines {
            interval,
            dir,
            format,
        } => klines::run_klines(&common::load(config_path)?, interval.as_deref(), dir, &format),
        // Standalone files; no config needed.
        Command::AuditKlines { file, interval } => {
            audit::run_audit_klines(&file, interval.as_deref())
        }
        Command::ToJson {
            record,
            from_dir,
            to_dir,
            parallelism,
        } => to_json::run_to_json(record, &from_dir, &to_dir, parallelism),
    }
}
