use chrono::NaiveDate;
use serde::Serialize;
use std::path::PathBuf;
use tickvault_application::config::Config;
use tickvault_application::files::{day_file_name, ensure_dir};
use tickvault_infrastructure::archive::{archive_url, extract_single_entry, DownloadOutcome};

#[derive(Debug, Default, Serialize)]
struct DownloadReport {
    days: usize,
    downloaded: usize,
    already_present: usize,
    extracted: Vec<PathBuf>,
}

/// Fetches one archive per day in `from..=to` and extracts each into raw_dir.
///
/// Archives are kept under `<raw_dir>/archives` so reruns skip finished days.
pub(super) fn run_download(config: &Config, from: NaiveDate, to: NaiveDate) -> Result<(), String> {
    if to < from {
        return Err(format!("--to {to} is before --from {from}"));
    }
    let deps = crate::infra::build_archive_deps(config)?;
    let raw_dir = config.raw_dir();
    let archive_dir = raw_dir.join("archives");
    ensure_dir(&archive_dir).map_err(|err| err.to_string())?;

    let symbol = &config.run.symbol;
    let kind = config.run.kind;
    let mut report = DownloadReport::default();
    for date in from.iter_days().take_while(|date| *date <= to) {
        let url = archive_url(&deps.base_url, config.run.market, kind, symbol, date);
        let csv_name = day_file_name(symbol, kind, date);
        let archive_path = archive_dir.join(csv_name.replace(".csv", ".zip"));

        match deps
            .downloader
            .download_validated(&url, &archive_path)
            .map_err(|err| err.to_string())?
        {
            DownloadOutcome::AlreadyPresent => report.already_present += 1,
            DownloadOutcome::Downloaded { .. } => report.downloaded += 1,
        }
        let extracted =
            extract_single_entry(&archive_path, &raw_dir).map_err(|err| err.to_string())?;
        tracing::info!(date = %date, file = %extracted.display(), "archive extracted");
        report.extracted.push(extracted);
        report.days += 1;
    }
    super::common::print_json(&report)
}
