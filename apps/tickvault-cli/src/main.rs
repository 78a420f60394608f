mod commands;
mod infra;
mod obs;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use commands::{Command, RecordKind};
use obs::LogFormat;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "tickvault")]
#[command(about = "Binance trade archive verification, repair and candle export", version, arg_required_else_help = true)]
#[command(
    after_help = "Examples:\n  tickvault --config tickvault.toml download --from 2024-01-01 --to 2024-01-31\n  tickvault --config tickvault.toml backfill --since 2024-01-01\n  tickvault --config tickvault.toml tidy\n  tickvault --config tickvault.toml klines --interval 1m --format csv\n  tickvault audit-klines --file BTCUSDT-1m-2024-01-01.csv\n  tickvault to-json --record funding-rate --from-dir csv --to-dir json\n"
)]
struct Cli {
    /// Config file path (TOML). If omitted, uses env TICKVAULT_CONFIG.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Default log filter; env TICKVAULT_LOG takes precedence.
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Log line format on stderr.
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Pretty)]
    log_format: LogFormat,

    /// Serve Prometheus metrics on host:port (or a bare port on loopback).
    #[arg(long, global = true)]
    metrics_addr: Option<String>,

    #[command(subcommand)]
    command: CliCommand,
}

#[derive(Subcommand)]
enum CliCommand {
    /// Download daily archives and extract them into the raw directory.
    Download {
        #[arg(long)]
        from: NaiveDate,
        #[arg(long)]
        to: NaiveDate,
    },
    /// Check trade-id continuity of a directory (default: tidy_dir).
    Verify {
        #[arg(long)]
        dir: Option<PathBuf>,
    },
    /// List missing trade-id ranges of a directory (default: raw_dir).
    ScanGaps {
        #[arg(long)]
        dir: Option<PathBuf>,
        #[arg(long)]
        since: Option<NaiveDate>,
    },
    /// Fetch the missing ranges of raw_dir into missing_dir.
    Backfill {
        #[arg(long)]
        since: Option<NaiveDate>,
    },
    /// Merge raw_dir and missing_dir into tidy_dir.
    Tidy,
    /// Aggregate a continuous directory into candles under out_dir.
    Klines {
        /// Candle width such as 1s, 1m, 15m, 4h; defaults to [klines].interval.
        #[arg(long)]
        interval: Option<String>,
        #[arg(long)]
        dir: Option<PathBuf>,
        #[arg(long, default_value = "csv")]
        format: String,
    },
    /// Report missing or misaligned buckets of a kline CSV.
    AuditKlines {
        #[arg(long)]
        file: PathBuf,
        #[arg(long)]
        interval: Option<String>,
    },
    /// Convert every CSV of a directory into a JSON array file.
    ToJson {
        #[arg(long, value_enum)]
        record: RecordKind,
        #[arg(long)]
        from_dir: PathBuf,
        #[arg(long)]
        to_dir: PathBuf,
        /// Worker count; defaults to half the available cores.
        #[arg(long)]
        parallelism: Option<usize>,
    },
}

fn main() {
    let cli = Cli::parse();

    if let Err(err) = obs::init_tracing(&cli.log_level, cli.log_format) {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
    if let Err(err) = obs::init_metrics(cli.metrics_addr.as_deref()) {
        eprintln!("error: {err}");
        std::process::exit(1);
    }

    let command = match cli.command {
        CliCommand::Download { from, to } => Command::Download { from, to },
        CliCommand::Verify { dir } => Command::Verify { dir },
        CliCommand::ScanGaps { dir, since } => Command::ScanGaps { dir, since },
        CliCommand::Backfill { since } => Command::Backfill { since },
        CliCommand::Tidy => Command::Tidy,
        CliCommand::Klines {
            interval,
            dir,
            format,
        } => Command::Klines {
            interval,
            dir,
            format,
        },
        CliCommand::AuditKlines { file, interval } => Command::AuditKlines { file, interval },
        CliCommand::ToJson {
            record,
            from_dir,
            to_dir,
            parallelism,
        } => Command::ToJson {
            record,
            from_dir,
            to_dir,
            parallelism,
        },
    };

    if let Err(err) = commands::run(cli.config, command) {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}
