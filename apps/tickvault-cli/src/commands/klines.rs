use serde::Serialize;
use std::path::PathBuf;
use tickvault_application::config::Config;
use tickvault_application::export::{kline_output_path, write_klines, ExportFormat};
use tickvault_application::files::ensure_dir;
use tickvault_application::klines::dir_to_klines;
use tickvault_domain::value_objects::agg_trade::AggTrade;
use tickvault_domain::value_objects::interval::Interval;
use tickvault_domain::value_objects::market::TradeKind;
use tickvault_domain::value_objects::spot_trade::SpotTrade;

#[derive(Serialize)]
struct KlinesSummary {
    path: PathBuf,
    interval: String,
    files: usize,
    records: usize,
    klines: usize,
    flat_klines: usize,
}

pub(super) fn run_klines(
    config: &Config,
    interval: Option<&str>,
    dir: Option<PathBuf>,
    format: &str,
) -> Result<(), String> {
    let interval = match interval {
        Some(raw) => Interval::parse(raw).map_err(|err| err.to_string())?,
        None => config
            .kline_interval()
            .map_err(|err| err.to_string())?
            .ok_or_else(|| "missing --interval and [klines].interval is not set".to_string())?,
    };
    let format = ExportFormat::parse(format).map_err(|err| err.to_string())?;
    let dir = dir.unwrap_or_else(|| config.tidy_dir());

    let run = match config.run.kind {
        TradeKind::AggTrades => dir_to_klines::<AggTrade>(&dir, interval, config.parallelism()),
        TradeKind::Trades => dir_to_klines::<SpotTrade>(&dir, interval, config.parallelism()),
    }
    .map_err(|err| err.to_string())?;

    let out_dir = config.out_dir();
    ensure_dir(&out_dir).map_err(|err| err.to_string())?;
    let path = kline_output_path(&out_dir, &config.run.symbol, interval, format);
    write_klines(&path, &run.klines, format).map_err(|err| err.to_string())?;

    super::common::print_json(&KlinesSummary {
        path,
        interval: interval.label(),
        files: run.verify.files,
        records: run.verify.records,
        klines: run.klines.len(),
        flat_klines: run.klines.iter().filter(|kline| kline.is_flat()).count(),
    })
}
