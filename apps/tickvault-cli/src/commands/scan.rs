use chrono::NaiveDate;
use std::path::PathBuf;
use tickvault_application::config::Config;
use tickvault_application::gap_scan::scan_dir_gaps;
use tickvault_domain::value_objects::agg_trade::AggTrade;
use tickvault_domain::value_objects::market::TradeKind;
use tickvault_domain::value_objects::spot_trade::SpotTrade;

pub(super) fn run_scan_gaps(
    config: &Config,
    dir: Option<PathBuf>,
    since: Option<NaiveDate>,
) -> Result<(), String> {
    let dir = dir.unwrap_or_else(|| config.raw_dir());
    let parallelism = config.parallelism();
    let report = match config.run.kind {
        TradeKind::AggTrades => scan_dir_gaps::<AggTrade>(&dir, since, parallelism),
        TradeKind::Trades => scan_dir_gaps::<SpotTrade>(&dir, since, parallelism),
    }
    .map_err(|err| err.to_string())?;
    if !report.missing.is_empty() {
        tracing::warn!(
            ranges = report.missing.len(),
            missing_ids = report.missing_ids(),
            "directory has missing trade ids"
        );
    }
    super::common::print_json(&report)
}
