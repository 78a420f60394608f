use std::path::PathBuf;
use tickvault_application::config::Config;
use tickvault_application::verification::verify_dir;
use tickvault_domain::value_objects::agg_trade::AggTrade;
use tickvault_domain::value_objects::market::TradeKind;
use tickvault_domain::value_objects::spot_trade::SpotTrade;

pub(super) fn run_verify(config: &Config, dir: Option<PathBuf>) -> Result<(), String> {
    let dir = dir.unwrap_or_else(|| config.tidy_dir());
    let report = match config.run.kind {
        TradeKind::AggTrades => verify_dir::<AggTrade>(&dir, config.parallelism()),
        TradeKind::Trades => verify_dir::<SpotTrade>(&dir, config.parallelism()),
    }
    .map_err(|err| err.to_string())?;
    super::common::print_json(&report)
}
