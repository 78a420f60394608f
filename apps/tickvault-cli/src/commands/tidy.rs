use tickvault_application::config::Config;
use tickvault_application::tidy::{tidy_dir, TidyParams};
use tickvault_domain::value_objects::agg_trade::AggTrade;
use tickvault_domain::value_objects::market::TradeKind;
use tickvault_domain::value_objects::spot_trade::SpotTrade;

pub(super) fn run_tidy(config: &Config) -> Result<(), String> {
    let raw_dir = config.raw_dir();
    let missing_dir = config.missing_dir();
    let tidy_dir_path = config.tidy_dir();
    let params = TidyParams {
        raw_dir: &raw_dir,
        missing_dir: &missing_dir,
        tidy_dir: &tidy_dir_path,
        parallelism: config.parallelism(),
        check_tidy_file_exists: config.check_tidy_file_exists(),
    };
    let report = match config.run.kind {
        TradeKind::AggTrades => tidy_dir::<AggTrade>(&params),
        TradeKind::Trades => tidy_dir::<SpotTrade>(&params),
    }
    .map_err(|err| err.to_string())?;
    super::common::print_json(&report)
}
