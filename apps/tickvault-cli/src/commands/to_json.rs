use clap::ValueEnum;
use std::path::Path;
use tickvault_application::export::convert_dir_to_json;
use tickvault_domain::value_objects::agg_trade::AggTrade;
use tickvault_domain::value_objects::funding_rate::FundingRate;
use tickvault_domain::value_objects::kline::Kline;
use tickvault_domain::value_objects::spot_trade::SpotTrade;

/// Row layout of the CSV files being converted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum RecordKind {
    AggTrades,
    Trades,
    Klines,
    FundingRate,
}

/// Half the available cores, at least one.
pub fn default_parallelism() -> usize {
    std::thread::available_parallelism()
        .map(|cores| cores.get() / 2)
        .unwrap_or(1)
        .max(1)
}

pub(super) fn run_to_json(
    record: RecordKind,
    from_dir: &Path,
    to_dir: &Path,
    parallelism: Option<usize>,
) -> Result<(), String> {
    let parallelism = parallelism.unwrap_or_else(default_parallelism).max(1);
    let report = match record {
        RecordKind::AggTrades => convert_dir_to_json::<AggTrade>(from_dir, to_dir, parallelism),
        RecordKind::Trades => convert_dir_to_json::<SpotTrade>(from_dir, to_dir, parallelism),
        RecordKind::Klines => convert_dir_to_json::<Kline>(from_dir, to_dir, parallelism),
        RecordKind::FundingRate => {
            convert_dir_to_json::<FundingRate>(from_dir, to_dir, parallelism)
        }
    }
    .map_err(|err| err.to_string())?;
    super::common::print_json(&report)
}
