use chrono::NaiveDate;
use tickvault_application::backfill::{backfill_dir, BackfillParams, BackfillReport};
use tickvault_application::config::Config;
use tickvault_domain::errors::PipelineError;
use tickvault_domain::repositories::trade_history::TradeHistorySource;
use tickvault_domain::services::backfill::BackfillQuery;
use tickvault_domain::value_objects::agg_trade::AggTrade;
use tickvault_domain::value_objects::market::TradeKind;
use tickvault_domain::value_objects::record::TradeRecord;
use tickvault_domain::value_objects::spot_trade::SpotTrade;
use tickvault_infrastructure::binance::BinanceRestClient;

pub(super) fn run_backfill(config: &Config, since: Option<NaiveDate>) -> Result<(), String> {
    let client = crate::infra::build_rest_client(config)?;
    let report = match config.run.kind {
        TradeKind::AggTrades => backfill_with::<AggTrade>(config, since, &client),
        TradeKind::Trades => backfill_with::<SpotTrade>(config, since, &client),
    }
    .map_err(|err| err.to_string())?;
    super::common::print_json(&report)
}

fn backfill_with<T>(
    config: &Config,
    since: Option<NaiveDate>,
    client: &BinanceRestClient,
) -> Result<BackfillReport, PipelineError>
where
    T: TradeRecord,
    BinanceRestClient: TradeHistorySource<T>,
{
    let raw_dir = config.raw_dir();
    let missing_dir = config.missing_dir();
    let mut query = BackfillQuery::new(config.run.symbol.clone(), config.run.market);
    query.page_limit = config.page_limit();
    let params = BackfillParams {
        raw_dir: &raw_dir,
        missing_dir: &missing_dir,
        since,
        parallelism: config.parallelism(),
        query,
    };
    backfill_dir::<T, _>(&params, client)
}
