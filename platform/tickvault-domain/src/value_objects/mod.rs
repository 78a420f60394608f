pub mod agg_trade;
pub mod funding_rate;
pub mod interval;
pub mod kline;
pub mod market;
pub mod missing_range;
pub mod record;
pub mod spot_trade;
