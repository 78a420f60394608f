pub mod backfill;
pub mod continuity;
pub mod decode;
pub mod gaps;
pub mod kline_audit;
pub mod klines;
pub mod merge;
pub mod pool;
