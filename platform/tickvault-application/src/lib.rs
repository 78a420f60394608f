pub mod backfill;
pub mod config;
pub mod export;
pub mod files;
pub mod gap_scan;
pub mod klines;
pub mod tidy;
pub mod verification;

#[cfg(test)]
pub(crate) mod test_support;
