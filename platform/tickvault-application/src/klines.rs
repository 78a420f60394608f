use crate::verification::{verify_dir_with, VerifyReport};
use std::path::Path;
use std::time::Instant;
use tickvault_domain::errors::PipelineError;
use tickvault_domain::services::klines::aggregate_klines;
use tickvault_domain::services::merge::merge_kline_series;
use tickvault_domain::value_objects::interval::Interval;
use tickvault_domain::value_objects::kline::Kline;
use tickvault_domain::value_objects::record::TradeRecord;

#[derive(Debug, Clone)]
pub struct KlineRun {
    pub verify: VerifyReport,
    pub klines: Vec<Kline>,
}

/// Turns a continuous trade directory into one gap-free candle series.
///
/// Every day file is decoded once: its in-file continuity check and its
/// aggregation share the same records. Aggregation therefore runs before the
/// cross-file boundary check, but no candle is returned unless the whole
/// directory passes [`crate::verification::verify_dir`]'s checks.
pub fn dir_to_klines<T: TradeRecord>(
    dir: &Path,
    interval: Interval,
    parallelism: usize,
) -> Result<KlineRun, PipelineError> {
    let span = tracing::info_span!(
        "dir_to_klines",
        dir = %dir.display(),
        kind = %T::KIND,
        interval = %interval,
        parallelism
    );
    let _enter = span.enter();

    let interval = interval.ensure_candle_width()?;
    let start = Instant::now();
    let (verify, slices) = verify_dir_with::<T, _, _>(dir, parallelism, |file, trades| {
        let klines =
            aggregate_klines(trades, interval).map_err(|err| err.at(file.name.clone()))?;
        tracing::debug!(
            file = %file.name,
            trades = trades.len(),
            klines = klines.len(),
            "aggregated file"
        );
        Ok(klines)
    })?;
    let klines = merge_kline_series(slices, interval)?;

    metrics::counter!("tickvault.klines.candles_total").increment(klines.len() as u64);
    metrics::counter!("tickvault.klines.flat_total")
        .increment(klines.iter().filter(|k| k.is_flat()).count() as u64);
    metrics::histogram!("tickvault.klines.aggregate_ms")
        .record(start.elapsed().as_millis() as f64);
    tracing::info!(
        files = verify.files,
        klines = klines.len(),
        first_open_time = ?klines.first().map(|k| k.open_time),
        last_open_time = ?klines.last().map(|k| k.open_time),
        "candle series built"
    );
    Ok(KlineRun { verify, klines })
}
