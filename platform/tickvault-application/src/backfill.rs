use crate::files::{day_file_name, ensure_dir, read_rows, write_rows};
use crate::gap_scan::scan_dir_gaps;
use chrono::NaiveDate;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tickvault_domain::errors::PipelineError;
use tickvault_domain::repositories::trade_history::TradeHistorySource;
use tickvault_domain::services::backfill::{
    bucket_by_utc_day, fetch_missing_range, merge_by_id, BackfillQuery,
};
use tickvault_domain::value_objects::record::{RowEncode, TradeRecord};

pub struct BackfillParams<'a> {
    pub raw_dir: &'a Path,
    pub missing_dir: &'a Path,
    pub since: Option<NaiveDate>,
    pub parallelism: usize,
    pub query: BackfillQuery,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BackfillReport {
    pub ranges: usize,
    pub requested_ids: i64,
    pub fetched: usize,
    pub files_written: Vec<PathBuf>,
}

/// Scans `raw_dir` for missing ids, fetches each range from `source` and
/// stores the records under `missing_dir`, one file per UTC day.
///
/// Each range is persisted as soon as it is complete; a failing range stops
/// the run and leaves earlier ranges on disk.
pub fn backfill_dir<T, S>(
    params: &BackfillParams<'_>,
    source: &S,
) -> Result<BackfillReport, PipelineError>
where
    T: TradeRecord,
    S: TradeHistorySource<T> + ?Sized,
{
    let span = tracing::info_span!(
        "backfill_dir",
        raw_dir = %params.raw_dir.display(),
        missing_dir = %params.missing_dir.display(),
        symbol = %params.query.symbol,
        market = params.query.market.as_str(),
        kind = %T::KIND
    );
    let _enter = span.enter();

    ensure_dir(params.missing_dir)?;
    let scan = scan_dir_gaps::<T>(params.raw_dir, params.since, params.parallelism)?;
    let mut report = BackfillReport {
        ranges: scan.missing.len(),
        requested_ids: scan.missing_ids(),
        ..BackfillReport::default()
    };

    for range in &scan.missing {
        let start = Instant::now();
        let records = match fetch_missing_range(source, &params.query, range) {
            Ok(records) => records,
            Err(err) => {
                metrics::counter!("tickvault.backfill.ranges_total", "result" => "err")
                    .increment(1);
                tracing::error!(
                    start_id = range.start_id,
                    end_id = range.end_id,
                    error = %err,
                    "backfill range failed"
                );
                return Err(err);
            }
        };
        metrics::counter!("tickvault.backfill.ranges_total", "result" => "ok").increment(1);
        metrics::counter!("tickvault.backfill.records_total").increment(records.len() as u64);
        metrics::histogram!("tickvault.backfill.range_ms")
            .record(start.elapsed().as_millis() as f64);
        if (records.len() as i64) < range.len() {
            tracing::warn!(
                start_id = range.start_id,
                end_id = range.end_id,
                fetched = records.len(),
                "remote history has fewer records than the gap"
            );
        }
        report.fetched += records.len();
        for path in write_backfill(params.missing_dir, &params.query.symbol, records)? {
            if !report.files_written.contains(&path) {
                report.files_written.push(path);
            }
        }
    }

    tracing::info!(
        ranges = report.ranges,
        requested_ids = report.requested_ids,
        fetched = report.fetched,
        files = report.files_written.len(),
        "backfill finished"
    );
    Ok(report)
}

/// Adds `records` to the per-day missing files, merging with what is already
/// there by id.
pub fn write_backfill<T: TradeRecord>(
    missing_dir: &Path,
    symbol: &str,
    records: Vec<T>,
) -> Result<Vec<PathBuf>, PipelineError> {
    let mut written = Vec::new();
    for (day, records) in bucket_by_utc_day(records)? {
        let path = missing_dir.join(day_file_name(symbol, T::KIND, day));
        let existing = if path.exists() {
            read_rows::<T>(&path)?
        } else {
            Vec::new()
        };
        let merged = merge_by_id(existing, records);
        tracing::debug!(path = %path.display(), records = merged.len(), "writing backfill file");
        write_rows(&path, merged.iter().map(RowEncode::encode_row))?;
        written.push(path);
    }
    Ok(written)
}
