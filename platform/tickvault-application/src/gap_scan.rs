use crate::files::{list_day_files, read_trades};
use chrono::NaiveDate;
use serde::Serialize;
use std::path::Path;
use std::time::Instant;
use tickvault_domain::errors::PipelineError;
use tickvault_domain::services::gaps::{boundary_gaps, merge_missing_ranges, scan_id_sequence};
use tickvault_domain::services::pool::run_bounded;
use tickvault_domain::value_objects::missing_range::MissingRange;
use tickvault_domain::value_objects::record::TradeRecord;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GapScanReport {
    pub files: usize,
    pub records: usize,
    pub duplicates: usize,
    pub out_of_order: usize,
    pub missing: Vec<MissingRange>,
}

impl GapScanReport {
    pub fn missing_ids(&self) -> i64 {
        self.missing.iter().map(MissingRange::len).sum()
    }
}

/// Lists every missing id range in `dir`, inside files and across file
/// boundaries, ordered by start id.
///
/// Only files named `<symbol>-<kind>-<YYYY-MM-DD>.csv` take part; with `since`
/// set, files dated before it are ignored as well.
pub fn scan_dir_gaps<T: TradeRecord>(
    dir: &Path,
    since: Option<NaiveDate>,
    parallelism: usize,
) -> Result<GapScanReport, PipelineError> {
    let span = tracing::info_span!(
        "scan_dir_gaps",
        dir = %dir.display(),
        kind = %T::KIND,
        since = ?since,
        parallelism
    );
    let _enter = span.enter();
    let start = Instant::now();

    let files: Vec<_> = list_day_files(dir, T::KIND)?
        .into_iter()
        .filter(|file| match (file.date, since) {
            (Some(date), Some(since)) => date >= since,
            _ => true,
        })
        .collect();

    let reports = run_bounded(&files, parallelism, |_, file| {
        let records = read_trades::<T>(&file.path)?;
        let report = scan_id_sequence(&records);
        if report.duplicates > 0 || report.out_of_order > 0 {
            tracing::warn!(
                file = %file.name,
                duplicates = report.duplicates,
                out_of_order = report.out_of_order,
                "record ids are not strictly increasing"
            );
        }
        if !report.missing.is_empty() {
            tracing::info!(
                file = %file.name,
                ranges = report.missing.len(),
                missing_ids = report.missing_ids(),
                "found missing ids"
            );
        }
        Ok(report)
    })?;

    let boundary = boundary_gaps(&reports);
    for range in &boundary {
        tracing::info!(start_id = range.start_id, end_id = range.end_id, "found gap between files");
    }

    let mut scan = GapScanReport {
        files: files.len(),
        ..GapScanReport::default()
    };
    for report in &reports {
        scan.records += report.records;
        scan.duplicates += report.duplicates;
        scan.out_of_order += report.out_of_order;
    }
    scan.missing = merge_missing_ranges(
        reports
            .into_iter()
            .map(|report| report.missing)
            .chain(std::iter::once(boundary)),
    );

    metrics::counter!("tickvault.gaps.ranges_total").increment(scan.missing.len() as u64);
    metrics::histogram!("tickvault.gaps.scan_ms").record(start.elapsed().as_millis() as f64);
    tracing::info!(
        files = scan.files,
        records = scan.records,
        ranges = scan.missing.len(),
        missing_ids = scan.missing_ids(),
        "gap scan finished"
    );
    Ok(scan)
}
