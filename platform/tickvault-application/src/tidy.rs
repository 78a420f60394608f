use crate::files::{copy_file, ensure_dir, list_day_files, read_rows, write_rows};
use serde::Serialize;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tickvault_domain::errors::PipelineError;
use tickvault_domain::services::backfill::merge_by_id;
use tickvault_domain::services::pool::run_bounded;
use tickvault_domain::value_objects::record::{RowEncode, TradeRecord};

pub struct TidyParams<'a> {
    pub raw_dir: &'a Path,
    pub missing_dir: &'a Path,
    pub tidy_dir: &'a Path,
    pub parallelism: usize,
    /// Leave an existing tidy file untouched.
    pub check_tidy_file_exists: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TidyOutcome {
    Skipped,
    Copied,
    Merged,
    /// Whole day missing from the raw archive, rebuilt from backfill alone.
    BackfillOnly,
}

impl TidyOutcome {
    fn as_str(&self) -> &'static str {
        match self {
            TidyOutcome::Skipped => "skipped",
            TidyOutcome::Copied => "copied",
            TidyOutcome::Merged => "merged",
            TidyOutcome::BackfillOnly => "backfill_only",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TidyReport {
    pub skipped: usize,
    pub copied: usize,
    pub merged: usize,
    pub backfill_only: usize,
}

struct TidyJob {
    name: String,
    raw: Option<PathBuf>,
    missing: Option<PathBuf>,
}

/// Builds one tidy file per day: a verbatim copy of the raw file when no
/// backfill exists for that day, otherwise the id-sorted union of both.
pub fn tidy_dir<T: TradeRecord>(params: &TidyParams<'_>) -> Result<TidyReport, PipelineError> {
    let span = tracing::info_span!(
        "tidy_dir",
        raw_dir = %params.raw_dir.display(),
        missing_dir = %params.missing_dir.display(),
        tidy_dir = %params.tidy_dir.display(),
        kind = %T::KIND,
        parallelism = params.parallelism
    );
    let _enter = span.enter();

    ensure_dir(params.tidy_dir)?;
    let jobs = plan_jobs::<T>(params)?;
    let outcomes = run_bounded(&jobs, params.parallelism, |_, job| {
        let start = Instant::now();
        let result = tidy_one::<T>(job, params);
        let outcome_label = match &result {
            Ok(outcome) => outcome.as_str(),
            Err(_) => "err",
        };
        metrics::counter!("tickvault.tidy.files_total", "outcome" => outcome_label).increment(1);
        metrics::histogram!("tickvault.tidy.file_ms", "outcome" => outcome_label)
            .record(start.elapsed().as_millis() as f64);
        match &result {
            Ok(outcome) => {
                tracing::debug!(file = %job.name, outcome = outcome.as_str(), "tidy file done")
            }
            Err(err) => tracing::error!(file = %job.name, error = %err, "tidy file failed"),
        }
        result
    })?;

    let mut report = TidyReport::default();
    for outcome in outcomes {
        match outcome {
            TidyOutcome::Skipped => report.skipped += 1,
            TidyOutcome::Copied => report.copied += 1,
            TidyOutcome::Merged => report.merged += 1,
            TidyOutcome::BackfillOnly => report.backfill_only += 1,
        }
    }
    tracing::info!(
        skipped = report.skipped,
        copied = report.copied,
        merged = report.merged,
        backfill_only = report.backfill_only,
        "tidy finished"
    );
    Ok(report)
}

fn plan_jobs<T: TradeRecord>(params: &TidyParams<'_>) -> Result<Vec<TidyJob>, PipelineError> {
    let raw_files = list_day_files(params.raw_dir, T::KIND)?;
    let missing_files = if params.missing_dir.is_dir() {
        list_day_files(params.missing_dir, T::KIND)?
    } else {
        Vec::new()
    };
    let missing_names: BTreeSet<&str> = missing_files.iter().map(|f| f.name.as_str()).collect();
    let raw_names: BTreeSet<&str> = raw_files.iter().map(|f| f.name.as_str()).collect();

    let mut jobs: Vec<TidyJob> = raw_files
        .iter()
        .map(|file| TidyJob {
            name: file.name.clone(),
            raw: Some(file.path.clone()),
            missing: missing_names
                .contains(file.name.as_str())
                .then(|| params.missing_dir.join(&file.name)),
        })
        .collect();
    jobs.extend(
        missing_files
            .iter()
            .filter(|file| !raw_names.contains(file.name.as_str()))
            .map(|file| TidyJob {
                name: file.name.clone(),
                raw: None,
                missing: Some(file.path.clone()),
            }),
    );
    jobs.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(jobs)
}

fn tidy_one<T: TradeRecord>(
    job: &TidyJob,
    params: &TidyParams<'_>,
) -> Result<TidyOutcome, PipelineError> {
    let out = params.tidy_dir.join(&job.name);
    if params.check_tidy_file_exists && out.exists() {
        return Ok(TidyOutcome::Skipped);
    }
    match (&job.raw, &job.missing) {
        (Some(raw), None) => {
            copy_file(raw, &out)?;
            Ok(TidyOutcome::Copied)
        }
        (Some(raw), Some(missing)) => {
            let merged = merge_by_id(read_rows::<T>(raw)?, read_rows::<T>(missing)?);
            write_rows(&out, merged.iter().map(RowEncode::encode_row))?;
            Ok(TidyOutcome::Merged)
        }
        (None, Some(missing)) => {
            let records = merge_by_id(read_rows::<T>(missing)?, Vec::new());
            write_rows(&out, records.iter().map(RowEncode::encode_row))?;
            Ok(TidyOutcome::BackfillOnly)
        }
        (None, None) => Err(PipelineError::Invariant(format!(
            "tidy job {} has no source files",
            job.name
        ))),
    }
}
