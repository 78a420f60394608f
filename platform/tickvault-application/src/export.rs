use crate::files::{ensure_dir, list_csv_paths, read_rows, write_rows, write_text};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tickvault_domain::errors::PipelineError;
use tickvault_domain::services::pool::run_bounded;
use tickvault_domain::value_objects::interval::Interval;
use tickvault_domain::value_objects::kline::Kline;
use tickvault_domain::value_objects::record::{RowDecode, RowEncode};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Csv,
    Json,
}

impl ExportFormat {
    pub fn parse(value: &str) -> Result<Self, PipelineError> {
        match value.trim().to_lowercase().as_str() {
            "csv" => Ok(ExportFormat::Csv),
            "json" => Ok(ExportFormat::Json),
            other => Err(PipelineError::Config(format!(
                "unsupported export format: {other}"
            ))),
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Json => "json",
        }
    }
}

pub fn kline_output_path(
    out_dir: &Path,
    symbol: &str,
    interval: Interval,
    format: ExportFormat,
) -> PathBuf {
    out_dir.join(format!("{symbol}-klines-{interval}.{}", format.extension()))
}

/// Writes candles in the exchange's 12-column kline layout or as a JSON array.
pub fn write_klines(
    path: &Path,
    klines: &[Kline],
    format: ExportFormat,
) -> Result<(), PipelineError> {
    let result = match format {
        ExportFormat::Csv => write_rows(path, klines.iter().map(RowEncode::encode_row)),
        ExportFormat::Json => serde_json::to_vec_pretty(klines)
            .map_err(|err| PipelineError::transport("failed to serialize klines", err))
            .and_then(|bytes| write_text(path, bytes)),
    };
    if result.is_ok() {
        tracing::info!(path = %path.display(), klines = klines.len(), "wrote klines");
    }
    result
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ConvertReport {
    pub files: usize,
    pub records: usize,
}

/// Rewrites every `*.csv` of `csv_dir` as a JSON array of `T` under
/// `json_dir`, keeping the file stem.
///
/// Files are converted on at most `parallelism` workers; the first file that
/// fails to decode stops the run and names itself in the error. Rows are
/// written as decoded, placeholders included.
pub fn convert_dir_to_json<T>(
    csv_dir: &Path,
    json_dir: &Path,
    parallelism: usize,
) -> Result<ConvertReport, PipelineError>
where
    T: RowDecode + Serialize,
{
    let span = tracing::info_span!(
        "convert_dir_to_json",
        csv_dir = %csv_dir.display(),
        json_dir = %json_dir.display(),
        parallelism
    );
    let _enter = span.enter();
    let start = Instant::now();

    ensure_dir(json_dir)?;
    let files = list_csv_paths(csv_dir)?;
    let counts = run_bounded(&files, parallelism, |_, (name, path)| {
        let records = read_rows::<T>(path)?;
        let stem = name.strip_suffix(".csv").unwrap_or(name.as_str());
        let target = json_dir.join(format!("{stem}.json"));
        let bytes = serde_json::to_vec(&records).map_err(|err| {
            PipelineError::transport(format!("failed to serialize {name}"), err)
        })?;
        write_text(&target, bytes)?;
        metrics::counter!("tickvault.export.files_total").increment(1);
        tracing::debug!(file = %name, records = records.len(), "converted to json");
        Ok(records.len())
    })?;

    let report = ConvertReport {
        files: files.len(),
        records: counts.iter().sum(),
    };
    tracing::info!(
        files = report.files,
        records = report.records,
        elapsed_ms = start.elapsed().as_millis() as u64,
        "csv directory converted"
    );
    Ok(report)
}
