use chrono::NaiveDate;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tickvault_domain::errors::PipelineError;
use tickvault_domain::services::decode::RowStream;
use tickvault_domain::value_objects::market::TradeKind;
use tickvault_domain::value_objects::record::{RowDecode, TradeRecord};

/// One per-day CSV file of a file-set directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DayFile {
    pub name: String,
    pub path: PathBuf,
    /// Parsed from `<symbol>-<kind>-<YYYY-MM-DD>.csv`; `None` for other names.
    pub date: Option<NaiveDate>,
}

pub fn day_file_name(symbol: &str, kind: TradeKind, date: NaiveDate) -> String {
    format!("{symbol}-{}-{}.csv", kind.as_str(), date.format("%Y-%m-%d"))
}

pub fn parse_day_file_date(name: &str, kind: TradeKind) -> Option<NaiveDate> {
    let stem = name.strip_suffix(".csv")?;
    let marker = format!("-{}-", kind.as_str());
    let (symbol, date) = stem.split_once(&marker)?;
    if symbol.is_empty() || date.contains(&marker) {
        return None;
    }
    NaiveDate::parse_from_str(date, "%Y-%m-%d").ok()
}

fn record_io_metrics<T>(op: &'static str, start: Instant, result: &Result<T, PipelineError>) {
    let result_label = if result.is_ok() { "ok" } else { "err" };
    metrics::counter!("tickvault.files.calls_total", "op" => op, "result" => result_label)
        .increment(1);
    metrics::histogram!("tickvault.files.op_ms", "op" => op, "result" => result_label)
        .record(start.elapsed().as_millis() as f64);
}

/// `(file name, path)` of every regular `*.csv` file in `dir`, sorted by name.
pub fn list_csv_paths(dir: &Path) -> Result<Vec<(String, PathBuf)>, PipelineError> {
    let entries = fs::read_dir(dir).map_err(|err| {
        PipelineError::transport(format!("failed to list {}", dir.display()), err)
    })?;
    let mut files = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|err| {
            PipelineError::transport(format!("failed to list {}", dir.display()), err)
        })?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let Some(name) = path.file_name().and_then(|name| name.to_str()) else {
            continue;
        };
        if !name.ends_with(".csv") {
            continue;
        }
        files.push((name.to_string(), path.clone()));
    }
    files.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(files)
}

/// Lists `*.csv` files in `dir`, sorted by file name.
///
/// File-name order must agree with date order, which holds for the
/// `<symbol>-<kind>-<YYYY-MM-DD>.csv` convention within one symbol.
pub fn list_csv_files(dir: &Path, kind: TradeKind) -> Result<Vec<DayFile>, PipelineError> {
    Ok(list_csv_paths(dir)?
        .into_iter()
        .map(|(name, path)| DayFile {
            date: parse_day_file_date(&name, kind),
            name,
            path,
        })
        .collect())
}

/// `list_csv_files` restricted to `<symbol>-<kind>-<YYYY-MM-DD>.csv` names.
///
/// Every directory-wide operation works on this set so that a stray CSV is
/// ignored the same way by all of them.
pub fn list_day_files(dir: &Path, kind: TradeKind) -> Result<Vec<DayFile>, PipelineError> {
    let mut files = list_csv_files(dir, kind)?;
    files.retain(|file| {
        if file.date.is_none() {
            tracing::debug!(file = %file.name, "skipping file without a day in its name");
        }
        file.date.is_some()
    });
    Ok(files)
}

/// Decodes every row of a headerless-or-headed CSV file.
pub fn read_rows<T: RowDecode>(path: &Path) -> Result<Vec<T>, PipelineError> {
    let start = Instant::now();
    let result = read_rows_inner(path);
    record_io_metrics("read", start, &result);
    result
}

fn read_rows_inner<T: RowDecode>(path: &Path) -> Result<Vec<T>, PipelineError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)
        .map_err(|err| {
            PipelineError::transport(format!("failed to open {}", path.display()), err)
        })?;

    let mut stream = RowStream::<T>::new();
    let mut records = Vec::new();
    for result in reader.records() {
        let row = result.map_err(|err| {
            PipelineError::transport(format!("failed to read {}", path.display()), err)
        })?;
        let line = row.position().map(|pos| pos.line()).unwrap_or(0);
        let fields: Vec<&str> = row.iter().collect();
        let decoded = stream
            .push(&fields)
            .map_err(|err| PipelineError::from(err).at(format!("{}:{line}", path.display())))?;
        if let Some(record) = decoded {
            records.push(record);
        }
    }
    if stream.header_skipped() {
        tracing::debug!(path = %path.display(), "skipped header row");
    }
    stream
        .finish()
        .map_err(|err| PipelineError::from(err).at(path.display().to_string()))?;
    Ok(records)
}

/// Reads trade records in file order with placeholder rows dropped.
pub fn read_trades<T: TradeRecord>(path: &Path) -> Result<Vec<T>, PipelineError> {
    let mut records = read_rows::<T>(path)?;
    let before = records.len();
    records.retain(|record| !record.is_placeholder());
    if records.len() != before {
        tracing::debug!(
            path = %path.display(),
            dropped = before - records.len(),
            "dropped placeholder rows"
        );
    }
    Ok(records)
}

pub fn ensure_dir(dir: &Path) -> Result<(), PipelineError> {
    fs::create_dir_all(dir).map_err(|err| {
        PipelineError::transport(format!("failed to create dir {}", dir.display()), err)
    })
}

/// Writes rows joined by `\n` with no trailing newline.
///
/// Goes through a sibling temp file and a rename so an interrupted write never
/// leaves a truncated file under the final name.
pub fn write_rows(
    path: &Path,
    rows: impl IntoIterator<Item = String>,
) -> Result<(), PipelineError> {
    let start = Instant::now();
    let result = write_text(path, rows.into_iter().collect::<Vec<_>>().join("\n"));
    record_io_metrics("write", start, &result);
    result
}

fn tmp_sibling(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}

pub(crate) fn write_text(path: &Path, contents: impl AsRef<[u8]>) -> Result<(), PipelineError> {
    if let Some(parent) = path.parent() {
        ensure_dir(parent)?;
    }
    let tmp_path = tmp_sibling(path);
    fs::write(&tmp_path, contents).map_err(|err| {
        PipelineError::transport(format!("failed to write {}", tmp_path.display()), err)
    })?;
    fs::rename(&tmp_path, path).map_err(|err| {
        PipelineError::transport(format!("failed to move into {}", path.display()), err)
    })
}

pub fn copy_file(from: &Path, to: &Path) -> Result<(), PipelineError> {
    let start = Instant::now();
    let result = fs::read(from)
        .map_err(|err| PipelineError::transport(format!("failed to read {}", from.display()), err))
        .and_then(|bytes| write_text(to, bytes));
    record_io_metrics("copy", start, &result);
    result
}
