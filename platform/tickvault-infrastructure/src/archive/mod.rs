use chrono::NaiveDate;
use reqwest::blocking::Client;
use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tickvault_domain::errors::PipelineError;
use tickvault_domain::services::decode::RowStream;
use tickvault_domain::value_objects::market::{Market, TradeKind};
use tickvault_domain::value_objects::record::RowDecode;

pub const DEFAULT_ARCHIVE_BASE_URL: &str = "https://data.binance.vision";

/// Daily archive location on the public mirror.
pub fn archive_url(
    base_url: &str,
    market: Market,
    kind: TradeKind,
    symbol: &str,
    date: NaiveDate,
) -> String {
    format!(
        "{}/data/{}/daily/{kind}/{symbol}/{symbol}-{kind}-{}.zip",
        base_url.trim_end_matches('/'),
        market.archive_segment(),
        date.format("%Y-%m-%d")
    )
}

/// The single file inside a trade archive.
pub struct ArchiveEntry {
    pub name: String,
    pub contents: Vec<u8>,
}

/// Reads the only file of a ZIP archive; zero or several files is an error.
pub fn read_single_entry(path: &Path) -> Result<ArchiveEntry, PipelineError> {
    let file = File::open(path)
        .map_err(|err| PipelineError::transport(format!("failed to open {}", path.display()), err))?;
    let mut archive = zip::ZipArchive::new(file)
        .map_err(|err| PipelineError::transport(format!("invalid archive {}", path.display()), err))?;

    let mut file_indices = Vec::new();
    for idx in 0..archive.len() {
        let entry = archive.by_index(idx).map_err(|err| {
            PipelineError::transport(format!("invalid archive {}", path.display()), err)
        })?;
        if entry.is_file() {
            file_indices.push(idx);
        }
    }
    let &[only] = file_indices.as_slice() else {
        return Err(PipelineError::Transport(format!(
            "archive {} holds {} files, expected exactly 1",
            path.display(),
            file_indices.len()
        )));
    };

    let mut entry = archive.by_index(only).map_err(|err| {
        PipelineError::transport(format!("invalid archive {}", path.display()), err)
    })?;
    let name = entry.name().to_string();
    let mut contents = Vec::with_capacity(entry.size() as usize);
    entry.read_to_end(&mut contents).map_err(|err| {
        PipelineError::transport(format!("failed to inflate {name} from {}", path.display()), err)
    })?;
    Ok(ArchiveEntry { name, contents })
}

/// Decodes the rows of a single-entry trade or kline archive.
pub fn decode_archive<T: RowDecode>(path: &Path) -> Result<Vec<T>, PipelineError> {
    let entry = read_single_entry(path)?;
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(entry.contents.as_slice());
    let mut stream = RowStream::<T>::new();
    let mut records = Vec::new();
    for result in reader.records() {
        let row = result
            .map_err(|err| PipelineError::transport(format!("failed to read {}", entry.name), err))?;
        let line = row.position().map(|pos| pos.line()).unwrap_or(0);
        let fields: Vec<&str> = row.iter().collect();
        if let Some(record) = stream
            .push(&fields)
            .map_err(|err| PipelineError::from(err).at(format!("{}:{line}", entry.name)))?
        {
            records.push(record);
        }
    }
    stream
        .finish()
        .map_err(|err| PipelineError::from(err).at(entry.name.clone()))?;
    Ok(records)
}

/// Writes the archive's only file into `dest_dir` under its own name.
pub fn extract_single_entry(path: &Path, dest_dir: &Path) -> Result<PathBuf, PipelineError> {
    let entry = read_single_entry(path)?;
    let file_name = Path::new(&entry.name)
        .file_name()
        .ok_or_else(|| PipelineError::Transport(format!("archive entry {:?} has no file name", entry.name)))?;
    fs::create_dir_all(dest_dir).map_err(|err| {
        PipelineError::transport(format!("failed to create dir {}", dest_dir.display()), err)
    })?;
    let out = dest_dir.join(file_name);
    fs::write(&out, &entry.contents)
        .map_err(|err| PipelineError::transport(format!("failed to write {}", out.display()), err))?;
    Ok(out)
}

fn is_valid_archive(path: &Path) -> bool {
    read_single_entry(path).is_ok()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DownloadOutcome {
    AlreadyPresent,
    Downloaded { attempts: u32 },
}

/// Downloads archives and keeps only files that open as single-entry ZIPs.
pub struct ArchiveDownloader {
    client: Client,
    tries: u32,
    backoff_ms: u64,
}

impl ArchiveDownloader {
    pub fn new(tries: u32, timeout_ms: u64, backoff_ms: u64) -> Result<Self, PipelineError> {
        if tries == 0 {
            return Err(PipelineError::Config(
                "archive download tries must be positive".to_string(),
            ));
        }
        let client = Client::builder()
            .timeout(Duration::from_millis(timeout_ms))
            .pool_idle_timeout(Duration::from_secs(90))
            .build()
            .map_err(|err| PipelineError::transport("failed to build http client", err))?;
        Ok(Self {
            client,
            tries,
            backoff_ms,
        })
    }

    /// Fetches `url` into `dest` unless a valid archive is already there.
    ///
    /// An archive that fails validation is removed before the next attempt.
    pub fn download_validated(&self, url: &str, dest: &Path) -> Result<DownloadOutcome, PipelineError> {
        let span = tracing::info_span!("infra.archive.download", url = %url, dest = %dest.display());
        let _enter = span.enter();

        if dest.exists() {
            if is_valid_archive(dest) {
                tracing::debug!("archive already present");
                return Ok(DownloadOutcome::AlreadyPresent);
            }
            remove_invalid(dest)?;
        }
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent).map_err(|err| {
                PipelineError::transport(format!("failed to create dir {}", parent.display()), err)
            })?;
        }

        let start = Instant::now();
        let mut last_error = String::new();
        for attempt in 1..=self.tries {
            if attempt > 1 {
                metrics::counter!("tickvault.infra.archive.retries_total").increment(1);
                std::thread::sleep(Duration::from_millis(self.backoff_ms * u64::from(attempt - 1)));
            }
            match self.fetch_to(url, dest) {
                Ok(()) if is_valid_archive(dest) => {
                    metrics::counter!("tickvault.infra.archive.downloads_total", "result" => "ok")
                        .increment(1);
                    metrics::histogram!("tickvault.infra.archive.download_ms")
                        .record(start.elapsed().as_millis() as f64);
                    tracing::info!(attempts = attempt, "archive downloaded");
                    return Ok(DownloadOutcome::Downloaded { attempts: attempt });
                }
                Ok(()) => {
                    last_error = format!("downloaded file from {url} is not a single-entry archive");
                    remove_invalid(dest)?;
                }
                Err(err) => last_error = err.to_string(),
            }
            tracing::warn!(attempt, error = %last_error, "archive download attempt failed");
        }

        metrics::counter!("tickvault.infra.archive.downloads_total", "result" => "err").increment(1);
        Err(PipelineError::Transport(format!(
            "{last_error} (after {} attempts)",
            self.tries
        )))
    }

    fn fetch_to(&self, url: &str, dest: &Path) -> Result<(), PipelineError> {
        let resp = self
            .client
            .get(url)
            .send()
            .map_err(|err| PipelineError::transport(format!("request to {url} failed"), err))?;
        if !resp.status().is_success() {
            return Err(PipelineError::Transport(format!(
                "archive http error: status {} for {url}",
                resp.status().as_u16()
            )));
        }
        let bytes = resp
            .bytes()
            .map_err(|err| PipelineError::transport(format!("failed to read body of {url}"), err))?;
        let mut file = File::create(dest)
            .map_err(|err| PipelineError::transport(format!("failed to create {}", dest.display()), err))?;
        file.write_all(&bytes)
            .map_err(|err| PipelineError::transport(format!("failed to write {}", dest.display()), err))
    }
}

fn remove_invalid(path: &Path) -> Result<(), PipelineError> {
    tracing::debug!(path = %path.display(), "removing invalid archive");
    fs::remove_file(path).map_err(|err| {
        PipelineError::transport(format!("failed to remove {}", path.display()), err)
    })
}
