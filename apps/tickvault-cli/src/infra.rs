use tickvault_application::config::Config;
use tickvault_infrastructure::archive::{ArchiveDownloader, DEFAULT_ARCHIVE_BASE_URL};
use tickvault_infrastructure::binance::{BinanceRestClient, RestClientConfig};

const DEFAULT_ARCHIVE_TRIES: u32 = 3;
const ARCHIVE_TIMEOUT_MS: u64 = 120_000;
const ARCHIVE_BACKOFF_MS: u64 = 1_000;

pub struct ArchiveDeps {
    pub downloader: ArchiveDownloader,
    pub base_url: String,
}

pub fn build_rest_client(config: &Config) -> Result<BinanceRestClient, String> {
    let mut rest = RestClientConfig::for_market(config.run.market);
    if let Some(backfill) = &config.backfill {
        if let Some(base_url) = &backfill.base_url {
            rest.base_url = base_url.clone();
        }
        if let Some(timeout_ms) = backfill.timeout_ms {
            rest.timeout_ms = timeout_ms;
        }
        if let Some(retries) = backfill.retries {
            rest.retries = retries;
        }
        if let Some(backoff_ms) = backfill.backoff_ms {
            rest.backoff_ms = backoff_ms;
        }
        rest.api_key = backfill.api_key.clone();
    }
    BinanceRestClient::new(rest).map_err(|err| err.to_string())
}

pub fn build_archive_deps(config: &Config) -> Result<ArchiveDeps, String> {
    let archive = config.archive.as_ref();
    let tries = archive
        .and_then(|archive| archive.tries)
        .unwrap_or(DEFAULT_ARCHIVE_TRIES);
    let base_url = archive
        .and_then(|archive| archive.base_url.clone())
        .unwrap_or_else(|| DEFAULT_ARCHIVE_BASE_URL.to_string());
    let downloader = ArchiveDownloader::new(tries, ARCHIVE_TIMEOUT_MS, ARCHIVE_BACKOFF_MS)
        .map_err(|err| err.to_string())?;
    Ok(ArchiveDeps {
        downloader,
        base_url,
    })
}
