use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tickvault_domain::errors::PipelineError;
use tickvault_domain::services::backfill::DEFAULT_PAGE_LIMIT;
use tickvault_domain::services::pool::normalize_parallelism;
use tickvault_domain::value_objects::interval::Interval;
use tickvault_domain::value_objects::market::{Market, TradeKind};

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct Config {
    pub run: RunConfig,
    pub paths: PathsConfig,
    pub backfill: Option<BackfillConfig>,
    pub tidy: Option<TidyConfig>,
    pub klines: Option<KlinesConfig>,
    pub archive: Option<ArchiveConfig>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct RunConfig {
    pub symbol: String,
    pub kind: TradeKind,
    pub market: Market,
    pub parallelism: Option<i64>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct PathsConfig {
    pub raw_dir: String,
    pub missing_dir: String,
    pub tidy_dir: String,
    pub out_dir: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct BackfillConfig {
    pub base_url: Option<String>,
    pub page_limit: Option<usize>,
    pub timeout_ms: Option<u64>,
    pub retries: Option<u32>,
    pub backoff_ms: Option<u64>,
    pub api_key: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct TidyConfig {
    pub check_tidy_file_exists: Option<bool>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct KlinesConfig {
    pub interval: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct ArchiveConfig {
    pub base_url: Option<String>,
    pub tries: Option<u32>,
}

impl Config {
    /// Worker count for directory fan-out; absent or non-positive means 1.
    pub fn parallelism(&self) -> usize {
        let configured = self
            .run
            .parallelism
            .and_then(|value| usize::try_from(value).ok());
        normalize_parallelism(configured)
    }

    pub fn raw_dir(&self) -> PathBuf {
        PathBuf::from(&self.paths.raw_dir)
    }

    pub fn missing_dir(&self) -> PathBuf {
        PathBuf::from(&self.paths.missing_dir)
    }

    pub fn tidy_dir(&self) -> PathBuf {
        PathBuf::from(&self.paths.tidy_dir)
    }

    pub fn out_dir(&self) -> PathBuf {
        PathBuf::from(&self.paths.out_dir)
    }

    pub fn page_limit(&self) -> usize {
        self.backfill
            .as_ref()
            .and_then(|backfill| backfill.page_limit)
            .unwrap_or(DEFAULT_PAGE_LIMIT)
    }

    pub fn check_tidy_file_exists(&self) -> bool {
        self.tidy
            .as_ref()
            .and_then(|tidy| tidy.check_tidy_file_exists)
            .unwrap_or(true)
    }

    pub fn kline_interval(&self) -> Result<Option<Interval>, PipelineError> {
        self.klines
            .as_ref()
            .map(|klines| Interval::parse(&klines.interval))
            .transpose()
    }

    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.run.symbol.trim().is_empty() {
            return Err(PipelineError::Config("run.symbol must not be empty".to_string()));
        }
        if self.page_limit() == 0 {
            return Err(PipelineError::Config(
                "backfill.page_limit must be positive".to_string(),
            ));
        }
        if let Some(archive) = &self.archive {
            if archive.tries == Some(0) {
                return Err(PipelineError::Config("archive.tries must be positive".to_string()));
            }
        }
        if let Some(interval) = self.kline_interval()? {
            interval.ensure_candle_width()?;
        }
        Ok(())
    }
}

pub fn parse_config(toml_str: &str) -> Result<Config, String> {
    toml::from_str(toml_str).map_err(|err| format!("failed to parse config: {err}"))
}

pub fn load_config(path: &Path) -> Result<Config, String> {
    let contents = fs::read_to_string(path)
        .map_err(|err| format!("failed to read config {}: {err}", path.display()))?;
    let config = parse_config(&contents)?;
    config.validate().map_err(|err| err.to_string())?;
    Ok(config)
}

pub fn to_toml_pretty(config: &Config) -> Result<String, String> {
    toml::to_string_pretty(config).map_err(|err| format!("failed to serialize config: {err}"))
}
