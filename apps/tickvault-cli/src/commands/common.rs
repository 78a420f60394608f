use serde::Serialize;
use std::path::PathBuf;
use tickvault_application::config::{load_config, Config};

/// Loads the config from `--config` or env `TICKVAULT_CONFIG`.
pub(super) fn load(config_path: Option<PathBuf>) -> Result<Config, String> {
    let path = config_path
        .or_else(|| {
            std::env::var("TICKVAULT_CONFIG")
                .ok()
                .filter(|v| !v.trim().is_empty())
                .map(PathBuf::from)
        })
        .ok_or_else(|| "missing --config and env TICKVAULT_CONFIG is not set".to_string())?;
    let config = load_config(&path)?;
    tracing::info!(
        config = %path.display(),
        symbol = %config.run.symbol,
        kind = %config.run.kind,
        market = config.run.market.as_str(),
        parallelism = config.parallelism(),
        "loaded config"
    );
    Ok(config)
}

pub(super) fn print_json<S: Serialize>(value: &S) -> Result<(), String> {
    let line = serde_json::to_string(value)
        .map_err(|err| format!("failed to serialize report: {err}"))?;
    println!("{line}");
    Ok(())
}
