use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Configuration for reaching the remote compute session service.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct SessionConfig {
    /// Base url of the session service, e.g. `https://app.ilastik.org`
    pub server_url: String,
    /// Requested lifetime of a created session
    pub session_duration_minutes: u64,
    /// Fixed interval between readiness polls while a session starts up
    pub poll_interval_ms: u64,
    /// Total time budget for session startup; polling gives up once spent
    pub timeout_budget_ms: u64,
}

/// Load configuration from a YAML file
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<SessionConfig> {
    let content = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

    let config: SessionConfig =
        serde_yaml_ng::from_str(&content).with_context(|| "Failed to parse YAML configuration")?;

    validate_config(&config)?;
    Ok(config)
}

/// Validate configuration
pub(crate) fn validate_config(config: &SessionConfig) -> Result<()> {
    ilurl::Url::parse(&config.server_url)
        .with_context(|| format!("server_url is not a valid url: {}", config.server_url))?;

    if config.session_duration_minutes == 0 {
        anyhow::bail!("session_duration_minutes must be greater than 0");
    }

    if config.poll_interval_ms == 0 {
        anyhow::bail!("poll_interval_ms must be greater than 0");
    }

    if config.timeout_budget_ms < config.poll_interval_ms {
        anyhow::bail!("timeout_budget_ms must be at least one poll interval");
    }

    Ok(())
}
