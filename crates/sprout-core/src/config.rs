//! YAML configuration for the daemon. Secrets stay out of the file via
//! `${ENV_VAR}` placeholders, resolved at load time.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use serde::Deserialize;

pub const DEFAULT_CYCLE_INTERVAL_SECS: u64 = 3600;
pub const DEFAULT_CYCLE_TIMEOUT_SECS: u64 = 180;

#[derive(Debug, Clone, Deserialize)]
pub struct SproutConfig {
    pub data_dir: PathBuf,
    pub model: ModelConfig,
    pub species: SpeciesConfig,
    pub weather: WeatherConfig,
    #[serde(default)]
    pub schedule: ScheduleConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ModelConfig {
    pub model_id: String,
    #[serde(default)]
    pub api_base: Option<String>,
    pub api_key: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SpeciesConfig {
    pub api_key: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WeatherConfig {
    pub api_key: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScheduleConfig {
    #[serde(default = "default_interval")]
    pub cycle_interval_secs: u64,
    #[serde(default = "default_timeout")]
    pub cycle_timeout_secs: u64,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            cycle_interval_secs: DEFAULT_CYCLE_INTERVAL_SECS,
            cycle_timeout_secs: DEFAULT_CYCLE_TIMEOUT_SECS,
        }
    }
}

fn default_interval() -> u64 {
    DEFAULT_CYCLE_INTERVAL_SECS
}

fn default_timeout() -> u64 {
    DEFAULT_CYCLE_TIMEOUT_SECS
}

/// Replace every `${VAR}` in `raw` with the value of the environment
/// variable, or the empty string when unset. An unclosed placeholder is
/// left as-is.
pub fn resolve_env_var(raw: &str) -> String {
    let mut output = String::new();
    let mut rest = raw;

    while let Some(start) = rest.find("${") {
        output.push_str(&rest[..start]);

        let candidate = &rest[start + 2..];
        let Some(end) = candidate.find('}') else {
            output.push_str(&rest[start..]);
            return output;
        };

        let key = &candidate[..end];
        output.push_str(&std::env::var(key).unwrap_or_default());
        rest = &candidate[end + 1..];
    }

    output.push_str(rest);
    output
}

pub fn load_config(path: &Path) -> Result<SproutConfig> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("failed to read config file: {}", path.display()))?;
    let mut config: SproutConfig = serde_yaml::from_str(&content)
        .with_context(|| format!("failed to parse yaml file: {}", path.display()))?;

    config.model.api_key = resolve_env_var(&config.model.api_key);
    config.species.api_key = resolve_env_var(&config.species.api_key);
    config.weather.api_key = resolve_env_var(&config.weather.api_key);
    if let Some(base) = config.model.api_base.as_deref() {
        config.model.api_base = Some(resolve_env_var(base));
    }

    validate_config(&config)?;
    Ok(config)
}

pub fn validate_config(config: &SproutConfig) -> Result<()> {
    if config.model.model_id.trim().is_empty() {
        bail!("model.model_id must not be empty");
    }
    if config.model.api_key.trim().is_empty() {
        bail!("model.api_key resolved to an empty value");
    }
    if config.species.api_key.trim().is_empty() {
        bail!("species.api_key resolved to an empty value");
    }
    if config.weather.api_key.trim().is_empty() {
        bail!("weather.api_key resolved to an empty value");
    }
    if config.schedule.cycle_interval_secs == 0 {
        bail!("schedule.cycle_interval_secs must be greater than zero");
    }
    if config.schedule.cycle_timeout_secs == 0 {
        bail!("schedule.cycle_timeout_secs must be greater than zero");
    }
    Ok(())
}
