//! Extractor configuration loading

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

const DEFAULT_CONFIG_PATH: &str = "/etc/fwmig/config.toml";

/// Sections of the fwmig config file read by the extractor
#[derive(Debug, Deserialize, Default)]
pub struct ExtractorConfig {
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub extract: ExtractConfig,
    /// File the config was read from, `None` when running on defaults
    #[serde(skip)]
    pub source: Option<PathBuf>,
}

#[derive(Debug, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ExtractConfig {
    /// Zone to list; the default zone when unset
    #[serde(default)]
    pub zone: Option<String>,
    #[serde(default = "default_firewall_cmd")]
    pub firewall_cmd: String,
    /// Artifact directory; a leading `~` is the invoking user's home
    #[serde(default = "default_output_dir")]
    pub output_dir: String,
    #[serde(default = "default_file_name")]
    pub file_name: String,
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            zone: None,
            firewall_cmd: default_firewall_cmd(),
            output_dir: default_output_dir(),
            file_name: default_file_name(),
        }
    }
}

fn default_log_level() -> String { "info".into() }
fn default_firewall_cmd() -> String { "firewall-cmd".into() }
fn default_output_dir() -> String { "~/fw-migration".into() }
fn default_file_name() -> String { "firewall_rules.json".into() }

/// Load configuration.
///
/// An explicit path must exist. Otherwise `FWMIG_CONFIG` or
/// `/etc/fwmig/config.toml` is read when present, defaults when not.
pub fn load_config(explicit: Option<&Path>) -> Result<ExtractorConfig> {
    let config_path = match explicit {
        Some(path) => {
            if !path.exists() {
                bail!("Config file {} does not exist", path.display());
            }
            path.to_path_buf()
        }
        None => PathBuf::from(
            std::env::var("FWMIG_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string()),
        ),
    };

    if !config_path.exists() {
        return Ok(ExtractorConfig::default());
    }

    let content = fs::read_to_string(&config_path)
        .with_context(|| format!("Failed to read config from {}", config_path.display()))?;
    let mut config: ExtractorConfig = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config from {}", config_path.display()))?;
    config.source = Some(config_path);
    Ok(config)
}
