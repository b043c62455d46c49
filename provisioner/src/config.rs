//! Provisioner configuration loading

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

const DEFAULT_CONFIG_PATH: &str = "/etc/fwmig/config.toml";

/// Sections of the fwmig config file read by the provisioner
#[derive(Debug, Deserialize, Default)]
pub struct ProvisionerConfig {
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub provision: ProvisionConfig,
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

#[derive(Debug, Clone, Deserialize)]
pub struct ProvisionConfig {
    /// Target VPC; overridden by `FWMIG_VPC_ID`
    #[serde(default)]
    pub vpc_id: String,
    #[serde(default = "default_group_prefix")]
    pub group_prefix: String,
    #[serde(default = "default_group_description")]
    pub group_description: String,
    #[serde(default = "default_name_tag")]
    pub name_tag: String,
    #[serde(default = "default_source_tag")]
    pub source_tag: String,
    #[serde(default = "default_aws_cli")]
    pub aws_cli: String,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub profile: Option<String>,
}

impl Default for ProvisionConfig {
    fn default() -> Self {
        Self {
            vpc_id: String::new(),
            group_prefix: default_group_prefix(),
            group_description: default_group_description(),
            name_tag: default_name_tag(),
            source_tag: default_source_tag(),
            aws_cli: default_aws_cli(),
            region: None,
            profile: None,
        }
    }
}

fn default_log_level() -> String { "info".into() }
fn default_group_prefix() -> String { "firewalld-migrated-sg".into() }
fn default_group_description() -> String { "Security group migrated from Firewalld firewall".into() }
fn default_name_tag() -> String { "Firewalld-Migrated-SG".into() }
fn default_source_tag() -> String { "Firewalld-Firewall".into() }
fn default_aws_cli() -> String { "aws".into() }

/// Load configuration.
///
/// An explicit path must exist. Otherwise `FWMIG_CONFIG` or
/// `/etc/fwmig/config.toml` is read when present, defaults when not.
/// `FWMIG_VPC_ID` wins over the configured VPC.
pub fn load_config(explicit: Option<&Path>) -> Result<ProvisionerConfig> {
    let mut config = read_config(explicit)?;
    if let Ok(vpc_id) = std::env::var("FWMIG_VPC_ID") {
        if !vpc_id.trim().is_empty() {
            config.provision.vpc_id = vpc_id.trim().to_string();
        }
    }
    Ok(config)
}

fn read_config(explicit: Option<&Path>) -> Result<ProvisionerConfig> {
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
        return Ok(ProvisionerConfig::default());
    }

    let content = fs::read_to_string(&config_path)
        .with_context(|| format!("Failed to read config from {}", config_path.display()))?;
    let mut config: ProvisionerConfig = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config from {}", config_path.display()))?;
    config.source = Some(config_path);
    Ok(config)
}
