//! firewalld state queries
//!
//! Each property is read with its own `firewall-cmd` invocation, one after
//! the other. Any failed query aborts the extraction.

use anyhow::{Context, Result};
use fwmig_rules::ExtractionResult;
use std::process::Command;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum QueryError {
    #[error("failed to run {command}: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{command} exited with {status}: {stderr}")]
    Failed {
        command: String,
        status: String,
        stderr: String,
    },
}

/// Read access to the live firewall state
pub trait FirewallSource {
    /// Raw `--get-active-zones` listing
    fn active_zones(&self) -> Result<String, QueryError>;
    fn services(&self) -> Result<Vec<String>, QueryError>;
    fn ports(&self) -> Result<Vec<String>, QueryError>;
    fn rich_rules(&self) -> Result<Vec<String>, QueryError>;
}

/// `firewall-cmd` backed source
pub struct FirewallCmd {
    binary: String,
    zone: Option<String>,
}

impl FirewallCmd {
    pub fn new(binary: impl Into<String>, zone: Option<String>) -> Self {
        Self {
            binary: binary.into(),
            zone,
        }
    }

    fn run(&self, flag: &str, zoned: bool) -> Result<String, QueryError> {
        let mut args = Vec::with_capacity(2);
        if zoned {
            if let Some(zone) = &self.zone {
                args.push(format!("--zone={zone}"));
            }
        }
        args.push(flag.to_string());

        let command = format!("{} {}", self.binary, args.join(" "));
        debug!("Running {command}");

        let output = Command::new(&self.binary)
            .args(&args)
            .output()
            .map_err(|source| QueryError::Spawn {
                command: command.clone(),
                source,
            })?;

        if !output.status.success() {
            return Err(QueryError::Failed {
                command,
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

impl FirewallSource for FirewallCmd {
    fn active_zones(&self) -> Result<String, QueryError> {
        self.run("--get-active-zones", false)
    }

    fn services(&self) -> Result<Vec<String>, QueryError> {
        self.run("--list-services", true).map(|out| split_words(&out))
    }

    fn ports(&self) -> Result<Vec<String>, QueryError> {
        self.run("--list-ports", true).map(|out| split_words(&out))
    }

    fn rich_rules(&self) -> Result<Vec<String>, QueryError> {
        self.run("--list-rich-rules", true).map(|out| split_lines(&out))
    }
}

/// Whitespace separated listing (`--list-services`, `--list-ports`)
pub fn split_words(output: &str) -> Vec<String> {
    output.split_whitespace().map(str::to_string).collect()
}

/// One entry per non-blank line (`--list-rich-rules`)
pub fn split_lines(output: &str) -> Vec<String> {
    output
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

/// Query every firewall property in order and aggregate the result.
pub fn collect<S: FirewallSource + ?Sized>(source: &S) -> Result<ExtractionResult> {
    let zones = source.active_zones().context("Failed to query active zones")?;
    info!("Active zones: {}", split_lines(&zones).join("; "));

    let services = source.services().context("Failed to list services")?;
    let ports = source.ports().context("Failed to list ports")?;
    let rich_rules = source.rich_rules().context("Failed to list rich rules")?;

    info!(
        "Found {} services, {} ports, {} rich rules",
        services.len(),
        ports.len(),
        rich_rules.len()
    );

    let result = ExtractionResult::extract(services, ports, rich_rules)
        .context("Invalid port in firewalld port list")?;
    info!("Derived {} security group rules", result.rule_count());
    Ok(result)
}
