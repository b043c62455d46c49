//! Extraction artifact and the EC2 ingress wire format

use serde::{Deserialize, Serialize};

use crate::aggregate::{aggregate, PortSpecError};
use crate::model::IngressRule;

/// One EC2 `IpPermission`, as written to the artifact and sent to
/// `authorize-security-group-ingress`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct IpPermission {
    pub ip_protocol: String,
    pub from_port: i32,
    pub to_port: i32,
    #[serde(default)]
    pub ip_ranges: Vec<IpRange>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct IpRange {
    pub cidr_ip: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl From<&IngressRule> for IpPermission {
    fn from(rule: &IngressRule) -> Self {
        Self {
            ip_protocol: rule.protocol.to_string(),
            from_port: i32::from(rule.from_port),
            to_port: i32::from(rule.to_port),
            ip_ranges: vec![IpRange {
                cidr_ip: rule.source_cidr.clone(),
                description: Some(rule.description.clone()),
            }],
        }
    }
}

/// Result of one extraction run: the raw firewalld inputs and the derived
/// security group rules. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionResult {
    services: Vec<String>,
    ports: Vec<String>,
    rich_rules: Vec<String>,
    security_group_rules: Vec<IpPermission>,
}

impl ExtractionResult {
    /// Aggregate raw firewalld state into an extraction result
    pub fn extract(
        services: Vec<String>,
        ports: Vec<String>,
        rich_rules: Vec<String>,
    ) -> Result<Self, PortSpecError> {
        let rules = aggregate(&services, &ports, &rich_rules)?;
        Ok(Self {
            security_group_rules: rules.iter().map(IpPermission::from).collect(),
            services,
            ports,
            rich_rules,
        })
    }

    pub fn services(&self) -> &[String] {
        &self.services
    }

    pub fn ports(&self) -> &[String] {
        &self.ports
    }

    pub fn rich_rules(&self) -> &[String] {
        &self.rich_rules
    }

    pub fn security_group_rules(&self) -> &[IpPermission] {
        &self.security_group_rules
    }

    pub fn rule_count(&self) -> usize {
        self.security_group_rules.len()
    }

    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
