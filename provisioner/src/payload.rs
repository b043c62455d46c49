//! Invocation payload shapes
//!
//! The provisioner accepts the rule list in three layouts, tried in order:
//!
//! - `{"rules": {"security_group_rules": [...]}}` (a whole extraction artifact)
//! - `{"rules": [...]}`
//! - `{"security_group_rules": [...]}`

use fwmig_rules::IpPermission;
use serde_json::Value;
use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadShape {
    NestedArtifact,
    RulesList,
    SecurityGroupRules,
}

impl fmt::Display for PayloadShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            PayloadShape::NestedArtifact => "rules.security_group_rules",
            PayloadShape::RulesList => "rules",
            PayloadShape::SecurityGroupRules => "security_group_rules",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PayloadError {
    #[error("Cannot find rules in event. Keys: {keys:?}")]
    UnrecognizedShape { keys: Vec<String> },

    #[error("Invalid rules in '{shape}': {message}")]
    InvalidRules { shape: PayloadShape, message: String },
}

/// Rules carried by a provisioning event
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RulesPayload {
    pub shape: PayloadShape,
    pub rules: Vec<IpPermission>,
}

impl RulesPayload {
    pub fn from_event(event: &Value) -> Result<Self, PayloadError> {
        let (shape, raw) = locate(event)?;
        let rules = serde_json::from_value(raw.clone()).map_err(|e| PayloadError::InvalidRules {
            shape,
            message: e.to_string(),
        })?;
        Ok(Self { shape, rules })
    }
}

fn locate(event: &Value) -> Result<(PayloadShape, &Value), PayloadError> {
    if let Some(rules) = event.get("rules") {
        if let Some(nested) = rules.get("security_group_rules") {
            return Ok((PayloadShape::NestedArtifact, nested));
        }
        if rules.is_array() {
            return Ok((PayloadShape::RulesList, rules));
        }
    }
    if let Some(rules) = event.get("security_group_rules") {
        if rules.is_array() {
            return Ok((PayloadShape::SecurityGroupRules, rules));
        }
    }

    Err(PayloadError::UnrecognizedShape {
        keys: event
            .as_object()
            .map(|obj| obj.keys().cloned().collect())
            .unwrap_or_default(),
    })
}
