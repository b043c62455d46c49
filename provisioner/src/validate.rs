//! Post-migration check: count the ingress rules on a security group

use serde_json::{json, Value};
use tracing::{error, info, warn};

use crate::provider::SecurityGroupApi;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidateResponse {
    Validated { rules_count: usize },
    /// Event without a usable `securityGroupId`
    Rejected { error: String },
    Failed { error: String },
}

impl ValidateResponse {
    pub fn status_code(&self) -> u16 {
        match self {
            ValidateResponse::Validated { .. } => 200,
            ValidateResponse::Rejected { .. } => 400,
            ValidateResponse::Failed { .. } => 500,
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            ValidateResponse::Validated { rules_count } => json!({
                "statusCode": self.status_code(),
                "validated": true,
                "rulesCount": rules_count,
            }),
            ValidateResponse::Rejected { error } | ValidateResponse::Failed { error } => json!({
                "statusCode": self.status_code(),
                "validated": false,
                "error": error,
            }),
        }
    }
}

pub struct Validator<'a> {
    api: &'a dyn SecurityGroupApi,
}

impl<'a> Validator<'a> {
    pub fn new(api: &'a dyn SecurityGroupApi) -> Self {
        Self { api }
    }

    pub fn handle(&self, event: &Value) -> ValidateResponse {
        let Some(group_id) = event.get("securityGroupId").and_then(Value::as_str) else {
            warn!("Event has no securityGroupId");
            return ValidateResponse::Rejected {
                error: "Missing securityGroupId in event".to_string(),
            };
        };

        match self.api.count_ingress_rules(group_id) {
            Ok(rules_count) => {
                info!("Security group {group_id} has {rules_count} ingress rules");
                ValidateResponse::Validated { rules_count }
            }
            Err(e) => {
                error!("Validation of {group_id} failed: {e}");
                ValidateResponse::Failed { error: e.to_string() }
            }
        }
    }
}
