//! Security group creation
//!
//! Pipeline: resolve payload → verify VPC → create group → tag → authorize
//! ingress. A failure to authorize keeps the created group and is reported
//! with status 200 and a `ruleError`; the group must be fixed by hand.

use anyhow::{Context, Result};
use fwmig_rules::IpPermission;
use serde_json::{json, Value};
use tracing::{error, info, warn};

use crate::clock::Clock;
use crate::config::ProvisionConfig;
use crate::payload::RulesPayload;
use crate::provider::{ProviderError, SecurityGroupApi, Tag};

/// A security group that now exists, with or without its rules
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedGroup {
    pub security_group_id: String,
    pub security_group_name: String,
    pub vpc_id: String,
    pub rules_added: usize,
    pub rule_error: Option<String>,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CreateResponse {
    Created(CreatedGroup),
    /// Bad input or unreachable VPC; nothing was created
    Rejected { error: String },
    Failed { error: String, traceback: String },
}

impl CreateResponse {
    pub fn status_code(&self) -> u16 {
        match self {
            CreateResponse::Created(_) => 200,
            CreateResponse::Rejected { .. } => 400,
            CreateResponse::Failed { .. } => 500,
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            CreateResponse::Created(group) => {
                let mut body = json!({
                    "statusCode": self.status_code(),
                    "securityGroupId": group.security_group_id,
                    "securityGroupName": group.security_group_name,
                    "vpcId": group.vpc_id,
                    "rulesAdded": group.rules_added,
                    "message": group.message,
                });
                if let Some(rule_error) = &group.rule_error {
                    body["ruleError"] = json!(rule_error);
                }
                body
            }
            CreateResponse::Rejected { error } => json!({
                "statusCode": self.status_code(),
                "error": error,
            }),
            CreateResponse::Failed { error, traceback } => json!({
                "statusCode": self.status_code(),
                "error": error,
                "traceback": traceback,
            }),
        }
    }
}

pub struct Provisioner<'a> {
    api: &'a dyn SecurityGroupApi,
    clock: &'a dyn Clock,
    config: &'a ProvisionConfig,
}

impl<'a> Provisioner<'a> {
    pub fn new(api: &'a dyn SecurityGroupApi, clock: &'a dyn Clock, config: &'a ProvisionConfig) -> Self {
        Self { api, clock, config }
    }

    /// Handle one provisioning event. Never panics or returns an error;
    /// every outcome is a response.
    pub fn handle(&self, event: &Value) -> CreateResponse {
        let payload = match RulesPayload::from_event(event) {
            Ok(payload) => payload,
            Err(e) => {
                warn!("Rejecting event: {e}");
                return CreateResponse::Rejected { error: e.to_string() };
            }
        };
        info!("Found {} rules under '{}'", payload.rules.len(), payload.shape);

        match self.provision(&payload.rules) {
            Ok(response) => response,
            Err(e) => {
                error!("Provisioning failed: {e:#}");
                CreateResponse::Failed {
                    error: format!("{e:#}"),
                    traceback: format!("{e:?}"),
                }
            }
        }
    }

    fn provision(&self, rules: &[IpPermission]) -> Result<CreateResponse> {
        let vpc_id = self.config.vpc_id.as_str();
        if vpc_id.is_empty() {
            return Ok(CreateResponse::Rejected {
                error: "No VPC configured (set provision.vpc_id or FWMIG_VPC_ID)".to_string(),
            });
        }

        if let Err(e) = self.api.verify_vpc(vpc_id) {
            let error = match e {
                ProviderError::NotFound { .. } => format!("VPC {vpc_id} not found"),
                other => format!("Cannot access VPC {vpc_id}: {other}"),
            };
            warn!("{error}");
            return Ok(CreateResponse::Rejected { error });
        }
        info!("VPC verified: {vpc_id}");

        let timestamp = self.clock.timestamp();
        let group_name = format!("{}-{timestamp}", self.config.group_prefix);

        info!("Creating security group: {group_name}");
        let group_id = self
            .api
            .create_security_group(&group_name, &self.config.group_description, vpc_id)
            .with_context(|| format!("Failed to create security group {group_name}"))?;
        info!("Created security group: {group_id}");

        self.api
            .tag(&group_id, &self.tags(&timestamp))
            .with_context(|| format!("Failed to tag security group {group_id}"))?;
        info!("Tags added");

        let mut created = CreatedGroup {
            security_group_id: group_id,
            security_group_name: group_name,
            vpc_id: vpc_id.to_string(),
            rules_added: 0,
            rule_error: None,
            message: "Security group created successfully".to_string(),
        };

        if rules.is_empty() {
            warn!("No rules to add");
            return Ok(CreateResponse::Created(created));
        }

        info!("Adding {} ingress rules", rules.len());
        match self.api.authorize_ingress(&created.security_group_id, rules) {
            Ok(()) => {
                info!("Added {} ingress rules", rules.len());
                created.rules_added = rules.len();
            }
            Err(e) => {
                error!("Error adding rules to {}: {e}", created.security_group_id);
                created.message = format!("Security group created but rules failed: {e}");
                created.rule_error = Some(e.to_string());
            }
        }
        Ok(CreateResponse::Created(created))
    }

    fn tags(&self, timestamp: &str) -> Vec<Tag> {
        vec![
            Tag::new("Name", &self.config.name_tag),
            Tag::new("Source", &self.config.source_tag),
            Tag::new("MigrationDate", timestamp),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use chrono::{TimeZone, Utc};
    use std::cell::RefCell;

    #[derive(Default)]
    struct MockApi {
        vpc_error: Option<ProviderError>,
        create_error: Option<ProviderError>,
        tag_error: Option<ProviderError>,
        authorize_error: Option<ProviderError>,
        calls: RefCell<Vec<String>>,
        tags: RefCell<Vec<Tag>>,
        authorized: RefCell<Vec<IpPermission>>,
    }

    impl MockApi {
        fn record(&self, call: &str) {
            self.calls.borrow_mut().push(call.to_string());
        }

        fn count(&self, call: &str) -> usize {
            self.calls.borrow().iter().filter(|c| c.as_str() == call).count()
        }
    }

    fn fail<T>(err: &Option<ProviderError>, ok: T) -> Result<T, ProviderError> {
        match err {
            Some(e) => Err(e.clone()),
            None => Ok(ok),
        }
    }

    impl SecurityGroupApi for MockApi {
        fn verify_vpc(&self, _vpc_id: &str) -> Result<(), ProviderError> {
            self.record("verify_vpc");
            fail(&self.vpc_error, ())
        }

        fn create_security_group(&self, name: &str, _: &str, _: &str) -> Result<String, ProviderError> {
            self.record("create");
            fail(&self.create_error, format!("sg-{}", name.len()))
        }

        fn tag(&self, _: &str, tags: &[Tag]) -> Result<(), ProviderError> {
            self.record("tag");
            self.tags.borrow_mut().extend_from_slice(tags);
            fail(&self.tag_error, ())
        }

        fn authorize_ingress(&self, _: &str, rules: &[IpPermission]) -> Result<(), ProviderError> {
            self.record("authorize");
            self.authorized.borrow_mut().extend_from_slice(rules);
            fail(&self.authorize_error, ())
        }

        fn count_ingress_rules(&self, _: &str) -> Result<usize, ProviderError> {
            self.record("count");
            Ok(self.authorized.borrow().len())
        }
    }

    fn config() -> ProvisionConfig {
        ProvisionConfig {
            vpc_id: "vpc-0abc".to_string(),
            ..ProvisionConfig::default()
        }
    }

    fn clock() -> FixedClock {
        FixedClock(Utc.with_ymd_and_hms(2025, 1, 31, 23, 59, 58).unwrap())
    }

    fn event() -> Value {
        json!({"rules": [
            {"IpProtocol": "tcp", "FromPort": 22, "ToPort": 22, "IpRanges": [{"CidrIp": "10.0.0.0/8"}]},
            {"IpProtocol": "tcp", "FromPort": 443, "ToPort": 443, "IpRanges": [{"CidrIp": "0.0.0.0/0"}]}
        ]})
    }

    #[test]
    fn test_successful_provisioning() {
        let api = MockApi::default();
        let (clock, config) = (clock(), config());
        let response = Provisioner::new(&api, &clock, &config).handle(&event());

        let CreateResponse::Created(group) = &response else {
            panic!("unexpected response: {response:?}");
        };
        assert_eq!(group.security_group_name, "firewalld-migrated-sg-20250131-235958");
        assert_eq!(group.vpc_id, "vpc-0abc");
        assert_eq!(group.rules_added, 2);
        assert!(group.rule_error.is_none());
        assert_eq!(*api.calls.borrow(), vec!["verify_vpc", "create", "tag", "authorize"]);

        let body = response.to_json();
        assert_eq!(body["statusCode"], 200);
        assert_eq!(body["message"], "Security group created successfully");
        assert!(body.get("ruleError").is_none());
    }

    #[test]
    fn test_tags_use_creation_timestamp() {
        let api = MockApi::default();
        let (clock, config) = (clock(), config());
        Provisioner::new(&api, &clock, &config).handle(&event());

        let tags = api.tags.borrow();
        assert_eq!(tags[0], Tag::new("Name", "Firewalld-Migrated-SG"));
        assert_eq!(tags[1], Tag::new("Source", "Firewalld-Firewall"));
        assert_eq!(tags[2], Tag::new("MigrationDate", "20250131-235958"));
    }

    #[test]
    fn test_missing_vpc_prevents_creation() {
        let api = MockApi {
            vpc_error: Some(ProviderError::NotFound { message: "VPC vpc-0abc".into() }),
            ..Default::default()
        };
        let (clock, config) = (clock(), config());
        let response = Provisioner::new(&api, &clock, &config).handle(&event());

        assert_eq!(response, CreateResponse::Rejected { error: "VPC vpc-0abc not found".into() });
        assert_eq!(response.status_code(), 400);
        assert_eq!(api.count("create"), 0);
    }

    #[test]
    fn test_inaccessible_vpc_prevents_creation() {
        let api = MockApi {
            vpc_error: Some(ProviderError::Access { message: "UnauthorizedOperation".into() }),
            ..Default::default()
        };
        let (clock, config) = (clock(), config());
        let response = Provisioner::new(&api, &clock, &config).handle(&event());

        let CreateResponse::Rejected { error } = &response else {
            panic!("unexpected response: {response:?}");
        };
        assert!(error.starts_with("Cannot access VPC vpc-0abc"));
        assert_eq!(api.count("create"), 0);
    }

    #[test]
    fn test_unconfigured_vpc_is_rejected() {
        let api = MockApi::default();
        let clock = clock();
        let config = ProvisionConfig::default();
        let response = Provisioner::new(&api, &clock, &config).handle(&event());
        assert_eq!(response.status_code(), 400);
        assert!(api.calls.borrow().is_empty());
    }

    #[test]
    fn test_rule_failure_keeps_group() {
        let api = MockApi {
            authorize_error: Some(ProviderError::Call {
                operation: "authorize-security-group-ingress",
                message: "InvalidPermission.Duplicate".into(),
            }),
            ..Default::default()
        };
        let (clock, config) = (clock(), config());
        let response = Provisioner::new(&api, &clock, &config).handle(&event());

        let CreateResponse::Created(group) = &response else {
            panic!("unexpected response: {response:?}");
        };
        assert!(!group.security_group_id.is_empty());
        assert_eq!(group.rules_added, 0);
        assert!(group.rule_error.as_deref().unwrap().contains("Duplicate"));
        assert!(group.message.starts_with("Security group created but rules failed"));

        let body = response.to_json();
        assert_eq!(body["statusCode"], 200);
        assert_eq!(body["rulesAdded"], 0);
        assert!(body["ruleError"].is_string());
    }

    #[test]
    fn test_create_failure_is_internal_error() {
        let api = MockApi {
            create_error: Some(ProviderError::Call {
                operation: "create-security-group",
                message: "InvalidGroup.Duplicate".into(),
            }),
            ..Default::default()
        };
        let (clock, config) = (clock(), config());
        let response = Provisioner::new(&api, &clock, &config).handle(&event());

        let CreateResponse::Failed { error, traceback } = &response else {
            panic!("unexpected response: {response:?}");
        };
        assert!(error.contains("Failed to create security group"));
        assert!(error.contains("InvalidGroup.Duplicate"));
        assert!(!traceback.is_empty());
        assert_eq!(response.to_json()["statusCode"], 500);
        assert_eq!(api.count("tag"), 0);
    }

    #[test]
    fn test_tag_failure_is_internal_error() {
        let api = MockApi {
            tag_error: Some(ProviderError::Access { message: "no ec2:CreateTags".into() }),
            ..Default::default()
        };
        let (clock, config) = (clock(), config());
        let response = Provisioner::new(&api, &clock, &config).handle(&event());
        assert_eq!(response.status_code(), 500);
        assert_eq!(api.count("authorize"), 0);
    }

    #[test]
    fn test_empty_rules_skip_authorize() {
        let api = MockApi::default();
        let (clock, config) = (clock(), config());
        let response = Provisioner::new(&api, &clock, &config).handle(&json!({"security_group_rules": []}));

        let CreateResponse::Created(group) = &response else {
            panic!("unexpected response: {response:?}");
        };
        assert_eq!(group.rules_added, 0);
        assert!(group.rule_error.is_none());
        assert_eq!(api.count("authorize"), 0);
    }

    #[test]
    fn test_bad_payload_touches_nothing() {
        let api = MockApi::default();
        let (clock, config) = (clock(), config());
        let response = Provisioner::new(&api, &clock, &config).handle(&json!({"firewall": {}}));

        assert_eq!(response.status_code(), 400);
        let body = response.to_json();
        assert!(body["error"].as_str().unwrap().contains("firewall"));
        assert!(api.calls.borrow().is_empty());
    }
}
