//! Security group control-plane boundary

use fwmig_rules::IpPermission;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProviderError {
    #[error("not found: {message}")]
    NotFound { message: String },

    #[error("access denied: {message}")]
    Access { message: String },

    #[error("{operation} failed: {message}")]
    Call {
        operation: &'static str,
        message: String,
    },

    #[error("unexpected {operation} response: {message}")]
    Decode {
        operation: &'static str,
        message: String,
    },
}

/// EC2 resource tag
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Tag {
    pub key: String,
    pub value: String,
}

impl Tag {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// The security group operations the provisioner needs.
///
/// Every call blocks until the provider answers. Implementations do not
/// retry.
pub trait SecurityGroupApi {
    /// Confirm the VPC exists and is reachable
    fn verify_vpc(&self, vpc_id: &str) -> Result<(), ProviderError>;

    /// Create a security group, returning its id
    fn create_security_group(
        &self,
        name: &str,
        description: &str,
        vpc_id: &str,
    ) -> Result<String, ProviderError>;

    fn tag(&self, resource_id: &str, tags: &[Tag]) -> Result<(), ProviderError>;

    fn authorize_ingress(&self, group_id: &str, rules: &[IpPermission]) -> Result<(), ProviderError>;

    /// Number of ingress permissions currently on the group
    fn count_ingress_rules(&self, group_id: &str) -> Result<usize, ProviderError>;
}
