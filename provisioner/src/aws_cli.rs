//! `aws ec2` CLI backed [`SecurityGroupApi`]
//!
//! Each operation is one `aws ec2 <operation> ... --output json` run.
//! List-valued parameters are passed as a single JSON argument, which the CLI
//! accepts for any structure-typed option.

use fwmig_rules::IpPermission;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::process::Command;
use tracing::debug;

use crate::provider::{ProviderError, SecurityGroupApi, Tag};

pub struct AwsCli {
    binary: String,
    region: Option<String>,
    profile: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct DescribeVpcsOutput {
    #[serde(default)]
    vpcs: Vec<serde_json::Value>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct CreateSecurityGroupOutput {
    group_id: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct DescribeSecurityGroupsOutput {
    #[serde(default)]
    security_groups: Vec<SecurityGroup>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct SecurityGroup {
    #[serde(default)]
    ip_permissions: Vec<serde_json::Value>,
}

impl AwsCli {
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
            region: None,
            profile: None,
        }
    }

    pub fn with_region(mut self, region: Option<String>) -> Self {
        self.region = region;
        self
    }

    pub fn with_profile(mut self, profile: Option<String>) -> Self {
        self.profile = profile;
        self
    }

    fn ec2(&self, operation: &'static str, args: &[&str]) -> Result<String, ProviderError> {
        let mut cmd = Command::new(&self.binary);
        cmd.args(["ec2", operation]).args(args).args(["--output", "json"]);
        if let Some(region) = &self.region {
            cmd.args(["--region", region.as_str()]);
        }
        if let Some(profile) = &self.profile {
            cmd.args(["--profile", profile.as_str()]);
        }

        debug!("Running {} ec2 {operation}", self.binary);
        let output = cmd.output().map_err(|e| ProviderError::Call {
            operation,
            message: format!("failed to run {}: {e}", self.binary),
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            return Err(classify_failure(operation, stderr));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

/// Map CLI error output onto the provider error kinds
pub fn classify_failure(operation: &'static str, stderr: String) -> ProviderError {
    if stderr.contains(".NotFound") || stderr.contains("NotFound)") {
        ProviderError::NotFound { message: stderr }
    } else if ["UnauthorizedOperation", "AccessDenied", "AuthFailure", "Unable to locate credentials"]
        .iter()
        .any(|marker| stderr.contains(marker))
    {
        ProviderError::Access { message: stderr }
    } else {
        ProviderError::Call {
            operation,
            message: stderr,
        }
    }
}

fn decode<T: DeserializeOwned>(operation: &'static str, stdout: &str) -> Result<T, ProviderError> {
    serde_json::from_str(stdout).map_err(|e| ProviderError::Decode {
        operation,
        message: e.to_string(),
    })
}

fn to_json_arg<T: serde::Serialize + ?Sized>(
    operation: &'static str,
    value: &T,
) -> Result<String, ProviderError> {
    serde_json::to_string(value).map_err(|e| ProviderError::Call {
        operation,
        message: format!("cannot encode parameters: {e}"),
    })
}

fn vpc_count(stdout: &str) -> Result<usize, ProviderError> {
    decode::<DescribeVpcsOutput>("describe-vpcs", stdout).map(|out| out.vpcs.len())
}

fn ingress_count(stdout: &str) -> Result<usize, ProviderError> {
    let out: DescribeSecurityGroupsOutput = decode("describe-security-groups", stdout)?;
    out.security_groups
        .first()
        .map(|group| group.ip_permissions.len())
        .ok_or_else(|| ProviderError::NotFound {
            message: "describe-security-groups returned no groups".to_string(),
        })
}

impl SecurityGroupApi for AwsCli {
    fn verify_vpc(&self, vpc_id: &str) -> Result<(), ProviderError> {
        let stdout = self.ec2("describe-vpcs", &["--vpc-ids", vpc_id])?;
        match vpc_count(&stdout)? {
            0 => Err(ProviderError::NotFound {
                message: format!("VPC {vpc_id}"),
            }),
            _ => Ok(()),
        }
    }

    fn create_security_group(
        &self,
        name: &str,
        description: &str,
        vpc_id: &str,
    ) -> Result<String, ProviderError> {
        let stdout = self.ec2(
            "create-security-group",
            &["--group-name", name, "--description", description, "--vpc-id", vpc_id],
        )?;
        decode::<CreateSecurityGroupOutput>("create-security-group", &stdout).map(|out| out.group_id)
    }

    fn tag(&self, resource_id: &str, tags: &[Tag]) -> Result<(), ProviderError> {
        let tags = to_json_arg("create-tags", tags)?;
        self.ec2("create-tags", &["--resources", resource_id, "--tags", &tags])?;
        Ok(())
    }

    fn authorize_ingress(&self, group_id: &str, rules: &[IpPermission]) -> Result<(), ProviderError> {
        let permissions = to_json_arg("authorize-security-group-ingress", rules)?;
        self.ec2(
            "authorize-security-group-ingress",
            &["--group-id", group_id, "--ip-permissions", &permissions],
        )?;
        Ok(())
    }

    fn count_ingress_rules(&self, group_id: &str) -> Result<usize, ProviderError> {
        let stdout = self.ec2("describe-security-groups", &["--group-ids", group_id])?;
        ingress_count(&stdout)
    }
}
