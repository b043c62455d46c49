//! fwmig provisioner: cloud side of the migration
//!
//! Creates an EC2 security group from the extraction artifact and confirms
//! the applied rules. The EC2 control plane is reached through the
//! [`provider::SecurityGroupApi`] collaborator.

pub mod aws_cli;
pub mod clock;
pub mod config;
pub mod create;
pub mod payload;
pub mod provider;
pub mod validate;
