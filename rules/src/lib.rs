//! fwmig rule model
//!
//! Turns firewalld state (services, ports, rich rules) into canonical
//! ingress rules and the JSON artifact consumed by the provisioner.
//! Aggregation order: rich rules → services → explicit ports.

pub mod aggregate;
pub mod artifact;
pub mod cidr;
pub mod model;
pub mod rich_rule;

pub use aggregate::{aggregate, service_port, PortSpec, PortSpecError};
pub use artifact::{ExtractionResult, IpPermission, IpRange};
pub use cidr::{normalize_cidr, ANY_IPV4};
pub use model::{IngressRule, Protocol, RuleAction, UnknownProtocol};
pub use rich_rule::{parse_rich_rule, ParsedRichRule};
