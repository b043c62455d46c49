//! Canonical ingress rule model

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Transport protocol accepted in firewalld port specifications
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    Tcp,
    Udp,
    Sctp,
    Dccp,
}

impl Protocol {
    pub fn as_str(&self) -> &'static str {
        match self {
            Protocol::Tcp => "tcp",
            Protocol::Udp => "udp",
            Protocol::Sctp => "sctp",
            Protocol::Dccp => "dccp",
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown protocol '{0}'")]
pub struct UnknownProtocol(pub String);

impl FromStr for Protocol {
    type Err = UnknownProtocol;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "tcp" => Ok(Protocol::Tcp),
            "udp" => Ok(Protocol::Udp),
            "sctp" => Ok(Protocol::Sctp),
            "dccp" => Ok(Protocol::Dccp),
            _ => Err(UnknownProtocol(s.to_string())),
        }
    }
}

/// Firewall action of a rich rule
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleAction {
    #[default]
    Accept,
    Reject,
    Drop,
}

impl fmt::Display for RuleAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RuleAction::Accept => "accept",
            RuleAction::Reject => "reject",
            RuleAction::Drop => "drop",
        })
    }
}

/// A provider-agnostic ingress rule
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngressRule {
    pub protocol: Protocol,
    pub from_port: u16,
    pub to_port: u16,
    /// Normalized `address/prefix`
    pub source_cidr: String,
    /// Where the rule came from, e.g. `Service rule for ssh`
    pub description: String,
    pub action: RuleAction,
}

impl IngressRule {
    /// An accept rule for a single port
    pub fn allow_port(
        protocol: Protocol,
        port: u16,
        source_cidr: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self::allow_range(protocol, port, port, source_cidr, description)
    }

    /// An accept rule for an inclusive port range
    pub fn allow_range(
        protocol: Protocol,
        from_port: u16,
        to_port: u16,
        source_cidr: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            protocol,
            from_port,
            to_port,
            source_cidr: source_cidr.into(),
            description: description.into(),
            action: RuleAction::Accept,
        }
    }

    pub fn is_single_port(&self) -> bool {
        self.from_port == self.to_port
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_protocol_parse_case_insensitive() {
        assert_eq!("tcp".parse::<Protocol>().unwrap(), Protocol::Tcp);
        assert_eq!("UDP".parse::<Protocol>().unwrap(), Protocol::Udp);
        assert_eq!(" sctp ".parse::<Protocol>().unwrap(), Protocol::Sctp);
    }

    #[test]
    fn test_protocol_parse_unknown() {
        let err = "icmp".parse::<Protocol>().unwrap_err();
        assert_eq!(err, UnknownProtocol("icmp".to_string()));
    }

    #[test]
    fn test_protocol_serializes_lowercase() {
        let json = serde_json::to_string(&Protocol::Dccp).unwrap();
        assert_eq!(json, "\"dccp\"");
        assert_eq!(Protocol::Tcp.to_string(), "tcp");
    }

    #[test]
    fn test_default_action_is_accept() {
        assert_eq!(RuleAction::default(), RuleAction::Accept);
    }

    #[test]
    fn test_allow_port_is_single_port() {
        let rule = IngressRule::allow_port(Protocol::Tcp, 22, "0.0.0.0/0", "ssh");
        assert!(rule.is_single_port());
        assert_eq!(rule.from_port, 22);
        assert_eq!(rule.to_port, 22);
        assert_eq!(rule.action, RuleAction::Accept);

        let range = IngressRule::allow_range(Protocol::Udp, 6000, 6010, "0.0.0.0/0", "x11");
        assert!(!range.is_single_port());
    }
}
