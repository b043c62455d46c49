//! Rule aggregation
//!
//! Merges the three firewalld rule sources into one ordered list of ingress
//! rules. Rich rules go first and claim their `(port, protocol)` pairs;
//! services and explicit ports that hit a claimed pair are suppressed.
//! Services and explicit ports never suppress each other.

use std::collections::HashSet;
use std::str::FromStr;
use thiserror::Error;
use tracing::{debug, info};

use crate::cidr::ANY_IPV4;
use crate::model::{IngressRule, Protocol};
use crate::rich_rule::parse_rich_rule;

/// A `--list-ports` entry that cannot be turned into a rule
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PortSpecError {
    #[error("port '{token}' has no protocol, expected <port>/<protocol>")]
    MissingProtocol { token: String },

    #[error("port '{token}' has an invalid port number")]
    InvalidPort { token: String },

    #[error("port '{token}' has a range whose start is above its end")]
    InvertedRange { token: String },

    #[error("port '{token}' uses unknown protocol '{protocol}'")]
    UnknownProtocol { token: String, protocol: String },
}

/// Well-known port of the firewalld services that migrate.
///
/// Other service names have no mapping and are skipped by the aggregator.
pub fn service_port(name: &str) -> Option<(u16, Protocol)> {
    match name {
        "http" => Some((80, Protocol::Tcp)),
        "https" => Some((443, Protocol::Tcp)),
        "ssh" => Some((22, Protocol::Tcp)),
        _ => None,
    }
}

/// An explicit port entry: `8080/tcp` or a range like `6000-6010/udp`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PortSpec {
    pub from_port: u16,
    pub to_port: u16,
    pub protocol: Protocol,
}

impl PortSpec {
    pub fn is_single_port(&self) -> bool {
        self.from_port == self.to_port
    }
}

impl FromStr for PortSpec {
    type Err = PortSpecError;

    fn from_str(token: &str) -> Result<Self, Self::Err> {
        let (ports, protocol) = token
            .split_once('/')
            .ok_or_else(|| PortSpecError::MissingProtocol {
                token: token.to_string(),
            })?;

        let protocol = protocol
            .parse::<Protocol>()
            .map_err(|_| PortSpecError::UnknownProtocol {
                token: token.to_string(),
                protocol: protocol.to_string(),
            })?;

        let parse_port = |s: &str| {
            s.parse::<u16>().map_err(|_| PortSpecError::InvalidPort {
                token: token.to_string(),
            })
        };

        let (from_port, to_port) = match ports.split_once('-') {
            Some((lo, hi)) => (parse_port(lo)?, parse_port(hi)?),
            None => {
                let port = parse_port(ports)?;
                (port, port)
            }
        };

        if from_port > to_port {
            return Err(PortSpecError::InvertedRange {
                token: token.to_string(),
            });
        }

        Ok(Self {
            from_port,
            to_port,
            protocol,
        })
    }
}

/// Working state of one aggregation run
#[derive(Default)]
struct Aggregator {
    rules: Vec<IngressRule>,
    covered: HashSet<(u16, Protocol)>,
}

impl Aggregator {
    fn add_rich_rule(&mut self, line: &str) {
        let parsed = parse_rich_rule(line);
        let Some((port, protocol)) = parsed.accepted_port() else {
            debug!("Rich rule contributes no ingress rule ({}): {line}", parsed.action);
            return;
        };

        let mut description = format!("Rich rule: {protocol}/{port} from {}", parsed.source);
        if let Some(original) = &parsed.original_source {
            info!("Normalized {original} → {}", parsed.source);
            description.push_str(&format!(" (normalized from {original})"));
        }

        self.covered.insert((port, protocol));
        self.rules
            .push(IngressRule::allow_port(protocol, port, parsed.source, description));
    }

    fn add_service(&mut self, name: &str) {
        let Some((port, protocol)) = service_port(name) else {
            debug!("No port mapping for service '{name}', skipping");
            return;
        };

        if self.covered.contains(&(port, protocol)) {
            info!("Skipping service '{name}' - covered by rich rule");
            return;
        }

        self.rules.push(IngressRule::allow_port(
            protocol,
            port,
            ANY_IPV4,
            format!("Service rule for {name}"),
        ));
    }

    fn add_port(&mut self, token: &str) -> Result<(), PortSpecError> {
        let spec: PortSpec = token.parse()?;

        if spec.is_single_port() && self.covered.contains(&(spec.from_port, spec.protocol)) {
            info!("Skipping port '{token}' - covered by rich rule");
            return Ok(());
        }

        self.rules.push(IngressRule::allow_range(
            spec.protocol,
            spec.from_port,
            spec.to_port,
            ANY_IPV4,
            format!("Custom port {token}"),
        ));
        Ok(())
    }
}

/// Build the ingress rule list: rich rules first, then services, then
/// explicit ports, each in input order.
///
/// A malformed port token fails the whole run.
pub fn aggregate(
    services: &[String],
    ports: &[String],
    rich_rules: &[String],
) -> Result<Vec<IngressRule>, PortSpecError> {
    let mut agg = Aggregator::default();

    for line in rich_rules {
        agg.add_rich_rule(line);
    }
    for name in services {
        agg.add_service(name);
    }
    for token in ports {
        agg.add_port(token)?;
    }

    debug!(
        "Aggregated {} rules ({} ports claimed by rich rules)",
        agg.rules.len(),
        agg.covered.len()
    );
    Ok(agg.rules)
}
