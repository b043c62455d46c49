//! firewalld rich-rule field extraction
//!
//! Each field is searched for independently with its own fixed pattern
//! instead of a full rich-rule grammar. A line missing a clause simply leaves
//! that field unset, so partial or unusual rules still yield what they carry.

use regex::Regex;
use std::sync::LazyLock;
use tracing::warn;

use crate::cidr::{normalize_cidr, ANY_IPV4};
use crate::model::{Protocol, RuleAction};

static SOURCE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"source address="([^"]+)""#).expect("valid source pattern"));
static PORT_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"port port="(\d+)""#).expect("valid port pattern"));
static PROTOCOL_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"protocol="([^"]+)""#).expect("valid protocol pattern"));

/// Fields recovered from one rich rule
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedRichRule {
    pub port: Option<u16>,
    pub protocol: Option<Protocol>,
    /// Normalized source, `0.0.0.0/0` when the rule has no source clause
    pub source: String,
    /// Raw source text, kept only when normalization rewrote it
    pub original_source: Option<String>,
    pub action: RuleAction,
}

impl ParsedRichRule {
    /// `(port, protocol)` when this rule should become an ingress rule:
    /// it accepts traffic and names both a port and a protocol.
    pub fn accepted_port(&self) -> Option<(u16, Protocol)> {
        match (self.action, self.port, self.protocol) {
            (RuleAction::Accept, Some(port), Some(protocol)) => Some((port, protocol)),
            _ => None,
        }
    }
}

/// Extract port, protocol, source and action from one rich rule line.
pub fn parse_rich_rule(line: &str) -> ParsedRichRule {
    let (source, original_source) = match capture(&SOURCE_PATTERN, line) {
        Some(raw) => {
            let normalized = normalize_cidr(raw);
            let original = (normalized != raw).then(|| raw.to_string());
            (normalized, original)
        }
        None => (ANY_IPV4.to_string(), None),
    };

    let port = capture(&PORT_PATTERN, line).and_then(|raw| match raw.parse::<u16>() {
        Ok(0) | Err(_) => {
            warn!("Ignoring out-of-range port '{raw}' in rich rule: {line}");
            None
        }
        Ok(port) => Some(port),
    });

    let protocol = capture(&PROTOCOL_PATTERN, line).and_then(|raw| match raw.parse::<Protocol>() {
        Ok(protocol) => Some(protocol),
        Err(e) => {
            warn!("Ignoring {e} in rich rule: {line}");
            None
        }
    });

    ParsedRichRule {
        port,
        protocol,
        source,
        original_source,
        action: parse_action(line),
    }
}

fn capture<'a>(pattern: &Regex, line: &'a str) -> Option<&'a str> {
    pattern
        .captures(line)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

// reject wins over drop; anything else accepts
fn parse_action(line: &str) -> RuleAction {
    let has_keyword = |keyword: &str| line.split_whitespace().any(|word| word == keyword);

    if has_keyword("reject") {
        RuleAction::Reject
    } else if has_keyword("drop") {
        RuleAction::Drop
    } else {
        RuleAction::Accept
    }
}
