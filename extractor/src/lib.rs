//! fwmig extractor: host side of the migration
//!
//! Queries firewalld, aggregates its services, ports and rich rules into
//! security group rules, and writes the JSON artifact.

pub mod config;
pub mod export;
pub mod firewalld;
