//! Extraction from a canned firewall through to the saved artifact

use fwmig_extractor::export::{export, Owner};
use fwmig_extractor::firewalld::{collect, split_lines, split_words, FirewallSource, QueryError};
use fwmig_rules::ExtractionResult;

struct CannedFirewall;

impl FirewallSource for CannedFirewall {
    fn active_zones(&self) -> Result<String, QueryError> {
        Ok("public\n  interfaces: ens3\n".to_string())
    }

    fn services(&self) -> Result<Vec<String>, QueryError> {
        Ok(split_words("cockpit dhcpv6-client http https ssh\n"))
    }

    fn ports(&self) -> Result<Vec<String>, QueryError> {
        Ok(split_words("8080/tcp 9999/udp 60000-61000/udp\n"))
    }

    fn rich_rules(&self) -> Result<Vec<String>, QueryError> {
        Ok(split_lines(concat!(
            "rule family=\"ipv4\" source address=\"10.20.30.40/16\" port port=\"22\" protocol=\"tcp\" accept\n",
            "rule family=\"ipv4\" source address=\"192.0.2.0/24\" port port=\"8080\" protocol=\"tcp\" accept\n",
            "rule family=\"ipv4\" source address=\"198.51.100.7\" port port=\"443\" protocol=\"tcp\" drop\n",
            "rule family=\"ipv4\" source address=\"10.0.0.0/8\" service name=\"ftp\" accept\n",
        )))
    }
}

#[test]
fn test_collect_and_export() {
    let result = collect(&CannedFirewall).unwrap();

    let summary: Vec<(i32, &str, &str)> = result
        .security_group_rules()
        .iter()
        .map(|r| (r.from_port, r.ip_protocol.as_str(), r.ip_ranges[0].cidr_ip.as_str()))
        .collect();
    assert_eq!(
        summary,
        vec![
            (22, "tcp", "10.20.0.0/16"),
            (8080, "tcp", "192.0.2.0/24"),
            (80, "tcp", "0.0.0.0/0"),
            (443, "tcp", "0.0.0.0/0"),
            (9999, "udp", "0.0.0.0/0"),
            (60000, "udp", "0.0.0.0/0"),
        ]
    );
    assert_eq!(result.security_group_rules()[5].to_port, 61000);

    let dir = tempfile::tempdir().unwrap();
    let path = export(&result, dir.path(), "firewall_rules.json", &Owner::current()).unwrap();
    let saved: ExtractionResult =
        serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap();
    assert_eq!(saved, result);
    assert_eq!(saved.services().len(), 5);
    assert_eq!(saved.rich_rules().len(), 4);
}
