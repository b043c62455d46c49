//! CIDR normalization

use ipnet::{IpNet, Ipv4Net};
use std::net::{IpAddr, Ipv4Addr};
use tracing::warn;

/// Source used when a rule does not restrict the peer address
pub const ANY_IPV4: &str = "0.0.0.0/0";

/// Normalize an address or `address/prefix` to its network form.
///
/// Host bits are cleared (`10.0.0.5/24` becomes `10.0.0.0/24`) and a bare
/// address becomes a host network (`/32` or `/128`). IPv4 netmask and
/// hostmask suffixes (`/255.255.255.0`, `/0.0.0.255`) become prefix lengths.
/// Text that does not parse is returned unchanged; this function never fails.
pub fn normalize_cidr(text: &str) -> String {
    match parse_network(text.trim()) {
        Ok(net) => net.trunc().to_string(),
        Err(e) => {
            warn!("Could not normalize CIDR '{text}': {e}");
            text.to_string()
        }
    }
}

fn parse_network(text: &str) -> Result<IpNet, String> {
    if let Some((addr, mask)) = text.split_once('/') {
        if let Ok(mask) = mask.parse::<Ipv4Addr>() {
            let addr: Ipv4Addr = addr.parse().map_err(|e: std::net::AddrParseError| e.to_string())?;
            let prefix = mask_prefix_len(mask).ok_or_else(|| format!("invalid netmask {mask}"))?;
            return Ipv4Net::new(addr, prefix)
                .map(IpNet::V4)
                .map_err(|e| e.to_string());
        }
        return text.parse::<IpNet>().map_err(|e| e.to_string());
    }

    let addr: IpAddr = text.parse().map_err(|e: std::net::AddrParseError| e.to_string())?;
    let prefix = match addr {
        IpAddr::V4(_) => 32,
        IpAddr::V6(_) => 128,
    };
    IpNet::new(addr, prefix).map_err(|e| e.to_string())
}

// Contiguous netmask, or its inverse as a hostmask
fn mask_prefix_len(mask: Ipv4Addr) -> Option<u8> {
    let contiguous = |bits: u32| {
        let ones = bits.leading_ones();
        (bits.checked_shl(ones).unwrap_or(0) == 0).then_some(ones as u8)
    };
    let bits = u32::from(mask);
    contiguous(bits).or_else(|| contiguous(!bits))
}
