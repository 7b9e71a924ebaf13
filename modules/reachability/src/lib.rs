//! Reachability probes: one ICMP echo through the platform `ping`, and TCP connect.

use anyhow::{anyhow, Result};

mod icmp;
mod tcp;

pub use icmp::{PingFlavor, PingProbe};
pub use tcp::{classify_connect_error, ConnectProbe};

/// Parse a comma-separated list of ports/ranges (e.g., "22,443", "8000-8002,22").
/// Keeps first-seen order and drops repeats, since each port becomes a report column.
pub fn parse_ports(spec: &str) -> Result<Vec<u16>> {
    let mut ports = Vec::new();
    let mut push = |p: u16| {
        if !ports.contains(&p) {
            ports.push(p);
        }
    };
    for part in spec.split(',').map(|s| s.trim()).filter(|s| !s.is_empty()) {
        if let Some((start, end)) = part.split_once('-') {
            let s: u16 = start.trim().parse()?;
            let e: u16 = end.trim().parse()?;
            if s == 0 || e == 0 || s > e {
                return Err(anyhow!("invalid port range: {}", part));
            }
            (s..=e).for_each(&mut push);
        } else {
            let p: u16 = part.parse()?;
            if p == 0 {
                return Err(anyhow!("invalid port: {}", part));
            }
            push(p);
        }
    }
    if ports.is_empty() {
        return Err(anyhow!("empty port list: {:?}", spec));
    }
    Ok(ports)
}
