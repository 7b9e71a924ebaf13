//! Hostname resolution through the system resolver, bounded by a timeout.

use async_trait::async_trait;
use netdiag_core::Resolver;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;
use tokio::time::timeout;
use tracing::debug;

/// Resolver backed by the OS (`getaddrinfo`), so hosts files and mDNS apply.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemResolver;

#[async_trait]
impl Resolver for SystemResolver {
    async fn resolve(&self, name: &str, limit: Duration) -> Option<IpAddr> {
        match timeout(limit, tokio::net::lookup_host((name, 0u16))).await {
            Ok(Ok(addrs)) => {
                let ip = pick_address(addrs);
                if ip.is_none() {
                    debug!(name, "resolver returned no addresses");
                }
                ip
            }
            Ok(Err(e)) => {
                debug!(name, error = %e, "resolution failed");
                None
            }
            Err(_) => {
                debug!(name, timeout_ms = limit.as_millis() as u64, "resolution timed out");
                None
            }
        }
    }
}

/// First IPv4 answer if there is one, else the first answer.
pub fn pick_address<I>(addrs: I) -> Option<IpAddr>
where
    I: IntoIterator<Item = SocketAddr>,
{
    let mut first = None;
    for sa in addrs {
        let ip = sa.ip();
        if ip.is_ipv4() {
            return Some(ip);
        }
        first.get_or_insert(ip);
    }
    first
}
