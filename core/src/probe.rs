//! Seams between the pipeline and the network. Implementations live in the
//! `resolution`, `reachability` and `enrichment` crates; tests supply their own.

use async_trait::async_trait;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

use crate::record::{Enrichment, ProbeResult};

#[async_trait]
pub trait Resolver: Send + Sync {
    /// A single address for `name`, or `None` on any resolution failure.
    async fn resolve(&self, name: &str, timeout: Duration) -> Option<IpAddr>;
}

#[async_trait]
pub trait IcmpProbe: Send + Sync {
    /// Exactly one echo request, no retries.
    async fn probe(&self, host: &str, timeout: Duration) -> ProbeResult;
}

#[async_trait]
pub trait TcpProbe: Send + Sync {
    async fn probe(&self, host: &str, port: u16, timeout: Duration) -> ProbeResult;
}

#[async_trait]
pub trait Enricher: Send + Sync {
    /// One lookup for `ip`. Only ever called with an address, never a name.
    async fn enrich(&self, ip: IpAddr, timeout: Duration) -> Enrichment;
}

/// The set of probe implementations a pipeline drives.
#[derive(Clone)]
pub struct Probes {
    pub resolver: Arc<dyn Resolver>,
    pub icmp: Arc<dyn IcmpProbe>,
    pub tcp: Arc<dyn TcpProbe>,
    pub enricher: Arc<dyn Enricher>,
}
