//! Core types, probe seams and the per-target diagnostic pipeline.

pub mod classify;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod probe;
pub mod record;

pub use classify::{classify, TargetClass};
pub use config::{DiagConfig, DEFAULT_ENDPOINT};
pub use error::DiagError;
pub use pipeline::Pipeline;
pub use probe::{Enricher, IcmpProbe, Probes, Resolver, TcpProbe};
pub use record::{columns, DiagnosticRecord, Enrichment, GeoInfo, ProbeResult};

pub const fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

/// One input line of the target list: a hostname or an IP literal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target(pub String);

impl Target {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Target {
    fn from(s: &str) -> Self {
        Target(s.to_string())
    }
}

impl From<String> for Target {
    fn from(s: String) -> Self {
        Target(s)
    }
}

impl std::fmt::Display for Target {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
