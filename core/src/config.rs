use std::time::Duration;

use crate::error::DiagError;

pub const DEFAULT_ENDPOINT: &str = "https://ipapi.co/{ip}/json/";
pub const DEFAULT_PORTS: &[u16] = &[22, 443];
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(2);

/// Settings for one pipeline run, handed to `Pipeline::new`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiagConfig {
    /// Bound for each probe, DNS lookup and enrichment request.
    pub timeout: Duration,
    /// TCP ports probed per target, one report column each, in this order.
    pub ports: Vec<u16>,
    /// Lookup URL with an `{ip}` placeholder.
    pub endpoint: String,
    /// Targets diagnosed at once. Output order is input order regardless.
    pub concurrency: usize,
}

impl Default for DiagConfig {
    fn default() -> Self {
        DiagConfig {
            timeout: DEFAULT_TIMEOUT,
            ports: DEFAULT_PORTS.to_vec(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            concurrency: 1,
        }
    }
}

impl DiagConfig {
    pub fn validate(&self) -> Result<(), DiagError> {
        if self.timeout.is_zero() {
            return Err(DiagError::Config("timeout must be > 0".into()));
        }
        if self.concurrency == 0 {
            return Err(DiagError::Config("concurrency must be > 0".into()));
        }
        if self.ports.contains(&0) {
            return Err(DiagError::Config("port 0 is not probeable".into()));
        }
        let mut seen = self.ports.clone();
        seen.sort_unstable();
        seen.dedup();
        if seen.len() != self.ports.len() {
            return Err(DiagError::Config("duplicate port in port list".into()));
        }
        if !self.endpoint.contains("{ip}") {
            return Err(DiagError::Config(format!(
                "endpoint has no {{ip}} placeholder: {}",
                self.endpoint
            )));
        }
        Ok(())
    }
}
