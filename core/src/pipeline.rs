//! Per-target orchestration: classify, resolve, probe, enrich, emit.
//!
//! Every target yields exactly one [`DiagnosticRecord`], in input order. Probe
//! outcomes are field values; anything that escapes a probe as a panic is caught at
//! the per-target boundary and turned into a note, and the row is still emitted.

use futures::stream::{self, StreamExt};
use futures::FutureExt;
use std::any::Any;
use std::convert::Infallible;
use std::future::Future;
use std::net::IpAddr;
use std::panic::AssertUnwindSafe;
use std::pin::pin;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, instrument, warn};

use crate::classify::{classify, TargetClass};
use crate::config::DiagConfig;
use crate::error::DiagError;
use crate::probe::Probes;
use crate::record::DiagnosticRecord;
use crate::Target;

pub const NOTE_DNS_FAILED: &str = "DNS failed";
pub const NOTE_NO_IP: &str = "No IP for API";
pub const NOTE_CANCELLED: &str = "cancelled";

pub struct Pipeline {
    config: DiagConfig,
    probes: Probes,
    cancel: CancellationToken,
}

impl Pipeline {
    pub fn new(config: DiagConfig, probes: Probes) -> Result<Self, DiagError> {
        config.validate()?;
        Ok(Pipeline { config, probes, cancel: CancellationToken::new() })
    }

    /// Use an externally owned token, e.g. one tied to Ctrl-C or a deadline.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn config(&self) -> &DiagConfig {
        &self.config
    }

    /// Diagnose all targets and collect the records in input order.
    pub async fn run<I>(&self, targets: I) -> Vec<DiagnosticRecord>
    where
        I: IntoIterator<Item = Target>,
    {
        let mut out = Vec::new();
        let res = self
            .run_with(targets, |r| {
                out.push(r);
                Ok::<(), Infallible>(())
            })
            .await;
        match res {
            Ok(_) => out,
            Err(never) => match never {},
        }
    }

    /// Diagnose targets, up to `concurrency` at a time, handing each record to `sink`
    /// in input order. Returns how many records were emitted. Only a sink error
    /// stops the run early.
    pub async fn run_with<I, F, E>(&self, targets: I, mut sink: F) -> Result<usize, E>
    where
        I: IntoIterator<Item = Target>,
        F: FnMut(DiagnosticRecord) -> Result<(), E>,
    {
        let mut records = pin!(stream::iter(targets)
            .map(|t| self.diagnose(t))
            .buffered(self.config.concurrency.max(1)));
        let mut emitted = 0;
        while let Some(record) = records.next().await {
            sink(record)?;
            emitted += 1;
        }
        Ok(emitted)
    }

    /// Diagnose one target. Never fails and never panics outward.
    #[instrument(level = "debug", skip_all, fields(input = %target))]
    pub async fn diagnose(&self, target: Target) -> DiagnosticRecord {
        let mut record = DiagnosticRecord::pending(target.clone(), &self.config.ports);
        let outcome = AssertUnwindSafe(self.fill(&target, &mut record))
            .catch_unwind()
            .await;
        if let Err(payload) = outcome {
            let kind = panic_kind(payload.as_ref());
            error!(input = %target, %kind, "unhandled error while diagnosing target");
            record.notes = vec![format!("unhandled error: {}", kind)];
        }
        record
    }

    async fn fill(&self, target: &Target, record: &mut DiagnosticRecord) {
        let timeout = self.config.timeout;
        let class = classify(target.as_str());
        record.class = class;

        let (probe_host, api_ip): (String, Option<IpAddr>) = match class {
            TargetClass::Ip => (target.0.clone(), target.as_str().parse().ok()),
            TargetClass::Dns => {
                let Some(resolved) = self
                    .guard(self.probes.resolver.resolve(target.as_str(), timeout))
                    .await
                else {
                    record.note(NOTE_CANCELLED);
                    return;
                };
                record.resolved_ip = resolved;
                match resolved {
                    Some(ip) => {
                        debug!(%ip, "resolved");
                        (ip.to_string(), Some(ip))
                    }
                    None => {
                        warn!(input = %target, "DNS resolution failed, probing by name");
                        record.note(NOTE_DNS_FAILED);
                        (target.0.clone(), None)
                    }
                }
            }
        };

        let Some(ping) = self.guard(self.probes.icmp.probe(&probe_host, timeout)).await else {
            record.note(NOTE_CANCELLED);
            return;
        };
        record.ping = ping;
        debug!(host = %probe_host, ping = ping.ping_label(), "icmp probe done");

        for &port in &self.config.ports {
            let Some(r) = self
                .guard(self.probes.tcp.probe(&probe_host, port, timeout))
                .await
            else {
                record.note(NOTE_CANCELLED);
                return;
            };
            record.set_tcp(port, r);
            debug!(host = %probe_host, port, tcp = r.tcp_label(), "tcp probe done");
        }

        match api_ip {
            Some(ip) => {
                let Some(enrichment) = self.guard(self.probes.enricher.enrich(ip, timeout)).await
                else {
                    record.note(NOTE_CANCELLED);
                    return;
                };
                if let Some(n) = enrichment.note() {
                    debug!(%ip, status = enrichment.status_label(), note = n, "enrichment not usable");
                    record.note(n);
                }
                record.enrichment = Some(enrichment);
            }
            None => record.note(NOTE_NO_IP),
        }
    }

    /// Race a probe against cancellation. `None` once the run is cancelled.
    async fn guard<T>(&self, fut: impl Future<Output = T>) -> Option<T> {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => None,
            r = fut => Some(r),
        }
    }
}

fn panic_kind(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        format!("panic ({})", s)
    } else if let Some(s) = payload.downcast_ref::<String>() {
        format!("panic ({})", s)
    } else {
        "panic".to_string()
    }
}
