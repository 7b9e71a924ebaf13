//! Result types and the fixed report row.

use std::net::IpAddr;

use crate::classify::TargetClass;
use crate::Target;

/// Outcome of a single probe. `Indeterminate` means the probe itself could not run,
/// which is not the same thing as the target being down.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeResult {
    Reachable,
    Unreachable,
    Indeterminate,
}

impl ProbeResult {
    pub fn ping_label(self) -> &'static str {
        match self {
            ProbeResult::Reachable => "OK",
            ProbeResult::Unreachable => "KO",
            ProbeResult::Indeterminate => "ERROR",
        }
    }

    pub fn tcp_label(self) -> &'static str {
        match self {
            ProbeResult::Reachable => "OPEN",
            ProbeResult::Unreachable => "CLOSED",
            ProbeResult::Indeterminate => "ERROR",
        }
    }
}

/// Attributes from the IP lookup service. Missing keys stay empty.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GeoInfo {
    pub country: String,
    pub organization: String,
    pub asn: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Enrichment {
    Succeeded(GeoInfo),
    /// The service answered, but not with something usable (non-2xx, bad body).
    Rejected(String),
    /// The request never completed (timeout, connect, reset).
    Failed(String),
}

impl Enrichment {
    pub fn status_label(&self) -> &'static str {
        match self {
            Enrichment::Succeeded(_) => "OK",
            Enrichment::Rejected(_) => "KO",
            Enrichment::Failed(_) => "ERROR",
        }
    }

    pub fn note(&self) -> Option<&str> {
        match self {
            Enrichment::Succeeded(_) => None,
            Enrichment::Rejected(n) | Enrichment::Failed(n) => Some(n),
        }
    }

    pub fn geo(&self) -> Option<&GeoInfo> {
        match self {
            Enrichment::Succeeded(g) => Some(g),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiagnosticRecord {
    pub target: Target,
    pub class: TargetClass,
    pub resolved_ip: Option<IpAddr>,
    pub ping: ProbeResult,
    /// One entry per configured port, in configuration order.
    pub tcp: Vec<(u16, ProbeResult)>,
    pub enrichment: Option<Enrichment>,
    pub notes: Vec<String>,
}

impl DiagnosticRecord {
    /// Pessimistic starting point: a row that is valid even if nothing else runs.
    pub fn pending(target: Target, ports: &[u16]) -> Self {
        DiagnosticRecord {
            target,
            class: TargetClass::Dns,
            resolved_ip: None,
            ping: ProbeResult::Indeterminate,
            tcp: ports.iter().map(|&p| (p, ProbeResult::Indeterminate)).collect(),
            enrichment: None,
            notes: Vec::new(),
        }
    }

    pub fn note(&mut self, msg: impl Into<String>) {
        self.notes.push(msg.into());
    }

    pub fn set_tcp(&mut self, port: u16, result: ProbeResult) {
        if let Some(slot) = self.tcp.iter_mut().find(|(p, _)| *p == port) {
            slot.1 = result;
        }
    }

    pub fn notes_text(&self) -> String {
        self.notes.join(" | ")
    }

    pub fn api_status(&self) -> &'static str {
        self.enrichment.as_ref().map(Enrichment::status_label).unwrap_or("ERROR")
    }

    /// Report cells in `columns()` order. Absent values are empty strings.
    pub fn to_row(&self) -> Vec<String> {
        let geo = self.enrichment.as_ref().and_then(Enrichment::geo);
        let mut row = Vec::with_capacity(8 + self.tcp.len());
        row.push(self.target.0.clone());
        row.push(self.class.label().to_string());
        row.push(self.resolved_ip.map(|ip| ip.to_string()).unwrap_or_default());
        row.push(self.ping.ping_label().to_string());
        for (_, r) in &self.tcp {
            row.push(r.tcp_label().to_string());
        }
        row.push(geo.map(|g| g.country.clone()).unwrap_or_default());
        row.push(geo.map(|g| g.organization.clone()).unwrap_or_default());
        row.push(geo.map(|g| g.asn.clone()).unwrap_or_default());
        row.push(self.api_status().to_string());
        row.push(self.notes_text());
        row
    }
}

/// Header of the report for the given port list.
pub fn columns(ports: &[u16]) -> Vec<String> {
    let mut cols: Vec<String> = ["target", "target_type", "dns_resolved_ip", "ping"]
        .iter()
        .map(|s| s.to_string())
        .collect();
    cols.extend(ports.iter().map(|p| format!("tcp_{}", p)));
    cols.extend(
        ["ip_country", "ip_org", "ip_asn", "api_status", "notes"]
            .iter()
            .map(|s| s.to_string()),
    );
    cols
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_follows_port_list() {
        assert_eq!(
            columns(&[22, 443]),
            vec![
                "target", "target_type", "dns_resolved_ip", "ping", "tcp_22", "tcp_443",
                "ip_country", "ip_org", "ip_asn", "api_status", "notes"
            ]
        );
        assert_eq!(columns(&[]).len(), 9);
    }

    #[test]
    fn pending_row_is_pessimistic() {
        let r = DiagnosticRecord::pending("example.com".into(), &[22, 443]);
        assert_eq!(
            r.to_row(),
            vec!["example.com", "DNS", "", "ERROR", "ERROR", "ERROR", "", "", "", "ERROR", ""]
        );
    }

    #[test]
    fn row_carries_enrichment_and_notes() {
        let mut r = DiagnosticRecord::pending("1.1.1.1".into(), &[443]);
        r.class = TargetClass::Ip;
        r.ping = ProbeResult::Reachable;
        r.set_tcp(443, ProbeResult::Unreachable);
        r.set_tcp(8080, ProbeResult::Reachable);
        r.enrichment = Some(Enrichment::Succeeded(GeoInfo {
            country: "Australia".into(),
            organization: "CLOUDFLARENET".into(),
            asn: "AS13335".into(),
        }));
        r.note("first");
        r.note("second");
        assert_eq!(
            r.to_row(),
            vec!["1.1.1.1", "IP", "", "OK", "CLOSED", "Australia", "CLOUDFLARENET", "AS13335", "OK", "first | second"]
        );
    }

    #[test]
    fn rejected_enrichment_keeps_fields_empty() {
        let e = Enrichment::Rejected("HTTP 429".into());
        assert_eq!(e.status_label(), "KO");
        assert_eq!(e.note(), Some("HTTP 429"));
        assert!(e.geo().is_none());
        assert_eq!(Enrichment::Failed("timeout".into()).status_label(), "ERROR");
    }

    #[test]
    fn labels_never_empty() {
        for r in [ProbeResult::Reachable, ProbeResult::Unreachable, ProbeResult::Indeterminate] {
            assert!(["OK", "KO", "ERROR"].contains(&r.ping_label()));
            assert!(["OPEN", "CLOSED", "ERROR"].contains(&r.tcp_label()));
        }
    }
}
