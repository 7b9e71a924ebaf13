//! IP intelligence lookup (country, organization, ASN) over HTTP.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use netdiag_core::{Enricher, Enrichment, GeoInfo};
use reqwest::Client;
use serde_json::Value;
use std::net::IpAddr;
use std::time::Duration;
use tracing::debug;
use url::Url;

pub const NOTE_INVALID_RESPONSE: &str = "invalid response";

/// One GET per address against a `{ip}` URL template. No retries.
#[derive(Debug, Clone)]
pub struct HttpEnricher {
    client: Client,
    endpoint: String,
}

impl HttpEnricher {
    pub fn new(endpoint: &str) -> Result<Self> {
        Self::build(endpoint, true)
    }

    /// Ignore `HTTP(S)_PROXY` from the environment and connect directly.
    pub fn without_proxy(endpoint: &str) -> Result<Self> {
        Self::build(endpoint, false)
    }

    fn build(endpoint: &str, system_proxy: bool) -> Result<Self> {
        if !endpoint.contains("{ip}") {
            return Err(anyhow!("endpoint has no {{ip}} placeholder: {}", endpoint));
        }
        Url::parse(&endpoint.replace("{ip}", "192.0.2.1"))
            .map_err(|e| anyhow!("invalid endpoint {}: {}", endpoint, e))?;
        let mut builder = Client::builder()
            .user_agent(format!("netdiag/{}", env!("CARGO_PKG_VERSION")))
            .gzip(true)
            .brotli(true)
            .deflate(true);
        if !system_proxy {
            builder = builder.no_proxy();
        }
        let client = builder.build()?;
        Ok(HttpEnricher { client, endpoint: endpoint.to_string() })
    }

    pub fn url_for(&self, ip: IpAddr) -> String {
        self.endpoint.replace("{ip}", &ip.to_string())
    }
}

#[async_trait]
impl Enricher for HttpEnricher {
    async fn enrich(&self, ip: IpAddr, limit: Duration) -> Enrichment {
        let url = self.url_for(ip);
        let resp = match self.client.get(&url).timeout(limit).send().await {
            Ok(r) => r,
            Err(e) => {
                debug!(%url, error = %e, "lookup request failed");
                return Enrichment::Failed(failure_kind(&e).to_string());
            }
        };
        let status = resp.status();
        if !status.is_success() {
            return Enrichment::Rejected(format!("HTTP {}", status.as_u16()));
        }
        match resp.bytes().await {
            Ok(body) => interpret_body(&body),
            Err(e) => {
                debug!(%url, error = %e, "reading lookup body failed");
                Enrichment::Failed(failure_kind(&e).to_string())
            }
        }
    }
}

fn failure_kind(e: &reqwest::Error) -> &'static str {
    if e.is_timeout() {
        "timeout"
    } else if e.is_connect() {
        "connect"
    } else if e.is_body() || e.is_decode() {
        "body"
    } else if e.is_request() {
        "request"
    } else {
        "transport"
    }
}

/// Read a 2xx body. Absent keys stay empty; anything that is not a JSON object is a
/// rejection. The service also reports refusals in-band as `{"error": true, ...}`.
pub fn interpret_body(body: &[u8]) -> Enrichment {
    let obj = match serde_json::from_slice::<Value>(body) {
        Ok(Value::Object(obj)) => obj,
        _ => return Enrichment::Rejected(NOTE_INVALID_RESPONSE.into()),
    };
    if obj.get("error").and_then(Value::as_bool).unwrap_or(false) {
        let reason = obj
            .get("reason")
            .map(text)
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| "service error".to_string());
        return Enrichment::Rejected(reason);
    }
    let field = |key: &str| obj.get(key).map(text).unwrap_or_default();
    Enrichment::Succeeded(GeoInfo {
        country: field("country_name"),
        organization: field("org"),
        asn: field("asn"),
    })
}

fn text(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => String::new(),
    }
}
