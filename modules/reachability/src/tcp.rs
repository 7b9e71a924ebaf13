use async_trait::async_trait;
use netdiag_core::{ProbeResult, TcpProbe};
use std::io::ErrorKind;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::debug;

/// TCP connect probe. The stream is dropped as soon as the handshake completes.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConnectProbe;

#[async_trait]
impl TcpProbe for ConnectProbe {
    async fn probe(&self, host: &str, port: u16, limit: Duration) -> ProbeResult {
        match timeout(limit, TcpStream::connect((host, port))).await {
            Ok(Ok(stream)) => {
                drop(stream);
                ProbeResult::Reachable
            }
            Ok(Err(e)) => {
                let r = classify_connect_error(&e);
                debug!(host, port, error = %e, result = r.tcp_label(), "connect failed");
                r
            }
            Err(_) => ProbeResult::Unreachable,
        }
    }
}

/// Errors caused by our side (privilege, bad arguments, resources) mean the probe
/// could not run; everything else is the network answering "no".
pub fn classify_connect_error(e: &std::io::Error) -> ProbeResult {
    match e.kind() {
        ErrorKind::PermissionDenied
        | ErrorKind::InvalidInput
        | ErrorKind::Unsupported
        | ErrorKind::OutOfMemory => ProbeResult::Indeterminate,
        _ => ProbeResult::Unreachable,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn listening_port_is_open() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let r = ConnectProbe.probe("127.0.0.1", port, Duration::from_secs(2)).await;
        assert_eq!(r, ProbeResult::Reachable);
    }

    #[tokio::test]
    async fn expired_bound_is_closed() {
        let limit = Duration::from_millis(1);
        let started = std::time::Instant::now();
        let r = ConnectProbe.probe("192.0.2.1", 443, limit).await;
        assert_eq!(r, ProbeResult::Unreachable);
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test]
    async fn released_port_is_closed() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);
        let r = ConnectProbe.probe("127.0.0.1", port, Duration::from_secs(2)).await;
        assert_eq!(r, ProbeResult::Unreachable);
    }

    #[tokio::test]
    async fn unresolvable_name_is_closed() {
        let r = ConnectProbe.probe("nonexistent.invalid", 443, Duration::from_secs(2)).await;
        assert_eq!(r, ProbeResult::Unreachable);
    }

    #[test]
    fn local_faults_are_indeterminate() {
        let denied = io::Error::new(ErrorKind::PermissionDenied, "denied");
        assert_eq!(classify_connect_error(&denied), ProbeResult::Indeterminate);
        let refused = io::Error::new(ErrorKind::ConnectionRefused, "refused");
        assert_eq!(classify_connect_error(&refused), ProbeResult::Unreachable);
        let reset = io::Error::new(ErrorKind::ConnectionReset, "reset");
        assert_eq!(classify_connect_error(&reset), ProbeResult::Unreachable);
    }
}
