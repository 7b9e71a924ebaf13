use async_trait::async_trait;
use netdiag_core::{IcmpProbe, ProbeResult};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::{debug, warn};

/// Argument dialect of the system `ping`. Chosen once at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PingFlavor {
    /// `-n` count, `-w` timeout in milliseconds.
    Windows,
    /// iputils: `-c` count, `-W` timeout in seconds.
    Linux,
    /// macOS, FreeBSD and DragonFly: `-c` count, `-t` timeout in seconds.
    Bsd,
    /// OpenBSD and NetBSD, where `-t` is TTL/TOS: `-c` count, `-w` wait in seconds.
    OpenNetBsd,
}

impl PingFlavor {
    pub fn host() -> Self {
        if cfg!(windows) {
            PingFlavor::Windows
        } else if cfg!(any(
            target_os = "macos",
            target_os = "ios",
            target_os = "freebsd",
            target_os = "dragonfly"
        )) {
            PingFlavor::Bsd
        } else if cfg!(any(target_os = "openbsd", target_os = "netbsd")) {
            PingFlavor::OpenNetBsd
        } else {
            PingFlavor::Linux
        }
    }

    /// Arguments for exactly one echo request to `host`.
    pub fn args(self, host: &str, limit: Duration) -> Vec<String> {
        let secs = limit.as_secs_f64().ceil().max(1.0) as u64;
        match self {
            PingFlavor::Windows => vec![
                "-n".into(),
                "1".into(),
                "-w".into(),
                limit.as_millis().max(1).to_string(),
                host.into(),
            ],
            PingFlavor::Linux => vec!["-c".into(), "1".into(), "-W".into(), secs.to_string(), host.into()],
            PingFlavor::Bsd => vec!["-c".into(), "1".into(), "-t".into(), secs.to_string(), host.into()],
            PingFlavor::OpenNetBsd => vec!["-c".into(), "1".into(), "-w".into(), secs.to_string(), host.into()],
        }
    }
}

/// ICMP reachability through the external `ping` executable; only the exit status
/// is read.
#[derive(Debug, Clone)]
pub struct PingProbe {
    flavor: PingFlavor,
    program: String,
}

impl PingProbe {
    pub fn new(flavor: PingFlavor) -> Self {
        PingProbe { flavor, program: "ping".into() }
    }

    pub fn for_host() -> Self {
        Self::new(PingFlavor::host())
    }

    /// Run a different executable with the same arguments.
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    pub fn flavor(&self) -> PingFlavor {
        self.flavor
    }
}

#[async_trait]
impl IcmpProbe for PingProbe {
    async fn probe(&self, host: &str, limit: Duration) -> ProbeResult {
        if host.is_empty() || host.starts_with('-') {
            warn!(host, "refusing to pass host as a ping option");
            return ProbeResult::Indeterminate;
        }
        let mut cmd = Command::new(&self.program);
        cmd.args(self.flavor.args(host, limit))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true);

        let mut child = match cmd.spawn() {
            Ok(c) => c,
            Err(e) => {
                warn!(program = %self.program, error = %e, "failed to launch ping");
                return ProbeResult::Indeterminate;
            }
        };
        // The process gets one extra second past its own timeout before it is killed.
        match timeout(limit + Duration::from_secs(1), child.wait()).await {
            Ok(Ok(status)) if status.success() => ProbeResult::Reachable,
            Ok(Ok(status)) => {
                debug!(host, code = ?status.code(), "ping reported no reply");
                ProbeResult::Unreachable
            }
            Ok(Err(e)) => {
                warn!(host, error = %e, "waiting on ping failed");
                ProbeResult::Indeterminate
            }
            Err(_) => {
                debug!(host, "ping outlived its bound, killing it");
                let _ = child.kill().await;
                ProbeResult::Unreachable
            }
        }
    }
}
