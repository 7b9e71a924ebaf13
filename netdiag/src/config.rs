use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Optional settings from `netdiag.yaml`. Every key may be omitted; CLI flags win.
#[derive(Debug, Default, Deserialize, Clone, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub targets: Option<PathBuf>,
    pub out: Option<PathBuf>,
    pub ports: Option<String>,
    pub timeout_ms: Option<u64>,
    pub endpoint: Option<String>,
    pub concurrency: Option<usize>,
    pub deadline_secs: Option<u64>,
    pub format: Option<String>,
    pub no_proxy: Option<bool>,
}

/// Load an explicit config path, or `./netdiag.yaml` if it exists. An explicit path
/// that is missing or malformed is an error; an absent default is not.
pub fn load_config(path: Option<&Path>) -> Result<Option<FileConfig>> {
    let path = match path {
        Some(p) => p.to_path_buf(),
        None => {
            let p = Path::new("netdiag.yaml");
            if p.exists() { p.to_path_buf() } else { return Ok(None); }
        }
    };
    let s = fs::read_to_string(&path).with_context(|| format!("reading config {}", path.display()))?;
    let cfg = parse_config(&s).with_context(|| format!("parsing config {}", path.display()))?;
    Ok(Some(cfg))
}

pub fn parse_config(s: &str) -> Result<FileConfig> {
    if s.trim().is_empty() {
        return Ok(FileConfig::default());
    }
    Ok(serde_yaml::from_str(s)?)
}
