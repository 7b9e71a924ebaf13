use std::path::PathBuf;
use thiserror::Error;

/// Run-level failures. Per-target problems never surface here; they become field values.
#[derive(Error, Debug)]
pub enum DiagError {
    /// The target list does not exist. Fatal for the whole run.
    #[error("targets file not found: {}", .0.display())]
    InputMissing(PathBuf),
    #[error("invalid configuration: {0}")]
    Config(String),
    #[error("report: {0}")]
    Report(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
