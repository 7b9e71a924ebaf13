//! Target-list input and report output for a diagnostic run.

mod sink;
mod targets;

pub use sink::{ReportFormat, ReportWriter};
pub use targets::{parse_targets, read_targets};
