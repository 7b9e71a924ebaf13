use netdiag_core::{DiagError, Target};
use std::path::Path;
use tracing::debug;

/// Read a newline-delimited target list. A missing file is `DiagError::InputMissing`.
pub fn read_targets(path: impl AsRef<Path>) -> Result<Vec<Target>, DiagError> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(DiagError::InputMissing(path.to_path_buf()));
    }
    let s = std::fs::read_to_string(path)?;
    let targets = parse_targets(&s);
    debug!(path = %path.display(), count = targets.len(), "loaded targets");
    Ok(targets)
}

/// One target per non-blank line, surrounding whitespace trimmed, order kept.
pub fn parse_targets(s: &str) -> Vec<Target> {
    s.strip_prefix('\u{feff}')
        .unwrap_or(s)
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(Target::from)
        .collect()
}
