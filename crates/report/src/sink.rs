use netdiag_core::{columns, DiagError, DiagnosticRecord};
use serde_json::{Map, Value};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportFormat {
    /// Header row plus one row per target. The compatibility format.
    Csv,
    /// One JSON object per target, keyed by the CSV column names.
    Jsonl,
}

enum Inner<W: Write> {
    Csv(csv::Writer<W>),
    Jsonl(BufWriter<W>),
}

/// Single writer for a run's records.
pub struct ReportWriter<W: Write> {
    inner: Inner<W>,
    columns: Vec<String>,
    written: usize,
}

impl ReportWriter<File> {
    /// Create (or truncate) `path` and write the header when the format has one.
    pub fn create(path: impl AsRef<Path>, format: ReportFormat, ports: &[u16]) -> Result<Self, DiagError> {
        let file = File::create(path)?;
        ReportWriter::new(file, format, ports)
    }
}

impl<W: Write> ReportWriter<W> {
    pub fn new(w: W, format: ReportFormat, ports: &[u16]) -> Result<Self, DiagError> {
        let columns = columns(ports);
        let inner = match format {
            ReportFormat::Csv => {
                let mut wtr = csv::Writer::from_writer(w);
                wtr.write_record(&columns).map_err(report_err)?;
                Inner::Csv(wtr)
            }
            ReportFormat::Jsonl => Inner::Jsonl(BufWriter::new(w)),
        };
        Ok(ReportWriter { inner, columns, written: 0 })
    }

    pub fn write(&mut self, record: &DiagnosticRecord) -> Result<(), DiagError> {
        let row = record.to_row();
        if row.len() != self.columns.len() {
            return Err(DiagError::Report(format!(
                "row for {} has {} cells, header has {}",
                record.target,
                row.len(),
                self.columns.len()
            )));
        }
        match &mut self.inner {
            Inner::Csv(wtr) => wtr.write_record(&row).map_err(report_err)?,
            Inner::Jsonl(w) => {
                let obj: Map<String, Value> = self
                    .columns
                    .iter()
                    .cloned()
                    .zip(row.into_iter().map(Value::String))
                    .collect();
                serde_json::to_writer(&mut *w, &obj).map_err(|e| DiagError::Report(e.to_string()))?;
                w.write_all(b"\n")?;
            }
        }
        self.written += 1;
        Ok(())
    }

    pub fn written(&self) -> usize {
        self.written
    }

    /// Flush and hand back the underlying writer.
    pub fn finish(self) -> Result<W, DiagError> {
        match self.inner {
            Inner::Csv(wtr) => wtr.into_inner().map_err(|e| DiagError::Report(e.to_string())),
            Inner::Jsonl(w) => w.into_inner().map_err(|e| DiagError::Io(e.into_error())),
        }
    }
}

fn report_err(e: csv::Error) -> DiagError {
    DiagError::Report(e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use netdiag_core::{Enrichment, GeoInfo, ProbeResult, TargetClass};

    fn sample() -> Vec<DiagnosticRecord> {
        let mut ok = DiagnosticRecord::pending("8.8.8.8".into(), &[22, 443]);
        ok.class = TargetClass::Ip;
        ok.ping = ProbeResult::Reachable;
        ok.set_tcp(22, ProbeResult::Unreachable);
        ok.set_tcp(443, ProbeResult::Reachable);
        ok.enrichment = Some(Enrichment::Succeeded(GeoInfo {
            country: "United States".into(),
            organization: "Google, LLC".into(),
            asn: "AS15169".into(),
        }));

        let mut failed = DiagnosticRecord::pending("nonexistent.invalid".into(), &[22, 443]);
        failed.ping = ProbeResult::Unreachable;
        failed.set_tcp(22, ProbeResult::Unreachable);
        failed.set_tcp(443, ProbeResult::Unreachable);
        failed.note("DNS failed");
        failed.note("No IP for API");
        vec![ok, failed]
    }

    #[test]
    fn csv_has_header_and_quoted_rows() {
        let mut w = ReportWriter::new(Vec::new(), ReportFormat::Csv, &[22, 443]).unwrap();
        for r in sample() {
            w.write(&r).unwrap();
        }
        assert_eq!(w.written(), 2);
        let out = String::from_utf8(w.finish().unwrap()).unwrap();
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(
            lines,
            vec![
                "target,target_type,dns_resolved_ip,ping,tcp_22,tcp_443,ip_country,ip_org,ip_asn,api_status,notes",
                "8.8.8.8,IP,,OK,CLOSED,OPEN,United States,\"Google, LLC\",AS15169,OK,",
                "nonexistent.invalid,DNS,,KO,CLOSED,CLOSED,,,,ERROR,DNS failed | No IP for API",
            ]
        );
    }

    #[test]
    fn empty_run_still_has_header() {
        let w = ReportWriter::new(Vec::new(), ReportFormat::Csv, &[22]).unwrap();
        let out = String::from_utf8(w.finish().unwrap()).unwrap();
        assert_eq!(out, "target,target_type,dns_resolved_ip,ping,tcp_22,ip_country,ip_org,ip_asn,api_status,notes\n");
    }

    #[test]
    fn jsonl_uses_column_names() {
        let mut w = ReportWriter::new(Vec::new(), ReportFormat::Jsonl, &[22, 443]).unwrap();
        for r in sample() {
            w.write(&r).unwrap();
        }
        let out = String::from_utf8(w.finish().unwrap()).unwrap();
        let rows: Vec<Value> = out.lines().map(|l| serde_json::from_str(l).unwrap()).collect();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["tcp_443"], "OPEN");
        assert_eq!(rows[0]["ip_org"], "Google, LLC");
        assert_eq!(rows[1]["dns_resolved_ip"], "");
        assert_eq!(rows[1]["api_status"], "ERROR");
    }

    #[test]
    fn jsonl_keys_follow_column_order() {
        let mut w = ReportWriter::new(Vec::new(), ReportFormat::Jsonl, &[22, 443]).unwrap();
        w.write(&sample()[1]).unwrap();
        let out = String::from_utf8(w.finish().unwrap()).unwrap();
        let row: Map<String, Value> = serde_json::from_str(out.trim_end()).unwrap();
        let keys: Vec<&str> = row.keys().map(String::as_str).collect();
        assert_eq!(keys, columns(&[22, 443]));
        assert!(out.starts_with("{\"target\":\"nonexistent.invalid\",\"target_type\":\"DNS\""));
    }

    #[test]
    fn mismatched_ports_are_refused() {
        let mut w = ReportWriter::new(Vec::new(), ReportFormat::Csv, &[80]).unwrap();
        let r = DiagnosticRecord::pending("a.example".into(), &[22, 443]);
        assert!(matches!(w.write(&r), Err(DiagError::Report(_))));
    }
}
