//! # Summary Report
//!
//! Counts what the scanners themselves reported and writes it to
//! `summary.txt`. Only raw tool output is read (`ports.json`,
//! `http_services.json`, `vulnerabilities.jsonl`); the substitute input files
//! the pipeline writes after a failed stage never count as findings.

use std::fmt::Write as _;
use std::fs;
use std::path::PathBuf;

use anyhow::Context;
use chrono::{DateTime, Local};
use mtscan_common::session::{
    HTTP_SERVICES_FILE, HTTP_SERVICES_JSON, PORTS_FILE, PORTS_JSON, REPORT_FILE, RESPONSES_DIR,
    RESULTS_FILE, Session, VULNERABILITIES_FILE,
};
use serde_json::Value;

use crate::output;

const RULE_WIDTH: usize = 60;

/// Findings per nuclei severity level.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeverityCounts {
    pub critical: usize,
    pub high: usize,
    pub medium: usize,
    pub low: usize,
    pub info: usize,
    /// Missing or unrecognised severity.
    pub other: usize,
}

impl SeverityCounts {
    pub fn record(&mut self, severity: Option<&str>) {
        let severity = severity.map(|s| s.trim().to_ascii_lowercase());
        match severity.as_deref() {
            Some("critical") => self.critical += 1,
            Some("high") => self.high += 1,
            Some("medium") => self.medium += 1,
            Some("low") => self.low += 1,
            Some("info") => self.info += 1,
            _ => self.other += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.critical + self.high + self.medium + self.low + self.info + self.other
    }

    pub fn from_records(records: &[Value]) -> Self {
        let mut counts = Self::default();
        for record in records {
            counts.record(severity_of(record));
        }
        counts
    }
}

pub fn severity_of(record: &Value) -> Option<&str> {
    record
        .get("info")
        .and_then(|info| info.get("severity"))
        .and_then(Value::as_str)
}

/// Raw records of every scanner that produced output.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Findings {
    pub ports: Vec<Value>,
    pub http_services: Vec<Value>,
    pub vulnerabilities: Vec<Value>,
}

impl Findings {
    /// Missing or unreadable files yield no records.
    pub fn load(session: &Session) -> Self {
        let records = |path: PathBuf| output::read_json_records(&path).unwrap_or_default();
        Self {
            ports: records(session.ports_json()),
            http_services: records(session.http_services_json()),
            vulnerabilities: records(session.vulnerabilities_file()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Summary {
    pub target: String,
    pub generated: DateTime<Local>,
    pub open_ports: usize,
    pub http_services: usize,
    pub vulnerabilities: SeverityCounts,
}

impl Summary {
    pub fn collect(session: &Session, target: &str) -> Self {
        Self::from_findings(target, &Findings::load(session))
    }

    pub fn from_findings(target: &str, findings: &Findings) -> Self {
        Self {
            target: target.to_string(),
            generated: Local::now(),
            open_ports: output::port_endpoints(&findings.ports).len(),
            http_services: output::service_urls(&findings.http_services).len(),
            vulnerabilities: SeverityCounts::from_records(&findings.vulnerabilities),
        }
    }

    pub fn needs_attention(&self) -> bool {
        self.vulnerabilities.critical > 0 || self.vulnerabilities.high > 0
    }

    pub fn render(&self) -> String {
        let rule = "=".repeat(RULE_WIDTH);
        let v = &self.vulnerabilities;
        let mut out = String::new();

        // Writing into a String cannot fail.
        let _ = writeln!(out, "{rule}");
        let _ = writeln!(out, "VULNERABILITY SCAN SUMMARY FOR {}", self.target);
        let _ = writeln!(out, "Scan Date: {}", self.generated.format("%Y-%m-%d %H:%M:%S"));
        let _ = writeln!(out, "{rule}\n");

        let _ = writeln!(out, "FINDINGS SUMMARY:");
        let _ = writeln!(out, "Open ports detected: {}", self.open_ports);
        let _ = writeln!(out, "HTTP services detected: {}", self.http_services);
        let _ = writeln!(out, "Total vulnerabilities found: {}", v.total());
        let _ = writeln!(out, "  - Critical severity: {}", v.critical);
        let _ = writeln!(out, "  - High severity: {}", v.high);
        let _ = writeln!(out, "  - Medium severity: {}", v.medium);
        let _ = writeln!(out, "  - Low severity: {}", v.low);
        let _ = writeln!(out, "  - Informational: {}", v.info);
        if v.other > 0 {
            let _ = writeln!(out, "  - Unclassified: {}", v.other);
        }
        out.push('\n');

        if self.needs_attention() {
            let _ = writeln!(out, "RECOMMENDATIONS:");
            let _ = writeln!(
                out,
                "The scan detected critical/high severity vulnerabilities that require immediate attention!"
            );
            let _ = writeln!(
                out,
                "Review the findings in '{VULNERABILITIES_FILE}' and take appropriate remediation steps.\n"
            );
        }

        let _ = writeln!(out, "FILES OVERVIEW:");
        let _ = writeln!(out, "- {PORTS_JSON}: Port scan results");
        let _ = writeln!(out, "- {PORTS_FILE}: List of open ports");
        let _ = writeln!(out, "- {HTTP_SERVICES_JSON}: HTTP probe results");
        let _ = writeln!(out, "- {HTTP_SERVICES_FILE}: Detected HTTP services");
        let _ = writeln!(out, "- {VULNERABILITIES_FILE}: Detailed vulnerability findings");
        let _ = writeln!(
            out,
            "- {RESPONSES_DIR}/: HTTP requests/responses for detected vulnerabilities"
        );
        let _ = writeln!(out, "- {REPORT_FILE}: Detailed report");
        let _ = writeln!(out, "- {RESULTS_FILE}: All findings as JSON\n");

        let _ = writeln!(out, "{rule}");
        let _ = writeln!(out, "End of Summary Report");
        out
    }

    pub fn write(&self, session: &Session) -> anyhow::Result<PathBuf> {
        let path = session.summary_file();
        fs::write(&path, self.render())
            .with_context(|| format!("failed to write summary {}", path.display()))?;
        Ok(path)
    }
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
