//! # Scan Report
//!
//! Turns a session's raw findings into the files handed to people and tools:
//! `summary.txt`, a Markdown `report.md` with one table per scanner, and
//! `results.json` with every record plus the counts.

use std::fmt::Write as _;
use std::fs;
use std::path::Path;

use anyhow::Context;
use mtscan_common::session::Session;
use serde_json::{Value, json};

use crate::summary::{Findings, SeverityCounts, Summary, severity_of};

const MISSING: &str = "-";

/// Overall rating, driven by the most severe finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RiskLevel {
    Critical,
    High,
    Medium,
    Low,
    None,
}

impl RiskLevel {
    pub fn from_counts(counts: &SeverityCounts) -> Self {
        if counts.critical > 0 {
            RiskLevel::Critical
        } else if counts.high > 0 {
            RiskLevel::High
        } else if counts.medium > 0 {
            RiskLevel::Medium
        } else if counts.low > 0 {
            RiskLevel::Low
        } else {
            RiskLevel::None
        }
    }

    pub fn assessment(self) -> &'static str {
        match self {
            RiskLevel::Critical => {
                "**CRITICAL RISK**: Immediate action required. Critical vulnerabilities were detected that could lead to system compromise."
            }
            RiskLevel::High => {
                "**HIGH RISK**: Urgent remediation needed. High severity vulnerabilities were detected."
            }
            RiskLevel::Medium => {
                "**MEDIUM RISK**: Important issues found that should be addressed in a timely manner."
            }
            RiskLevel::Low => "**LOW RISK**: Minor issues detected that should be fixed when convenient.",
            RiskLevel::None => {
                "**NO SIGNIFICANT RISK**: No significant vulnerabilities were detected in this scan."
            }
        }
    }
}

pub fn render_markdown(summary: &Summary, findings: &Findings) -> String {
    let v = &summary.vulnerabilities;
    let mut out = String::new();

    let _ = writeln!(out, "# Security Scan Report for {}\n", summary.target);
    let _ = writeln!(out, "## Summary\n");
    let _ = writeln!(out, "- **Target:** {}", summary.target);
    let _ = writeln!(out, "- **Scan Date:** {}", summary.generated.format("%Y-%m-%d %H:%M:%S"));
    let _ = writeln!(out, "- **Open Ports:** {}", summary.open_ports);
    let _ = writeln!(out, "- **HTTP Services:** {}", summary.http_services);
    let _ = writeln!(out, "- **Total Vulnerabilities:** {}", v.total());
    let _ = writeln!(out, "  - Critical: {}", v.critical);
    let _ = writeln!(out, "  - High: {}", v.high);
    let _ = writeln!(out, "  - Medium: {}", v.medium);
    let _ = writeln!(out, "  - Low: {}", v.low);
    let _ = writeln!(out, "  - Info: {}\n", v.info);

    let _ = writeln!(out, "## Risk Assessment\n");
    let _ = writeln!(out, "{}", RiskLevel::from_counts(v).assessment());

    if !findings.vulnerabilities.is_empty() {
        table(
            &mut out,
            "Vulnerabilities",
            &["Name", "Severity", "URL", "Description"],
            findings.vulnerabilities.iter().map(|vuln| {
                let info = vuln.get("info");
                vec![
                    cell(info.and_then(|i| i.get("name"))),
                    severity_of(vuln).map_or_else(|| MISSING.to_string(), escape),
                    cell(vuln.get("matched-at").or_else(|| vuln.get("matched")).or_else(|| vuln.get("host"))),
                    cell(info.and_then(|i| i.get("description"))),
                ]
            }),
        );
    }

    if !findings.http_services.is_empty() {
        table(
            &mut out,
            "HTTP Services",
            &["URL", "Status", "Title", "Technologies"],
            findings.http_services.iter().map(|service| {
                vec![
                    cell(service.get("url")),
                    cell(service.get("status_code").or_else(|| service.get("status-code"))),
                    cell(service.get("title")),
                    cell(service.get("tech")),
                ]
            }),
        );
    }

    if !findings.ports.is_empty() {
        table(
            &mut out,
            "Open Ports",
            &["Host", "Port", "Protocol"],
            findings.ports.iter().map(|port| {
                let host = port
                    .get("host")
                    .filter(|h| h.as_str().is_some_and(|h| !h.is_empty()))
                    .or_else(|| port.get("ip"));
                let protocol = match port.get("protocol") {
                    Some(p) if !p.is_null() => cell(Some(p)),
                    _ => "tcp".to_string(),
                };
                vec![cell(host), cell(port.get("port")), protocol]
            }),
        );
    }

    out
}

fn table<I>(out: &mut String, title: &str, headers: &[&str], rows: I)
where
    I: IntoIterator<Item = Vec<String>>,
{
    let _ = writeln!(out, "\n## {title}\n");
    let _ = writeln!(out, "| {} |", headers.join(" | "));
    let rule: Vec<String> = headers.iter().map(|h| "-".repeat(h.len())).collect();
    let _ = writeln!(out, "| {} |", rule.join(" | "));
    for row in rows {
        let _ = writeln!(out, "| {} |", row.join(" | "));
    }
}

/// Markdown-safe rendering of one field.
fn cell(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => MISSING.to_string(),
        Some(Value::String(s)) if s.trim().is_empty() => MISSING.to_string(),
        Some(Value::String(s)) => escape(s),
        Some(Value::Array(items)) => {
            let joined: Vec<String> = items
                .iter()
                .map(|item| match item {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                })
                .collect();
            if joined.is_empty() { MISSING.to_string() } else { escape(&joined.join(", ")) }
        }
        Some(other) => escape(&other.to_string()),
    }
}

fn escape(text: &str) -> String {
    text.trim().replace('|', "\\|").replace(['\r', '\n'], " ")
}

pub fn results_json(summary: &Summary, findings: &Findings) -> Value {
    let v = &summary.vulnerabilities;
    json!({
        "target_info": {
            "name": summary.target,
            "scan_date": summary.generated.format("%Y-%m-%d %H:%M:%S").to_string(),
        },
        "summary": {
            "open_ports": summary.open_ports,
            "http_services": summary.http_services,
            "risk": format!("{:?}", RiskLevel::from_counts(v)).to_lowercase(),
            "vulnerabilities": {
                "critical": v.critical,
                "high": v.high,
                "medium": v.medium,
                "low": v.low,
                "info": v.info,
                "other": v.other,
                "total": v.total(),
            },
        },
        "ports": findings.ports,
        "http_services": findings.http_services,
        "vulnerabilities": findings.vulnerabilities,
    })
}

fn write_file(path: &Path, contents: &str) -> anyhow::Result<()> {
    fs::write(path, contents).with_context(|| format!("failed to write {}", path.display()))
}

/// Writes `summary.txt`, `report.md` and `results.json` for `session`.
pub fn generate(session: &Session, target: &str) -> anyhow::Result<Summary> {
    let findings = Findings::load(session);
    let summary = Summary::from_findings(target, &findings);

    summary.write(session)?;
    write_file(&session.report_file(), &render_markdown(&summary, &findings))?;
    let results = serde_json::to_string_pretty(&results_json(&summary, &findings))?;
    write_file(&session.results_file(), &results)?;

    Ok(summary)
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
