use std::path::Path;

use colored::*;
use mtscan_common::session::Session;
use mtscan_common::success;
use mtscan_core::report as scan_report;

use crate::commands::EXIT_OK;
use crate::terminal::{colors, print};

pub fn report(dir: &Path, target: &str) -> anyhow::Result<u8> {
    print::header("generating report");
    let session = Session::existing(dir)?;
    let summary = scan_report::generate(&session, target)?;

    let v = &summary.vulnerabilities;
    print::set_key_width(["HTTP services", "Vulnerabilities"]);
    print::aligned_line("Target", target);
    print::aligned_line("Open ports", summary.open_ports.to_string());
    print::aligned_line("HTTP services", summary.http_services.to_string());
    print::aligned_line(
        "Vulnerabilities",
        format!(
            "{} ({} critical, {} high)",
            v.total(),
            v.critical.to_string().color(colors::SEVERITY_CRITICAL),
            v.high.to_string().color(colors::SEVERITY_HIGH)
        ),
    );

    success!("Summary report generated: {}", session.summary_file().display());
    success!("Detailed report: {}", session.report_file().display());
    success!("JSON results: {}", session.results_file().display());
    Ok(EXIT_OK)
}
