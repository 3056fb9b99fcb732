use std::fmt;
use std::str::FromStr;

use crate::tool::Tool;

/// A step of the scan workflow.
///
/// The order is fixed: `PortScan → HttpProbe → VulnScan → Summary`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Stage {
    PortScan,
    HttpProbe,
    VulnScan,
    Summary,
}

impl Stage {
    pub const FIRST: Stage = Stage::PortScan;

    pub fn next(self) -> Option<Stage> {
        match self {
            Stage::PortScan => Some(Stage::HttpProbe),
            Stage::HttpProbe => Some(Stage::VulnScan),
            Stage::VulnScan => Some(Stage::Summary),
            Stage::Summary => None,
        }
    }

    /// The external tool a stage shells out to, if any.
    pub fn tool(self) -> Option<Tool> {
        match self {
            Stage::PortScan => Some(Tool::Naabu),
            Stage::HttpProbe => Some(Tool::Httpx),
            Stage::VulnScan => Some(Tool::Nuclei),
            Stage::Summary => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Stage::PortScan => "port scan",
            Stage::HttpProbe => "HTTP probe",
            Stage::VulnScan => "vulnerability scan",
            Stage::Summary => "summary",
        }
    }

    /// Short name accepted by `--only`.
    pub fn short_name(self) -> &'static str {
        match self {
            Stage::PortScan => "ports",
            Stage::HttpProbe => "http",
            Stage::VulnScan => "vuln",
            Stage::Summary => "summary",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Stage {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ports" | "port-scan" | "naabu" => Ok(Stage::PortScan),
            "http" | "http-probe" | "httpx" => Ok(Stage::HttpProbe),
            "vuln" | "vuln-scan" | "nuclei" => Ok(Stage::VulnScan),
            other => Err(format!("unknown stage: {other} (expected ports, http or vuln)")),
        }
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
