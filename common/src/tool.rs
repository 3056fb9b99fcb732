//! # External Tools
//!
//! Identity of the three scanners `mtscan` drives. Everything the rest of the
//! workspace needs to know about a tool without running it lives here: the
//! binary names it may be installed under, the Go package it is built from and
//! the flags that prove an executable actually works.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

const VERSION_FLAGS: &[&str] = &["-version", "--version", "-h"];

/// One of the external scanners.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Tool {
    /// Port scanner.
    Naabu,
    /// HTTP probe.
    Httpx,
    /// Template based vulnerability scanner.
    Nuclei,
}

impl Tool {
    pub const ALL: [Tool; 3] = [Tool::Naabu, Tool::Httpx, Tool::Nuclei];

    pub fn name(&self) -> &'static str {
        match self {
            Tool::Naabu => "naabu",
            Tool::Httpx => "httpx",
            Tool::Nuclei => "nuclei",
        }
    }

    /// File names the tool may be installed under, preferred name first.
    ///
    /// Kali ships the HTTP probe as `httpx-toolkit` because `httpx` clashes
    /// with the Python client of the same name.
    pub fn binary_names(&self) -> &'static [&'static str] {
        match self {
            Tool::Naabu => &["naabu"],
            Tool::Httpx => &["httpx", "httpx-toolkit"],
            Tool::Nuclei => &["nuclei"],
        }
    }

    /// Package path handed to `go install`.
    pub fn go_package(&self) -> &'static str {
        match self {
            Tool::Naabu => "github.com/projectdiscovery/naabu/v2/cmd/naabu@latest",
            Tool::Httpx => "github.com/projectdiscovery/httpx/cmd/httpx@latest",
            Tool::Nuclei => "github.com/projectdiscovery/nuclei/v3/cmd/nuclei@latest",
        }
    }

    /// Flags tried in order when verifying a candidate executable.
    pub fn version_flags(&self) -> &'static [&'static str] {
        VERSION_FLAGS
    }

    pub fn role(&self) -> &'static str {
        match self {
            Tool::Naabu => "port scanner",
            Tool::Httpx => "HTTP probe",
            Tool::Nuclei => "vulnerability scanner",
        }
    }
}

impl fmt::Display for Tool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Tool {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "naabu" => Ok(Tool::Naabu),
            "httpx" | "httpx-toolkit" => Ok(Tool::Httpx),
            "nuclei" => Ok(Tool::Nuclei),
            other => Err(format!("unknown tool: {other} (expected naabu, httpx or nuclei)")),
        }
    }
}

/// Port scanning technique requested from the port scanner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScanMode {
    /// Half-open probe; needs raw socket capabilities.
    Syn,
    /// Full TCP handshake through the regular socket API.
    Connect,
}

impl ScanMode {
    /// Value passed to the port scanner's `-scan-type` flag.
    pub fn flag_value(self) -> &'static str {
        match self {
            ScanMode::Syn => "s",
            ScanMode::Connect => "c",
        }
    }

    pub fn needs_privileges(self) -> bool {
        matches!(self, ScanMode::Syn)
    }
}

impl FromStr for ScanMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "syn" | "s" => Ok(ScanMode::Syn),
            "connect" | "c" => Ok(ScanMode::Connect),
            other => Err(format!("unknown scan mode: {other} (expected syn or connect)")),
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tool_from_str_accepts_names_and_kali_alias() {
        assert_eq!(Tool::from_str("naabu"), Ok(Tool::Naabu));
        assert_eq!(Tool::from_str("HTTPX"), Ok(Tool::Httpx));
        assert_eq!(Tool::from_str("httpx-toolkit"), Ok(Tool::Httpx));
        assert_eq!(Tool::from_str(" nuclei "), Ok(Tool::Nuclei));
        assert!(Tool::from_str("nmap").is_err());
    }

    #[test]
    fn preferred_binary_name_matches_tool_name() {
        for tool in Tool::ALL {
            assert_eq!(tool.binary_names()[0], tool.name());
        }
    }

    #[test]
    fn scan_mode_round_trips_through_flag_value() {
        assert_eq!(ScanMode::from_str(ScanMode::Syn.flag_value()), Ok(ScanMode::Syn));
        assert_eq!(ScanMode::from_str("connect"), Ok(ScanMode::Connect));
        assert!(ScanMode::Syn.needs_privileges());
        assert!(!ScanMode::Connect.needs_privileges());
    }
}
