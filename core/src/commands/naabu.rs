//! Port scanner invocation.

use std::path::PathBuf;

use mtscan_common::config::NaabuConfig;
use mtscan_common::error::RequestError;
use mtscan_common::request::TargetInput;
use mtscan_common::tool::ScanMode;

use super::{non_blank, push_path, push_switch, push_value};

const HOST_FLAG: &str = "-host";
const PORTS_FLAG: &str = "-p";
const TOP_PORTS_FLAG: &str = "-top-ports";
const ALL_PORTS: &str = "1-65535";
const SCAN_TYPE_FLAG: &str = "-scan-type";

/// Flags (without dashes) that already pick a scanning technique.
const SCAN_MODE_FLAGS: &[&str] = &["scan-type", "s", "connect", "syn", "so"];

/// Which ports to probe, as understood by the port scanner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PortSpec {
    /// Most common ports; the scanner only knows the 100 and 1000 lists.
    Top(u16),
    All,
    /// Explicit list or ranges, e.g. `80,443,8000-9000`.
    List(String),
}

impl PortSpec {
    /// `top-N`, `all`/`full`, or anything else as a literal list.
    pub fn parse(spec: &str) -> Option<Self> {
        let spec = spec.trim();
        if spec.is_empty() {
            return None;
        }

        if let Some(count) = spec.strip_prefix("top-") {
            let top = match count.parse::<u32>() {
                Ok(n) if n > 100 => 1000,
                _ => 100,
            };
            return Some(PortSpec::Top(top));
        }

        match spec.to_ascii_lowercase().as_str() {
            "all" | "full" | "-" => Some(PortSpec::All),
            _ => Some(PortSpec::List(spec.to_string())),
        }
    }

    fn push_args(&self, args: &mut Vec<String>) {
        let (flag, value) = match self {
            PortSpec::Top(n) => (TOP_PORTS_FLAG, n.to_string()),
            PortSpec::All => (PORTS_FLAG, ALL_PORTS.to_string()),
            PortSpec::List(list) => (PORTS_FLAG, list.clone()),
        };
        args.push(flag.to_string());
        args.push(value);
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortScan {
    pub target: TargetInput,
    /// `top-100`, `top-1000`, `all`, or a comma separated list.
    pub ports: Option<String>,
    pub exclude_ports: Option<String>,
    pub concurrency: Option<u32>,
    pub rate: Option<u32>,
    /// Per-probe timeout in milliseconds.
    pub timeout: Option<u32>,
    pub retries: Option<u32>,
    pub json: bool,
    pub output: Option<PathBuf>,
    pub silent: bool,
    /// Technique to request. `None` means connect unless `extra_args` picks one.
    pub scan_mode: Option<ScanMode>,
    pub extra_args: Vec<String>,
}

impl PortScan {
    pub fn new(target: TargetInput) -> Self {
        Self {
            target,
            ports: None,
            exclude_ports: None,
            concurrency: None,
            rate: None,
            timeout: None,
            retries: None,
            json: false,
            output: None,
            silent: false,
            scan_mode: None,
            extra_args: Vec::new(),
        }
    }

    pub fn from_config(target: TargetInput, config: &NaabuConfig) -> Self {
        Self {
            ports: Some(config.ports.clone()),
            exclude_ports: config.exclude_ports.clone(),
            concurrency: config.threads,
            rate: config.rate,
            timeout: config.timeout,
            retries: config.retries,
            scan_mode: config.scan_mode,
            ..Self::new(target)
        }
    }

    pub fn validate(&self) -> Result<(), RequestError> {
        self.target.validate()
    }

    /// The effective technique after looking at `extra_args`.
    pub fn effective_scan_mode(&self) -> Option<ScanMode> {
        if has_scan_mode_flag(&self.extra_args) {
            None
        } else {
            Some(self.scan_mode.unwrap_or(ScanMode::Connect))
        }
    }

    pub fn to_args(&self) -> Vec<String> {
        let mut args = Vec::new();

        self.target.push_args(HOST_FLAG, &mut args);
        if let Some(ports) = self.ports.as_deref().and_then(PortSpec::parse) {
            ports.push_args(&mut args);
        }
        push_value(&mut args, "-exclude-ports", non_blank(&self.exclude_ports));
        push_value(&mut args, "-c", self.concurrency);
        push_value(&mut args, "-rate", self.rate);
        push_value(&mut args, "-timeout", self.timeout);
        push_value(&mut args, "-retries", self.retries);
        push_switch(&mut args, "-json", self.json);
        push_path(&mut args, "-o", self.output.as_deref());
        push_switch(&mut args, "-silent", self.silent);
        args.extend(self.extra_args.iter().cloned());

        if let Some(mode) = self.effective_scan_mode() {
            args.push(SCAN_TYPE_FLAG.to_string());
            args.push(mode.flag_value().to_string());
        }

        args
    }
}

/// Whether `args` already select a scan technique.
pub fn has_scan_mode_flag(args: &[String]) -> bool {
    args.iter().any(|arg| {
        let Some(name) = arg.strip_prefix("--").or_else(|| arg.strip_prefix('-')) else {
            return false;
        };
        let name = name.split_once('=').map_or(name, |(flag, _)| flag);
        SCAN_MODE_FLAGS.contains(&name)
    })
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

    fn scan_type_count(args: &[String]) -> usize {
        args.iter().filter(|a| a.as_str() == SCAN_TYPE_FLAG).count()
    }

    #[test]
    fn connect_mode_is_appended_once_by_default() {
        let args = PortScan::new(TargetInput::host("10.0.0.1")).to_args();
        assert_eq!(scan_type_count(&args), 1);
        assert_eq!(&args[args.len() - 2..], ["-scan-type", "c"]);
    }

    #[test]
    fn caller_supplied_mode_flags_suppress_the_default() {
        for extra in [
            vec!["-scan-type", "s"],
            vec!["--scan-type", "s"],
            vec!["-scan-type=s"],
            vec!["-s", "s"],
            vec!["--connect"],
            vec!["-syn"],
            vec!["-so"],
        ] {
            let mut scan = PortScan::new(TargetInput::host("10.0.0.1"));
            scan.extra_args = extra.iter().map(|s| s.to_string()).collect();
            let args = scan.to_args();

            assert!(!args.ends_with(&["-scan-type".to_string(), "c".to_string()]), "{args:?}");
            assert!(scan_type_count(&args) <= 1, "{args:?}");
        }
    }

    #[test]
    fn explicit_scan_mode_replaces_the_fallback() {
        let mut scan = PortScan::new(TargetInput::host("10.0.0.1"));
        scan.scan_mode = Some(ScanMode::Syn);
        let args = scan.to_args();
        assert_eq!(scan_type_count(&args), 1);
        assert_eq!(&args[args.len() - 2..], ["-scan-type", "s"]);
    }

    #[test]
    fn options_map_to_naabu_flags_in_order() {
        let mut scan = PortScan::new(TargetInput::list("/tmp/hosts.txt"));
        scan.ports = Some("80,443".into());
        scan.concurrency = Some(25);
        scan.json = true;
        scan.output = Some(PathBuf::from("/tmp/out/ports.txt"));
        scan.silent = true;

        assert_eq!(
            scan.to_args(),
            vec![
                "-l", "/tmp/hosts.txt", "-p", "80,443", "-c", "25", "-json", "-o",
                "/tmp/out/ports.txt", "-silent", "-scan-type", "c",
            ]
        );
    }

    #[test]
    fn top_lists_use_the_top_ports_flag() {
        assert_eq!(PortSpec::parse("top-100"), Some(PortSpec::Top(100)));
        assert_eq!(PortSpec::parse("top-1000"), Some(PortSpec::Top(1000)));
        assert_eq!(PortSpec::parse("top-5000"), Some(PortSpec::Top(1000)));
        assert_eq!(PortSpec::parse("top-x"), Some(PortSpec::Top(100)));
        assert_eq!(PortSpec::parse("all"), Some(PortSpec::All));
        assert_eq!(PortSpec::parse(" "), None);

        let mut scan = PortScan::new(TargetInput::host("10.0.0.1"));
        scan.ports = Some("top-1000".into());
        let args = scan.to_args();
        assert_eq!(&args[2..4], ["-top-ports", "1000"]);
        assert!(!args.contains(&"-p".to_string()));

        scan.ports = Some("all".into());
        assert_eq!(&scan.to_args()[2..4], ["-p", "1-65535"]);
    }

    #[test]
    fn flag_detection_ignores_values_and_other_flags() {
        let args: Vec<String> = ["-p", "syn", "-rate", "so", "-silent"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert!(!has_scan_mode_flag(&args));
    }

    #[test]
    fn from_config_copies_defaults() {
        let scan = PortScan::from_config(TargetInput::host("10.0.0.1"), &NaabuConfig::default());
        assert_eq!(scan.ports.as_deref(), Some("top-1000"));
        assert_eq!(scan.concurrency, Some(25));
        assert_eq!(scan.scan_mode, None);
    }
}
