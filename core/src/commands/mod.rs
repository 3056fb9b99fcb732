//! Argument builders for the external scanners.
//!
//! Each tool gets a typed request struct whose `to_args` is a pure function
//! of its fields. Unset options emit nothing; nothing here spawns a process.

pub mod httpx;
pub mod naabu;
pub mod nuclei;

pub use httpx::HttpProbe;
pub use naabu::PortScan;
pub use nuclei::VulnScan;

use std::fmt::Display;
use std::path::Path;

fn push_value<T: Display>(args: &mut Vec<String>, flag: &str, value: Option<T>) {
    if let Some(value) = value {
        args.push(flag.to_string());
        args.push(value.to_string());
    }
}

fn push_path(args: &mut Vec<String>, flag: &str, value: Option<&Path>) {
    push_value(args, flag, value.map(|p| p.display()));
}

fn push_switch(args: &mut Vec<String>, flag: &str, enabled: bool) {
    if enabled {
        args.push(flag.to_string());
    }
}

/// Drops blank strings so an empty CLI value behaves like an unset one.
fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
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
    use mtscan_common::request::{LIST_FLAG, TargetInput};

    /// How often any of `flags` appears as a whole token.
    pub(super) fn count_flags(args: &[String], flags: &[&str]) -> usize {
        args.iter().filter(|a| flags.contains(&a.as_str())).count()
    }

    #[test]
    fn every_builder_emits_exactly_one_target_flag() {
        let inputs = [
            TargetInput::host("scanme.example.org"),
            TargetInput::list("/tmp/targets.txt"),
        ];

        for input in inputs {
            let naabu = PortScan::new(input.clone()).to_args();
            let httpx = HttpProbe::new(input.clone()).to_args();
            let nuclei = VulnScan::new(input.clone()).to_args();

            assert_eq!(count_flags(&naabu, &["-host", LIST_FLAG]), 1, "{naabu:?}");
            assert_eq!(count_flags(&httpx, &["-u", LIST_FLAG]), 1, "{httpx:?}");
            assert_eq!(count_flags(&nuclei, &["-u", LIST_FLAG]), 1, "{nuclei:?}");
        }
    }

    #[test]
    fn unset_values_emit_nothing() {
        let mut args = Vec::new();
        push_value::<u32>(&mut args, "-rate", None);
        push_switch(&mut args, "-silent", false);
        push_value(&mut args, "-p", non_blank(&Some("  ".to_string())));
        assert!(args.is_empty());
    }
}
