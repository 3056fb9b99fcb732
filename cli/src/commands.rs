pub mod install;
pub mod menu;
pub mod report;
pub mod scan;
pub mod tools;

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use mtscan_common::config::Config;
use mtscan_common::stage::Stage;
use mtscan_common::tool::{ScanMode, Tool};

pub const EXIT_OK: u8 = 0;
pub const EXIT_ERROR: u8 = 1;
/// The scan finished but at least one stage failed.
pub const EXIT_PARTIAL: u8 = 2;
pub const EXIT_INTERRUPTED: u8 = 130;

#[derive(Parser)]
#[command(name = "mtscan", version)]
#[command(about = "Port scanning, HTTP probing and vulnerability scanning in one run.")]
pub struct CommandLine {
    /// Show debug output and the scanners' own progress
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Configuration file [default: ~/.mtscan.json]
    #[arg(long, global = true, value_name = "FILE")]
    pub config_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the scan workflow against a target
    #[command(alias = "s")]
    Scan(ScanArgs),
    /// Open the interactive menu (default)
    #[command(alias = "m")]
    Menu,
    /// Show where the external tools are installed
    #[command(alias = "t")]
    Tools,
    /// Install missing tools with `go install`
    #[command(alias = "i")]
    Install {
        /// Tools to install [default: all missing]
        tools: Vec<Tool>,
        /// Add the Go bin directory to the shell start-up file
        #[arg(long)]
        configure_shell: bool,
    },
    /// Regenerate the summary of an existing results directory
    #[command(alias = "r")]
    Report {
        /// Results directory of an earlier scan
        dir: PathBuf,
        /// Target the results belong to
        target: String,
    },
}

#[derive(Args, Debug, Clone)]
pub struct ScanArgs {
    /// Host, IP address or URL to scan
    pub target: String,

    /// Ports to scan (e.g. 80,443,8000-9000 or top-100) [default: top-1000]
    #[arg(short, long)]
    pub ports: Option<String>,

    /// Custom nuclei templates
    #[arg(short, long)]
    pub templates: Option<String>,

    /// Nuclei template tags [default: cve]
    #[arg(long)]
    pub tags: Option<String>,

    /// Vulnerability severity filter [default: critical,high]
    #[arg(long)]
    pub severity: Option<String>,

    /// Custom output directory
    #[arg(short, long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Update nuclei templates before scanning
    #[arg(long)]
    pub update_templates: bool,

    /// Run a single stage (ports, http or vuln) against the target
    #[arg(long, value_name = "STAGE")]
    pub only: Option<Stage>,

    /// Port scanning technique (syn or connect) [default: connect]
    #[arg(long, value_name = "MODE")]
    pub scan_mode: Option<ScanMode>,

    /// Per-tool time limit in seconds, 0 for none [default: 3600]
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,
}

impl CommandLine {
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// `--verbose`, or `general.verbose` from the configuration file.
    pub fn verbose_with(&self, config: &Config) -> bool {
        self.verbose || config.general.verbose
    }

    /// The subcommand to run. Without one the menu opens.
    pub fn take_command(&mut self) -> Commands {
        self.command.take().unwrap_or(Commands::Menu)
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
    use clap::CommandFactory;

    #[test]
    fn command_line_is_well_formed() {
        CommandLine::command().debug_assert();
    }

    #[test]
    fn scan_flags_parse_into_typed_values() {
        let cli = CommandLine::try_parse_from([
            "mtscan", "scan", "example.com", "-p", "80,443", "--only", "http", "--scan-mode", "syn",
            "-v",
        ])
        .unwrap();

        assert!(cli.verbose);
        let Some(Commands::Scan(args)) = cli.command else {
            panic!("expected scan subcommand");
        };
        assert_eq!(args.target, "example.com");
        assert_eq!(args.ports.as_deref(), Some("80,443"));
        assert_eq!(args.only, Some(Stage::HttpProbe));
        assert_eq!(args.scan_mode, Some(ScanMode::Syn));
        assert_eq!(args.tags, None);
    }

    #[test]
    fn unknown_stage_is_rejected() {
        assert!(CommandLine::try_parse_from(["mtscan", "scan", "example.com", "--only", "dns"]).is_err());
    }

    #[test]
    fn no_subcommand_means_menu() {
        let mut cli = CommandLine::try_parse_from(["mtscan"]).unwrap();
        assert!(cli.command.is_none());
        assert!(matches!(cli.take_command(), Commands::Menu));

        let mut cli = CommandLine::try_parse_from(["mtscan", "tools"]).unwrap();
        assert!(matches!(cli.take_command(), Commands::Tools));
    }

    #[test]
    fn verbose_comes_from_flag_or_config() {
        let mut config = Config::default();
        let quiet = CommandLine::try_parse_from(["mtscan", "tools"]).unwrap();
        let loud = CommandLine::try_parse_from(["mtscan", "tools", "--verbose"]).unwrap();

        assert!(!quiet.verbose_with(&config));
        assert!(loud.verbose_with(&config));

        config.general.verbose = true;
        assert!(quiet.verbose_with(&config));
    }

    #[test]
    fn install_accepts_tool_names() {
        let cli = CommandLine::try_parse_from(["mtscan", "install", "nuclei", "httpx", "--configure-shell"])
            .unwrap();
        let Some(Commands::Install { tools, configure_shell }) = cli.command else {
            panic!("expected install subcommand");
        };
        assert_eq!(tools, vec![Tool::Nuclei, Tool::Httpx]);
        assert!(configure_shell);
    }
}
