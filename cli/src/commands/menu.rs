use std::fmt;
use std::io::{self, Write};
use std::path::PathBuf;
use std::time::Duration;

use colored::*;
use crossterm::cursor::MoveTo;
use crossterm::execute;
use crossterm::terminal::{Clear, ClearType};
use mtscan_common::config::Config;
use mtscan_common::stage::Stage;
use mtscan_common::tool::Tool;
use mtscan_common::{error, info, success, warn};
use mtscan_core::installer::{self, Installer};
use mtscan_core::locator::{ToolLocator, Toolbox};
use mtscan_core::runner::{CommandSpec, StreamOutcome, StreamSource, stream_lines_until};

use crate::commands::{EXIT_INTERRUPTED, EXIT_OK, EXIT_PARTIAL};
use crate::mprint;
use crate::terminal::{colors, print};

const OPTIONS: &[(&str, &str)] = &[
    ("1", "Port scan (naabu)"),
    ("2", "HTTP probe (httpx)"),
    ("3", "Vulnerability scan (nuclei)"),
    ("4", "Full scan (ports, HTTP, vulnerabilities)"),
    ("5", "Update nuclei templates"),
    ("6", "Install missing tools"),
    ("7", "Help"),
    ("0", "Exit"),
];

const PORT_OPTIONS: &[(&str, &str, &str)] = &[
    ("1", "Top 100 ports", "top-100"),
    ("2", "Top 1000 ports (default)", "top-1000"),
    ("3", "All ports (1-65535)", "all"),
    ("4", "Custom ports", ""),
];

const DEFAULT_PORTS: &str = "top-1000";
/// Time an interrupted scan gets to stop its scanners before it is killed.
/// Longer than the runner's own SIGTERM grace for elevated scanners.
const SCAN_SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

/// Settings the menu hands down to every scan it starts.
pub struct MenuContext {
    pub config: Config,
    pub config_file: Option<PathBuf>,
    pub verbose: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Choice {
    Scan(Option<Stage>),
    UpdateTemplates,
    InstallTools,
    Help,
    Exit,
}

impl Choice {
    fn parse(input: &str) -> Option<Self> {
        match input.trim() {
            "1" => Some(Choice::Scan(Some(Stage::PortScan))),
            "2" => Some(Choice::Scan(Some(Stage::HttpProbe))),
            "3" => Some(Choice::Scan(Some(Stage::VulnScan))),
            "4" => Some(Choice::Scan(None)),
            "5" => Some(Choice::UpdateTemplates),
            "6" => Some(Choice::InstallTools),
            "7" => Some(Choice::Help),
            "0" | "q" | "exit" => Some(Choice::Exit),
            _ => None,
        }
    }
}

/// Raised from a prompt to leave the menu with an exit code.
#[derive(Debug)]
struct Leave(u8);

impl fmt::Display for Leave {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "menu closed with exit code {}", self.0)
    }
}

impl std::error::Error for Leave {}

pub async fn menu(ctx: &MenuContext) -> anyhow::Result<u8> {
    match menu_loop(ctx).await {
        Ok(code) => Ok(code),
        Err(e) => match e.downcast::<Leave>() {
            Ok(Leave(code)) => Ok(code),
            Err(e) => Err(e),
        },
    }
}

async fn menu_loop(ctx: &MenuContext) -> anyhow::Result<u8> {
    loop {
        clear_screen();
        print::banner();

        let locator = ToolLocator::from_env(ctx.config.paths.clone());
        let toolbox = Toolbox::discover_verified(&locator).await;
        print_tool_status(&toolbox);
        print_options();

        let input = prompt("Select an option").await?;
        let Some(choice) = Choice::parse(&input) else {
            warn!("Invalid option: {input}");
            pause().await?;
            continue;
        };

        match choice {
            Choice::Exit => {
                info!("Goodbye");
                return Ok(EXIT_OK);
            }
            Choice::Help => print_help(),
            Choice::UpdateTemplates => match toolbox.nuclei.as_deref() {
                Some(nuclei) => {
                    if !installer::update_templates(nuclei).await {
                        error!("Template update failed");
                    }
                }
                None => error!("nuclei is not installed, choose option 6 first"),
            },
            Choice::InstallTools => install_missing(&locator, &toolbox).await,
            Choice::Scan(only) => {
                if let Some(tool) = only.and_then(Stage::tool) {
                    if toolbox.get(tool).is_none() {
                        warn!("{tool} is not installed, the scan will report it as failed");
                    }
                }
                let args = collect_scan_args(only).await?;
                run_scan(ctx, args).await?;
            }
        }

        pause().await?;
    }
}

async fn collect_scan_args(only: Option<Stage>) -> anyhow::Result<Vec<String>> {
    let target = loop {
        let target = prompt("Enter target (IP, domain or URL)").await?;
        if !target.is_empty() {
            break target;
        }
        warn!("Target cannot be empty");
    };

    let mut args = vec!["scan".to_string(), target];

    if let Some(stage) = only {
        args.push("--only".into());
        args.push(stage.short_name().into());
    }

    if matches!(only, None | Some(Stage::PortScan)) {
        args.push("-p".into());
        args.push(select_ports().await?);

        if confirm("Use SYN scan (needs root)?").await? {
            args.push("--scan-mode".into());
            args.push("syn".into());
        }
    }

    if matches!(only, None | Some(Stage::VulnScan)) {
        let tags = prompt("Template tags [cve]").await?;
        if !tags.is_empty() {
            args.push("--tags".into());
            args.push(tags);
        }
        let severity = prompt("Severity filter [critical,high]").await?;
        if !severity.is_empty() {
            args.push("--severity".into());
            args.push(severity);
        }
    }

    if confirm("Verbose output?").await? {
        args.push("--verbose".into());
    }

    Ok(args)
}

async fn select_ports() -> anyhow::Result<String> {
    mprint!();
    for (key, label, _) in PORT_OPTIONS {
        print::print_status(format!("{} {}", format!("[{key}]").color(colors::ACCENT), label));
    }

    let choice = prompt("Port selection [2]").await?;
    let ports = match PORT_OPTIONS.iter().find(|(key, _, _)| *key == choice.as_str()) {
        Some((_, _, spec)) if !spec.is_empty() => spec.to_string(),
        Some(_) => {
            let custom = prompt("Ports (e.g. 80,443,8000-9000)").await?;
            if custom.is_empty() {
                DEFAULT_PORTS.to_string()
            } else {
                custom
            }
        }
        None => DEFAULT_PORTS.to_string(),
    };
    Ok(ports)
}

/// Runs `mtscan scan ...` as a child and mirrors its output.
async fn run_scan(ctx: &MenuContext, mut args: Vec<String>) -> anyhow::Result<()> {
    if let Some(config_file) = &ctx.config_file {
        args.push("--config-file".into());
        args.push(config_file.display().to_string());
    }
    if ctx.verbose && !args.iter().any(|a| a == "--verbose") {
        args.push("--verbose".into());
    }

    let exe = std::env::current_exe()?;
    let spec = CommandSpec::program(&exe, args);

    mprint!();
    info!("Running: {spec}");
    mprint!();

    let outcome = stream_lines_until(
        &spec,
        |source, line| match source {
            StreamSource::Stdout | StreamSource::Stderr => print::print(line),
        },
        tokio::signal::ctrl_c(),
        SCAN_SHUTDOWN_GRACE,
    )
    .await;

    mprint!();
    match outcome {
        Err(e) => error!("Could not start the scan: {e}"),
        Ok(StreamOutcome::Interrupted(None)) => {
            warn!("Scan did not stop within {}s and was killed", SCAN_SHUTDOWN_GRACE.as_secs());
            warn!("Scan interrupted, returning to the menu");
        }
        Ok(StreamOutcome::Interrupted(Some(_))) => warn!("Scan interrupted, returning to the menu"),
        Ok(StreamOutcome::Exited(status)) => match status.code().map(|c| c as u8) {
            Some(EXIT_OK) => success!("Scan completed successfully"),
            Some(EXIT_PARTIAL) => warn!("Scan completed with issues, see errors.log in the results"),
            Some(EXIT_INTERRUPTED) | None => warn!("Scan was interrupted"),
            Some(code) => error!("Scan failed with exit code {code}"),
        },
    }
    Ok(())
}

async fn install_missing(locator: &ToolLocator, toolbox: &Toolbox) {
    let missing = toolbox.missing();
    if missing.is_empty() {
        success!("All tools are installed");
        return;
    }

    let installer = Installer::new(locator.clone());
    for (tool, result) in installer.install_missing(&missing).await {
        if let Err(e) = result {
            error!("{tool}: {e:#}");
        }
    }
}

fn print_tool_status(toolbox: &Toolbox) {
    print::header("tool status");
    let status: Vec<String> = Tool::ALL
        .iter()
        .map(|tool| match toolbox.get(*tool) {
            Some(_) => format!("{} {}", tool.name().color(colors::PRIMARY), "ready".green()),
            None => format!("{} {}", tool.name().color(colors::TEXT_DEFAULT), "missing".red()),
        })
        .collect();
    print::print_status(status.join("   "));
}

fn print_options() {
    print::header("main menu");
    for (key, label) in OPTIONS {
        print::print_status(format!("{} {}", format!("[{key}]").color(colors::ACCENT), label));
    }
    mprint!();
}

fn print_help() {
    print::header("help");
    let lines = [
        "Port scan      finds open ports with naabu (connect scan unless SYN is chosen).",
        "HTTP probe     checks the target for web services with httpx.",
        "Vuln scan      runs nuclei templates against the target.",
        "Full scan      chains all three: open ports feed httpx, live URLs feed nuclei.",
        "",
        "Results are written to results_<target>_<timestamp>/ with a summary.txt.",
        "The same scans are available without the menu: mtscan scan <target> --help",
        "Press Ctrl+C during a scan to stop it and return here.",
    ];
    for line in lines {
        print::print(line);
    }
}

fn clear_screen() {
    let _ = execute!(io::stdout(), Clear(ClearType::All), MoveTo(0, 0));
}

async fn pause() -> anyhow::Result<()> {
    prompt("Press Enter to continue").await.map(|_| ())
}

async fn confirm(question: &str) -> anyhow::Result<bool> {
    let answer = prompt(&format!("{question} (y/N)")).await?;
    Ok(matches!(answer.to_ascii_lowercase().as_str(), "y" | "yes"))
}

/// Reads one trimmed line. End of input and Ctrl+C leave the menu.
async fn prompt(question: &str) -> anyhow::Result<String> {
    let mut stderr = io::stderr();
    write!(stderr, "{} {}: ", "[?]".blue().bold(), question)?;
    stderr.flush()?;

    let read = tokio::task::spawn_blocking(|| {
        let mut line = String::new();
        io::stdin().read_line(&mut line).map(|n| (n, line))
    });

    tokio::select! {
        joined = read => {
            let (n, line) = joined??;
            if n == 0 {
                mprint!();
                return Err(Leave(EXIT_OK).into());
            }
            Ok(line.trim().to_string())
        }
        _ = tokio::signal::ctrl_c() => {
            mprint!();
            warn!("Interrupted");
            Err(Leave(EXIT_INTERRUPTED).into())
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
