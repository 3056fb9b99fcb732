//! # Tool Installation
//!
//! Builds missing scanners with `go install` and refreshes the vulnerability
//! scanner's template store. Installing Go itself is left to the system
//! package manager.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{anyhow, ensure};
use mtscan_common::tool::Tool;
use mtscan_common::{info, success};

use crate::locator::ToolLocator;
use crate::runner::{CommandSpec, ProcessRunner, RunnerConfig};

pub const INSTALL_TIMEOUT: Duration = Duration::from_secs(600);
pub const INSTALL_RETRY: u32 = 2;
const GO: &str = "go";
const UPDATE_TEMPLATES_FLAG: &str = "-update-templates";

pub struct Installer {
    locator: ToolLocator,
    runner: RunnerConfig,
}

impl Installer {
    pub fn new(locator: ToolLocator) -> Self {
        Self {
            locator,
            runner: RunnerConfig::default()
                .with_timeout(Some(INSTALL_TIMEOUT))
                .with_retry(INSTALL_RETRY),
        }
    }

    pub fn with_runner(mut self, runner: RunnerConfig) -> Self {
        self.runner = runner;
        self
    }

    pub fn go_binary(&self) -> Option<PathBuf> {
        self.locator.find_program(GO)
    }

    /// `go install`s `tool` and returns where it ended up.
    pub async fn install_tool(&self, tool: Tool) -> anyhow::Result<PathBuf> {
        let go = self
            .go_binary()
            .ok_or_else(|| anyhow!("Go toolchain not found; install Go before installing {tool}"))?;

        info!("Installing {tool} ({})", tool.go_package());
        let spec = CommandSpec::program(
            &go,
            vec!["install".into(), "-v".into(), tool.go_package().into()],
        );
        let runner = ProcessRunner::new(self.runner.clone());
        ensure!(runner.run(&spec).await, "go install failed for {tool}");

        let path = self.locator.locate(tool).ok_or_else(|| {
            anyhow!("{tool} was built but is not in any searched directory; is GOBIN on PATH?")
        })?;
        success!("{tool} installed at {}", path.display());
        Ok(path)
    }

    /// Installs each of `tools` that cannot be located yet.
    pub async fn install_missing(&self, tools: &[Tool]) -> Vec<(Tool, anyhow::Result<PathBuf>)> {
        let mut results = Vec::with_capacity(tools.len());
        for &tool in tools {
            let result = match self.locator.locate(tool) {
                Some(path) => {
                    info!("{tool} already installed at {}", path.display());
                    Ok(path)
                }
                None => self.install_tool(tool).await,
            };
            results.push((tool, result));
        }
        results
    }
}

/// Runs the template update of the vulnerability scanner at `nuclei`.
pub async fn update_templates(nuclei: &Path) -> bool {
    info!("Updating nuclei templates");
    let runner = ProcessRunner::new(RunnerConfig::default().with_timeout(Some(INSTALL_TIMEOUT)));
    let spec = CommandSpec::program(nuclei, vec![UPDATE_TEMPLATES_FLAG.into()]);
    let updated = runner.run(&spec).await;
    if updated {
        success!("Templates updated");
    }
    updated
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
