use anyhow::Context;
use mtscan_common::config::Config;
use mtscan_common::tool::Tool;
use mtscan_common::{error, info, success, warn};
use mtscan_core::environment::{EnvironmentTransaction, GoPaths, Shell, plan_edits};
use mtscan_core::installer::Installer;
use mtscan_core::locator::{ToolLocator, Toolbox};

use crate::commands::tools::print_toolbox;
use crate::commands::{EXIT_ERROR, EXIT_OK};
use crate::mprint;
use crate::terminal::print;

pub async fn install(tools: Vec<Tool>, configure_shell: bool, config: &Config) -> anyhow::Result<u8> {
    print::header("installing tools");
    let tools = if tools.is_empty() { Tool::ALL.to_vec() } else { tools };

    let locator = ToolLocator::from_env(config.paths.clone());
    let installer = Installer::new(locator.clone());

    if installer.go_binary().is_none() {
        warn!("Go toolchain not found. Install Go (https://go.dev/dl/) and run this command again");
    }

    let mut failed = 0usize;
    for (tool, result) in installer.install_missing(&tools).await {
        if let Err(e) = result {
            error!("{tool}: {e:#}");
            failed += 1;
        }
    }

    if configure_shell {
        configure_shell_environment()?;
    }

    mprint!();
    print_toolbox(&Toolbox::discover(&locator));

    Ok(if failed == 0 { EXIT_OK } else { EXIT_ERROR })
}

fn configure_shell_environment() -> anyhow::Result<()> {
    let home = dirs::home_dir().context("cannot determine the home directory")?;
    let shell = Shell::detect();
    let edits = plan_edits(shell, &home, &GoPaths::under(&home));

    let changed = EnvironmentTransaction::apply(&edits)?;
    if changed.is_empty() {
        info!("Shell environment already configured");
    }
    for path in changed {
        success!("Added Go environment to {}", path.display());
    }
    Ok(())
}
