use colored::*;
use mtscan_common::config::Config;
use mtscan_common::tool::Tool;
use mtscan_core::locator::{ToolLocator, Toolbox};

use crate::commands::{EXIT_OK, EXIT_PARTIAL};
use crate::mprint;
use crate::terminal::{colors, print};

pub async fn tools(config: &Config) -> anyhow::Result<u8> {
    print::header("external tools");
    let locator = ToolLocator::from_env(config.paths.clone());
    let toolbox = Toolbox::discover_verified(&locator).await;

    print_toolbox(&toolbox);

    let missing = toolbox.missing();
    if missing.is_empty() {
        return Ok(EXIT_OK);
    }

    mprint!();
    let names: Vec<&str> = missing.iter().map(Tool::name).collect();
    print::print_status(format!(
        "Install the missing tools with `mtscan install {}`",
        names.join(" ")
    ));
    Ok(EXIT_PARTIAL)
}

/// One tree per tool with its role, state and path.
pub fn print_toolbox(toolbox: &Toolbox) {
    for (idx, tool) in Tool::ALL.iter().enumerate() {
        print::tree_head(idx, tool.name());

        let (status, path) = match toolbox.get(*tool) {
            Some(path) => (
                "ready".green().bold(),
                path.display().to_string().color(colors::PATH),
            ),
            None => ("missing".red().bold(), "-".color(colors::SEPARATOR)),
        };

        print::as_tree_one_level(vec![
            ("Role".to_string(), tool.role().normal()),
            ("Status".to_string(), status),
            ("Path".to_string(), path),
        ]);
    }
}
