mod commands;
mod terminal;

use std::process::ExitCode;

use commands::menu::{self, MenuContext};
use commands::{CommandLine, Commands, EXIT_ERROR, EXIT_INTERRUPTED, install, report, scan, tools};
use mtscan_common::config::Config;
use mtscan_common::{error, warn};
use terminal::{logging, print};
use tracing::debug;

#[tokio::main]
async fn main() -> ExitCode {
    let mut commands = CommandLine::parse_args();

    let (config, source) = Config::resolve(commands.config_file.as_deref());
    let verbose = commands.verbose_with(&config);
    logging::init(verbose);
    source.report();

    let code = match commands.take_command() {
        Commands::Menu => {
            let ctx = MenuContext {
                config,
                config_file: commands.config_file,
                verbose,
            };
            let code = finish(menu::menu(&ctx).await);
            // A prompt may still be blocked on stdin, which would stall runtime shutdown.
            std::process::exit(code.into());
        }
        Commands::Scan(args) => {
            print::banner();
            interruptible(scan::scan(args, config, verbose)).await
        }
        Commands::Tools => interruptible(tools::tools(&config)).await,
        Commands::Install { tools, configure_shell } => {
            interruptible(install::install(tools, configure_shell, &config)).await
        }
        Commands::Report { dir, target } => {
            interruptible(async { report::report(&dir, &target) }).await
        }
    };

    ExitCode::from(code)
}

/// Runs a subcommand until it finishes or Ctrl+C arrives.
async fn interruptible<F>(run: F) -> u8
where
    F: Future<Output = anyhow::Result<u8>>,
{
    tokio::select! {
        result = run => finish(result),
        _ = tokio::signal::ctrl_c() => {
            print::print("");
            warn!("Interrupted");
            EXIT_INTERRUPTED
        }
    }
}

fn finish(result: anyhow::Result<u8>) -> u8 {
    match result {
        Ok(code) => code,
        Err(e) => {
            error!("{e:#}");
            debug!("{e:?}");
            EXIT_ERROR
        }
    }
}
