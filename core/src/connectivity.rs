//! Reachability note shown before a scan starts.
//!
//! Many hosts drop ICMP, so the answer is informational only and never stops
//! the scan.

use std::time::Duration;

use mtscan_common::info;

use crate::pipeline::bare_host;
use crate::runner::{CommandSpec, ProcessRunner, RunnerConfig};

/// Upper bound on the whole check, including name resolution.
pub const PING_TIMEOUT: Duration = Duration::from_secs(5);

/// A single echo request with a two second reply window.
pub fn ping_command(target: &str) -> CommandSpec {
    let host = bare_host(target).trim_start_matches('[').trim_end_matches(']');
    if cfg!(windows) {
        CommandSpec::argv(["ping", "-n", "1", "-w", "2000", host])
    } else {
        CommandSpec::argv(["ping", "-c", "1", "-W", "2", host])
    }
}

pub async fn reachable(target: &str) -> bool {
    let runner = ProcessRunner::new(
        RunnerConfig::default()
            .with_retry(0)
            .with_timeout(Some(PING_TIMEOUT))
            .silent(true),
    );
    runner.run(&ping_command(target)).await
}

/// Logs whether `target` answers ping.
pub async fn note_reachability(target: &str) {
    let host = bare_host(target);
    if reachable(target).await {
        info!("{host} responds to ping");
    } else {
        info!("{host} did not answer ping (ICMP may be filtered), scanning anyway");
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
