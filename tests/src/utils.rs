use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use mtscan_common::config::Config;

/// Parses `-o <file>` out of the arguments, then runs `body`.
const ARG_LOOP: &str = r#"out=""
for arg in "$@"; do
    if [ "$prev" = "-o" ]; then out="$arg"; fi
    prev="$arg"
done
echo "$@" >> "$0.args"
"#;

/// Writes an executable shell script standing in for a scanner.
pub fn fake_tool(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, format!("#!/bin/sh\n{ARG_LOOP}{body}\n")).unwrap();
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
    path
}

/// Arguments each invocation of a fake tool received, one line per call.
pub fn recorded_args(tool: &Path) -> Vec<String> {
    let mut log = tool.as_os_str().to_owned();
    log.push(".args");
    fs::read_to_string(log)
        .unwrap_or_default()
        .lines()
        .map(str::to_string)
        .collect()
}

/// Configuration with no time limit and no retries.
pub fn quick_config() -> Config {
    let mut config = Config::default();
    config.general.timeout = 0;
    config.general.retry = 0;
    config
}

/// Polls until `pid` has exited. Zombies count as gone; without `/proc`
/// nothing can be checked and the process is assumed gone.
pub async fn process_exits(pid: &str) -> bool {
    let stat = format!("/proc/{}/stat", pid.trim());
    if !Path::new("/proc/self").exists() {
        return true;
    }
    for _ in 0..40 {
        let running = fs::read_to_string(&stat)
            .ok()
            .and_then(|s| s.rsplit_once(')').map(|(_, rest)| !rest.trim_start().starts_with('Z')))
            .unwrap_or(false);
        if !running {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    false
}

/// Reads a pid a script wrote, waiting briefly for it to appear.
pub async fn read_pid(path: &Path) -> String {
    for _ in 0..100 {
        let pid = fs::read_to_string(path).unwrap_or_default();
        if !pid.trim().is_empty() {
            return pid.trim().to_string();
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("{} was never written", path.display());
}
