//! # Tool Locator
//!
//! Resolves where the external scanners live. Go installs into `~/go/bin`,
//! distro packages into `/usr/bin`, snaps into `/snap/bin`, and none of these
//! is guaranteed to be on `PATH` for the shell `mtscan` was started from, so
//! the locator walks a fixed list of directories after the search path.

use std::env;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::Duration;

use mtscan_common::config::ToolPaths;
use mtscan_common::tool::Tool;
use tracing::debug;

use crate::runner::{CommandSpec, ProcessRunner, RunnerConfig};

const VERIFY_TIMEOUT: Duration = Duration::from_secs(5);

/// Install directories below the home directory, searched after `PATH`.
const HOME_DIRS: &[&str] = &["go/bin"];
const ROOT_GO_BIN: &str = "/root/go/bin";
const HOME_LOCAL_BIN: &str = ".local/bin";
const SYSTEM_DIRS: &[&str] = &["/usr/local/bin", "/usr/bin", "/snap/bin", "/usr/local/go/bin"];

#[derive(Debug, Clone)]
pub struct ToolLocator {
    search_path: Option<OsString>,
    home: Option<PathBuf>,
    overrides: ToolPaths,
}

impl ToolLocator {
    /// Locator for the current process environment.
    pub fn from_env(overrides: ToolPaths) -> Self {
        Self::new(env::var_os("PATH"), dirs::home_dir(), overrides)
    }

    pub fn new(search_path: Option<OsString>, home: Option<PathBuf>, overrides: ToolPaths) -> Self {
        Self {
            search_path,
            home,
            overrides,
        }
    }

    /// Directories searched after an explicit path, in priority order.
    pub fn search_dirs(&self) -> Vec<PathBuf> {
        let mut dirs: Vec<PathBuf> = Vec::new();

        if let Some(path) = &self.search_path {
            dirs.extend(env::split_paths(path).filter(|p| !p.as_os_str().is_empty()));
        }

        if let Some(home) = &self.home {
            dirs.extend(HOME_DIRS.iter().map(|d| home.join(d)));
        }
        dirs.push(PathBuf::from(ROOT_GO_BIN));
        if let Some(home) = &self.home {
            dirs.push(home.join(HOME_LOCAL_BIN));
        }
        dirs.extend(SYSTEM_DIRS.iter().map(PathBuf::from));

        dirs
    }

    /// First executable for `tool`, or `None` if it is not installed.
    pub fn locate(&self, tool: Tool) -> Option<PathBuf> {
        self.candidates(tool).into_iter().next()
    }

    /// Every executable that could be `tool`, best candidate first.
    pub fn candidates(&self, tool: Tool) -> Vec<PathBuf> {
        let mut found = Vec::new();

        if let Some(explicit) = self.overrides.get(tool) {
            if is_executable(explicit) {
                found.push(absolute(explicit));
            } else {
                debug!("Configured path for {tool} is not executable: {}", explicit.display());
            }
        }

        for dir in self.search_dirs() {
            for name in tool.binary_names() {
                let candidate = dir.join(executable_name(name));
                if is_executable(&candidate) {
                    let candidate = absolute(&candidate);
                    if !found.contains(&candidate) {
                        found.push(candidate);
                    }
                }
            }
        }

        found
    }

    /// Looks up an arbitrary program (such as `go`) the same way.
    pub fn find_program(&self, name: &str) -> Option<PathBuf> {
        self.search_dirs()
            .into_iter()
            .map(|dir| dir.join(executable_name(name)))
            .find(|candidate| is_executable(candidate))
            .map(|candidate| absolute(&candidate))
    }

    /// First candidate that answers one of the tool's version flags.
    pub async fn locate_verified(&self, tool: Tool) -> Option<PathBuf> {
        for candidate in self.candidates(tool) {
            if verify(tool, &candidate).await {
                return Some(candidate);
            }
            debug!("{} did not respond like {tool}", candidate.display());
        }
        None
    }
}

/// Runs `path` with each of the tool's version flags until one exits cleanly.
pub async fn verify(tool: Tool, path: &Path) -> bool {
    let runner = ProcessRunner::new(
        RunnerConfig::default()
            .with_timeout(Some(VERIFY_TIMEOUT))
            .with_retry(0)
            .silent(true),
    );

    for flag in tool.version_flags() {
        let spec = CommandSpec::program(path, vec![flag.to_string()]);
        if runner.run(&spec).await {
            return true;
        }
    }
    false
}

/// Resolved locations of all three tools.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Toolbox {
    pub naabu: Option<PathBuf>,
    pub httpx: Option<PathBuf>,
    pub nuclei: Option<PathBuf>,
}

impl Toolbox {
    pub fn discover(locator: &ToolLocator) -> Self {
        let mut toolbox = Self::default();
        for tool in Tool::ALL {
            toolbox.set(tool, locator.locate(tool));
        }
        toolbox
    }

    pub async fn discover_verified(locator: &ToolLocator) -> Self {
        let mut toolbox = Self::default();
        for tool in Tool::ALL {
            toolbox.set(tool, locator.locate_verified(tool).await);
        }
        toolbox
    }

    pub fn get(&self, tool: Tool) -> Option<&Path> {
        match tool {
            Tool::Naabu => self.naabu.as_deref(),
            Tool::Httpx => self.httpx.as_deref(),
            Tool::Nuclei => self.nuclei.as_deref(),
        }
    }

    pub fn set(&mut self, tool: Tool, path: Option<PathBuf>) {
        match tool {
            Tool::Naabu => self.naabu = path,
            Tool::Httpx => self.httpx = path,
            Tool::Nuclei => self.nuclei = path,
        }
    }

    pub fn missing(&self) -> Vec<Tool> {
        Tool::ALL
            .into_iter()
            .filter(|tool| self.get(*tool).is_none())
            .collect()
    }
}

fn executable_name(name: &str) -> String {
    format!("{name}{}", env::consts::EXE_SUFFIX)
}

fn absolute(path: &Path) -> PathBuf {
    std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf())
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;

    match path.metadata() {
        Ok(meta) => meta.is_file() && meta.permissions().mode() & 0o111 != 0,
        Err(_) => false,
    }
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
