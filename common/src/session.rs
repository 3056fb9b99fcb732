//! # Scan Sessions
//!
//! A session is the directory that groups everything one scan run produces.
//! File names inside it are fixed so the menu, the report command and later
//! stages can find each other's output without any bookkeeping.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::{DateTime, Local};

pub const PORTS_JSON: &str = "ports.json";
pub const PORTS_FILE: &str = "ports.txt";
pub const HTTP_SERVICES_JSON: &str = "http_services.json";
pub const HTTP_SERVICES_FILE: &str = "http_services.txt";
pub const VULNERABILITIES_FILE: &str = "vulnerabilities.jsonl";
pub const RESPONSES_DIR: &str = "nuclei_responses";
pub const ERROR_LOG: &str = "errors.log";
pub const SUMMARY_FILE: &str = "summary.txt";
pub const REPORT_FILE: &str = "report.md";
pub const RESULTS_FILE: &str = "results.json";

/// Prefix of automatically named session directories.
pub const SESSION_PREFIX: &str = "results_";

const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

#[derive(Debug, Clone)]
pub struct Session {
    root: PathBuf,
}

impl Session {
    /// Creates `results_<target>_<timestamp>` under `base`.
    pub fn create(base: &Path, target: &str) -> anyhow::Result<Self> {
        Self::create_at(base, target, Local::now())
    }

    pub fn create_at(base: &Path, target: &str, timestamp: DateTime<Local>) -> anyhow::Result<Self> {
        let root = base.join(directory_name(target, timestamp));
        Self::open(&root)
    }

    /// Uses `dir` as the session directory, creating it if needed.
    pub fn open(dir: &Path) -> anyhow::Result<Self> {
        fs::create_dir_all(dir)
            .with_context(|| format!("failed to create output directory {}", dir.display()))?;
        Ok(Self {
            root: dir.to_path_buf(),
        })
    }

    /// Attaches to a directory left behind by an earlier run.
    pub fn existing(dir: &Path) -> anyhow::Result<Self> {
        anyhow::ensure!(dir.is_dir(), "results directory not found: {}", dir.display());
        Ok(Self {
            root: dir.to_path_buf(),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Raw port scanner records.
    pub fn ports_json(&self) -> PathBuf {
        self.root.join(PORTS_JSON)
    }

    /// `host:port` per line; input of httpx.
    pub fn ports_file(&self) -> PathBuf {
        self.root.join(PORTS_FILE)
    }

    pub fn http_services_json(&self) -> PathBuf {
        self.root.join(HTTP_SERVICES_JSON)
    }

    pub fn http_services_file(&self) -> PathBuf {
        self.root.join(HTTP_SERVICES_FILE)
    }

    pub fn vulnerabilities_file(&self) -> PathBuf {
        self.root.join(VULNERABILITIES_FILE)
    }

    pub fn responses_dir(&self) -> PathBuf {
        self.root.join(RESPONSES_DIR)
    }

    pub fn error_log(&self) -> PathBuf {
        self.root.join(ERROR_LOG)
    }

    pub fn summary_file(&self) -> PathBuf {
        self.root.join(SUMMARY_FILE)
    }

    pub fn report_file(&self) -> PathBuf {
        self.root.join(REPORT_FILE)
    }

    pub fn results_file(&self) -> PathBuf {
        self.root.join(RESULTS_FILE)
    }

    /// Appends a timestamped line to the session's error log.
    pub fn log_error(&self, message: &str) -> anyhow::Result<()> {
        let path = self.error_log();
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("failed to open {}", path.display()))?;
        writeln!(file, "[{}] {message}", Local::now().format("%Y-%m-%d %H:%M:%S"))?;
        Ok(())
    }
}

/// Name of an automatically created session directory.
pub fn directory_name(target: &str, timestamp: DateTime<Local>) -> String {
    format!(
        "{SESSION_PREFIX}{}_{}",
        sanitize_target(target),
        timestamp.format(TIMESTAMP_FORMAT)
    )
}

/// Turns a target into something usable inside a directory name.
pub fn sanitize_target(target: &str) -> String {
    let trimmed = target
        .trim()
        .trim_start_matches("https://")
        .trim_start_matches("http://");

    trimmed
        .chars()
        .map(|c| match c {
            '/' | ':' | '\\' | ' ' => '_',
            c => c,
        })
        .collect::<String>()
        .trim_end_matches('_')
        .to_string()
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
    use chrono::TimeZone;

    #[test]
    fn sanitize_strips_scheme_and_separators() {
        assert_eq!(sanitize_target("https://example.com/app/"), "example.com_app");
        assert_eq!(sanitize_target("http://10.0.0.1:8080"), "10.0.0.1_8080");
        assert_eq!(sanitize_target("192.168.1.0/24"), "192.168.1.0_24");
    }

    #[test]
    fn directory_name_is_timestamped() {
        let ts = Local.with_ymd_and_hms(2024, 3, 9, 14, 5, 7).unwrap();
        assert_eq!(
            directory_name("example.com", ts),
            "results_example.com_20240309_140507"
        );
    }

    #[test]
    fn create_lays_out_fixed_file_names() {
        let base = tempfile::tempdir().unwrap();
        let session = Session::create(base.path(), "example.com").unwrap();

        assert!(session.root().is_dir());
        assert!(session.root().starts_with(base.path()));
        assert_eq!(session.ports_file(), session.root().join("ports.txt"));
        assert_eq!(session.summary_file(), session.root().join("summary.txt"));
    }

    #[test]
    fn log_error_appends_lines() {
        let dir = tempfile::tempdir().unwrap();
        let session = Session::open(dir.path()).unwrap();
        session.log_error("port scan failed").unwrap();
        session.log_error("http probe failed").unwrap();

        let log = std::fs::read_to_string(session.error_log()).unwrap();
        assert_eq!(log.lines().count(), 2);
        assert!(log.contains("http probe failed"));
    }

    #[test]
    fn existing_requires_directory() {
        assert!(Session::existing(Path::new("/no/such/results_dir")).is_err());
    }
}
