//! # Configuration
//!
//! Settings live in a JSON file (`~/.mtscan.json` unless `--config-file` says
//! otherwise). Every field has a default, so a file only needs the keys it
//! wants to change; anything missing falls back to the values below.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::tool::{ScanMode, Tool};

pub const CONFIG_FILE_NAME: &str = ".mtscan.json";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub general: GeneralConfig,
    pub naabu: NaabuConfig,
    pub httpx: HttpxConfig,
    pub nuclei: NucleiConfig,
    /// Explicit executable locations, checked before any search.
    pub paths: ToolPaths,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Directory under which session directories are created.
    pub output_dir: PathBuf,
    /// Per-process timeout for scanner invocations, in seconds.
    pub timeout: u64,
    /// Additional attempts after a failed scanner invocation.
    pub retry: u32,
    pub verbose: bool,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("."),
            timeout: 3600,
            retry: 1,
            verbose: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NaabuConfig {
    pub ports: String,
    pub exclude_ports: Option<String>,
    /// Left unset, the port scanner falls back to connect mode.
    pub scan_mode: Option<ScanMode>,
    pub threads: Option<u32>,
    pub rate: Option<u32>,
    /// Per-probe timeout in milliseconds.
    pub timeout: Option<u32>,
    pub retries: Option<u32>,
}

impl Default for NaabuConfig {
    fn default() -> Self {
        Self {
            ports: "top-1000".to_string(),
            exclude_ports: None,
            scan_mode: None,
            threads: Some(25),
            rate: None,
            timeout: None,
            retries: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpxConfig {
    pub threads: Option<u32>,
    /// Request timeout in seconds.
    pub timeout: Option<u32>,
    pub follow_redirects: bool,
    pub status_code: bool,
    pub title: bool,
    pub tech_detect: bool,
    pub web_server: bool,
}

impl Default for HttpxConfig {
    fn default() -> Self {
        Self {
            threads: Some(50),
            timeout: Some(5),
            follow_redirects: true,
            status_code: true,
            title: true,
            tech_detect: true,
            web_server: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NucleiConfig {
    pub templates: Option<String>,
    pub tags: String,
    pub severity: String,
    pub exclude_tags: Option<String>,
    pub rate_limit: Option<u32>,
    pub bulk_size: Option<u32>,
    /// Request timeout in seconds.
    pub timeout: Option<u32>,
    pub retries: Option<u32>,
}

impl Default for NucleiConfig {
    fn default() -> Self {
        Self {
            templates: None,
            tags: "cve".to_string(),
            severity: "critical,high".to_string(),
            exclude_tags: Some("fuzz,dos".to_string()),
            rate_limit: Some(150),
            bulk_size: Some(25),
            timeout: Some(5),
            retries: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolPaths {
    pub naabu: Option<PathBuf>,
    pub httpx: Option<PathBuf>,
    pub nuclei: Option<PathBuf>,
}

impl ToolPaths {
    pub fn get(&self, tool: Tool) -> Option<&Path> {
        match tool {
            Tool::Naabu => self.naabu.as_deref(),
            Tool::Httpx => self.httpx.as_deref(),
            Tool::Nuclei => self.nuclei.as_deref(),
        }
    }
}

/// Where [`Config::resolve`] took its settings from.
#[derive(Debug)]
pub enum ConfigSource {
    Defaults,
    File(PathBuf),
    /// The file could not be used and the defaults apply.
    Invalid(anyhow::Error),
}

impl ConfigSource {
    pub fn report(&self) {
        match self {
            ConfigSource::Defaults => {}
            ConfigSource::File(path) => crate::info!("Loaded configuration from {}", path.display()),
            ConfigSource::Invalid(e) => crate::warn!("{e:#}. Using default configuration"),
        }
    }
}

impl Config {
    /// `~/.mtscan.json`, if a home directory can be determined.
    pub fn default_path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(CONFIG_FILE_NAME))
    }

    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        let config: Config = serde_json::from_str(&raw)
            .with_context(|| format!("invalid config file {}", path.display()))?;
        Ok(config)
    }

    /// Loads `path` (or the default location) and falls back to defaults.
    ///
    /// An explicitly requested file that cannot be loaded is reported; a
    /// missing default file is not. Nothing is logged, so the caller can read
    /// the settings before logging is set up and [`ConfigSource::report`]
    /// afterwards.
    pub fn resolve(path: Option<&Path>) -> (Self, ConfigSource) {
        let (path, explicit) = match path {
            Some(p) => (p.to_path_buf(), true),
            None => match Self::default_path() {
                Some(p) => (p, false),
                None => return (Self::default(), ConfigSource::Defaults),
            },
        };

        if !explicit && !path.exists() {
            return (Self::default(), ConfigSource::Defaults);
        }

        match Self::load(&path) {
            Ok(config) => (config, ConfigSource::File(path)),
            Err(e) => (Self::default(), ConfigSource::Invalid(e)),
        }
    }

    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        let raw = serde_json::to_string_pretty(self)?;
        fs::write(path, raw).with_context(|| format!("failed to write {}", path.display()))?;
        Ok(())
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

    #[test]
    fn partial_file_merges_over_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(
            &path,
            r#"{ "naabu": { "ports": "80,443", "scan_mode": "syn" }, "nuclei": { "tags": "rce" } }"#,
        )
        .unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.naabu.ports, "80,443");
        assert_eq!(config.naabu.scan_mode, Some(ScanMode::Syn));
        assert_eq!(config.naabu.threads, Some(25));
        assert_eq!(config.nuclei.tags, "rce");
        assert_eq!(config.nuclei.severity, "critical,high");
        assert_eq!(config.general.timeout, 3600);
    }

    #[test]
    fn invalid_explicit_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.json");
        fs::write(&path, "{ not json").unwrap();

        assert!(Config::load(&path).is_err());
        let (config, source) = Config::resolve(Some(&path));
        assert_eq!(config, Config::default());
        assert!(matches!(source, ConfigSource::Invalid(_)));
    }

    #[test]
    fn resolve_names_the_file_it_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{ "general": { "verbose": true } }"#).unwrap();

        let (config, source) = Config::resolve(Some(&path));
        assert!(config.general.verbose);
        assert!(matches!(source, ConfigSource::File(p) if p == path));

        let (config, source) = Config::resolve(Some(&dir.path().join("missing.json")));
        assert_eq!(config, Config::default());
        assert!(matches!(source, ConfigSource::Invalid(_)));
    }

    #[test]
    fn save_then_load_preserves_paths() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        let mut config = Config::default();
        config.paths.nuclei = Some(PathBuf::from("/opt/nuclei/nuclei"));

        config.save(&path).unwrap();
        let loaded = Config::load(&path).unwrap();
        assert_eq!(loaded.paths.get(Tool::Nuclei), Some(Path::new("/opt/nuclei/nuclei")));
        assert_eq!(loaded.paths.get(Tool::Naabu), None);
    }
}
