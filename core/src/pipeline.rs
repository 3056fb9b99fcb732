//! # Scan Pipeline
//!
//! Drives the three scanners in a fixed order, feeding each stage's result
//! file to the next:
//!
//! ```text
//! PortScan ─ ports.json ─► ports.txt ─► HttpProbe ─ http_services.txt ─► VulnScan ─► Summary
//! ```
//!
//! A failing stage never stops the run. The port scan and the HTTP probe
//! fall back to the well-known web ports so the vulnerability scan always has
//! something to work on, every failure is appended to the session's error log,
//! and the summary is written no matter what happened before it.

use std::fs;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::Context;
use mtscan_common::config::Config;
use mtscan_common::request::TargetInput;
use mtscan_common::session::Session;
use mtscan_common::stage::Stage;
use mtscan_common::tool::ScanMode;
use mtscan_common::{error, info, success, warn};
use tracing::{Instrument, debug, info_span};

use crate::commands::{HttpProbe, PortScan, VulnScan};
use crate::locator::Toolbox;
use crate::output;
use crate::runner::{CommandSpec, ProcessRunner, RunnerConfig};
use crate::report;
use crate::summary::Summary;

const FALLBACK_PORTS: [u16; 2] = [80, 443];
const FALLBACK_SCHEMES: [&str; 2] = ["http", "https"];

/// Which stages a run covers. The summary is always included.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Scope {
    #[default]
    Full,
    /// One stage against the raw target.
    Only(Stage),
}

impl Scope {
    pub fn includes(self, stage: Stage) -> bool {
        match self {
            Scope::Full => true,
            Scope::Only(only) => stage == only || stage == Stage::Summary,
        }
    }
}

/// Per-run overrides of the configuration file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanOptions {
    pub ports: Option<String>,
    pub templates: Option<String>,
    pub tags: Option<String>,
    pub severity: Option<String>,
    pub scan_mode: Option<ScanMode>,
    pub verbose: bool,
    pub scope: Scope,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StageStatus {
    Succeeded,
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageOutcome {
    pub stage: Stage,
    pub status: StageStatus,
    /// Default input was substituted for the next stage.
    pub fallback: bool,
    pub elapsed: Duration,
}

impl StageOutcome {
    pub fn succeeded(&self) -> bool {
        self.status == StageStatus::Succeeded
    }
}

#[derive(Debug, Clone)]
pub struct PipelineReport {
    pub target: String,
    pub session_dir: PathBuf,
    pub stages: Vec<StageOutcome>,
    pub summary: Option<Summary>,
    pub elapsed: Duration,
}

impl PipelineReport {
    /// Every stage succeeded and the summary was written.
    pub fn is_clean(&self) -> bool {
        self.summary.is_some() && self.stages.iter().all(StageOutcome::succeeded)
    }

    pub fn failed_stages(&self) -> Vec<Stage> {
        self.stages
            .iter()
            .filter(|outcome| !outcome.succeeded())
            .map(|outcome| outcome.stage)
            .collect()
    }
}

pub struct Pipeline {
    target: String,
    session: Session,
    toolbox: Toolbox,
    config: Config,
    options: ScanOptions,
    runner: RunnerConfig,
}

impl Pipeline {
    pub fn new(
        target: impl Into<String>,
        session: Session,
        toolbox: Toolbox,
        config: Config,
        options: ScanOptions,
    ) -> Self {
        let timeout = match config.general.timeout {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        };
        let runner = RunnerConfig::default()
            .with_timeout(timeout)
            .with_retry(config.general.retry);

        Self {
            target: target.into(),
            session,
            toolbox,
            config,
            options,
            runner,
        }
    }

    /// Replaces the execution policy used for every scanner invocation.
    pub fn with_runner(mut self, runner: RunnerConfig) -> Self {
        self.runner = runner;
        self
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub async fn run(&self) -> PipelineReport {
        let started = Instant::now();
        let mut stages = Vec::new();
        let mut summary = None;
        let mut current = Some(Stage::FIRST);

        while let Some(stage) = current {
            current = stage.next();
            if !self.options.scope.includes(stage) {
                continue;
            }

            if stage == Stage::Summary {
                summary = self.summarize();
                continue;
            }

            let span = info_span!("stage", stage = stage.short_name(), indicatif.pb_show = true);
            let outcome = self.run_stage(stage).instrument(span).await;
            stages.push(outcome);
        }

        PipelineReport {
            target: self.target.clone(),
            session_dir: self.session.root().to_path_buf(),
            stages,
            summary,
            elapsed: started.elapsed(),
        }
    }

    async fn run_stage(&self, stage: Stage) -> StageOutcome {
        let started = Instant::now();
        info!("Starting {stage} against {}", self.target);

        let status = match self.execute(stage).await {
            Ok(()) => {
                success!("{} finished in {:.2}s", capitalize(stage.label()), started.elapsed().as_secs_f64());
                StageStatus::Succeeded
            }
            Err(reason) => {
                warn!("{} failed: {reason}", capitalize(stage.label()));
                self.record_failure(&format!("{stage} failed: {reason}"));
                StageStatus::Failed(reason)
            }
        };

        let fallback = match self.prepare_next_input(stage) {
            Ok(applied) => applied,
            Err(e) => {
                error!("Could not prepare input after {stage}: {e:#}");
                self.record_failure(&format!("{stage} post-processing failed: {e:#}"));
                false
            }
        };

        StageOutcome {
            stage,
            status,
            fallback,
            elapsed: started.elapsed(),
        }
    }

    async fn execute(&self, stage: Stage) -> Result<(), String> {
        let Some(tool) = stage.tool() else {
            return Ok(());
        };
        let Some(path) = self.toolbox.get(tool) else {
            return Err(format!("{tool} is not installed (try `mtscan install {tool}`)"));
        };

        let (args, use_sudo) = match stage {
            Stage::PortScan => {
                let request = self.port_scan();
                request.validate().map_err(|e| e.to_string())?;
                let privileged = request
                    .effective_scan_mode()
                    .is_some_and(ScanMode::needs_privileges);
                (request.to_args(), privileged)
            }
            Stage::HttpProbe => {
                let request = self.http_probe();
                request.validate().map_err(|e| e.to_string())?;
                (request.to_args(), false)
            }
            Stage::VulnScan => {
                let request = self.vuln_scan();
                request.validate().map_err(|e| e.to_string())?;
                (request.to_args(), false)
            }
            Stage::Summary => return Ok(()),
        };

        let runner = ProcessRunner::new(self.runner.clone().with_sudo(use_sudo));
        if runner.run(&CommandSpec::program(path, args)).await {
            Ok(())
        } else {
            Err(format!("{tool} did not complete successfully"))
        }
    }

    fn input_for(&self, stage: Stage) -> TargetInput {
        match (self.options.scope, stage) {
            (Scope::Full, Stage::HttpProbe) => TargetInput::list(self.session.ports_file()),
            (Scope::Full, Stage::VulnScan) => TargetInput::list(self.session.http_services_file()),
            _ => TargetInput::host(self.target.as_str()),
        }
    }

    fn port_scan(&self) -> PortScan {
        let mut request = PortScan::from_config(self.input_for(Stage::PortScan), &self.config.naabu);
        if let Some(ports) = &self.options.ports {
            request.ports = Some(ports.clone());
        }
        if self.options.scan_mode.is_some() {
            request.scan_mode = self.options.scan_mode;
        }
        request.output = Some(self.session.ports_json());
        request.json = true;
        request.silent = !self.options.verbose;
        request
    }

    fn http_probe(&self) -> HttpProbe {
        let mut request = HttpProbe::from_config(self.input_for(Stage::HttpProbe), &self.config.httpx);
        request.output = Some(self.session.http_services_json());
        request.json = true;
        request.silent = !self.options.verbose;
        request
    }

    fn vuln_scan(&self) -> VulnScan {
        let mut request = VulnScan::from_config(self.input_for(Stage::VulnScan), &self.config.nuclei);
        if self.options.templates.is_some() {
            request.templates = self.options.templates.clone();
        }
        if self.options.tags.is_some() {
            request.tags = self.options.tags.clone();
        }
        if self.options.severity.is_some() {
            request.severity = self.options.severity.clone();
        }
        request.output = Some(self.session.vulnerabilities_file());
        request.jsonl = true;
        request.store_responses = true;
        request.responses_dir = Some(self.session.responses_dir());
        request.silent = !self.options.verbose;
        request
    }

    /// Writes the next stage's input file. Returns whether defaults were used.
    fn prepare_next_input(&self, stage: Stage) -> anyhow::Result<bool> {
        let chained = self.options.scope == Scope::Full;
        match stage {
            Stage::PortScan => self.write_port_list(chained),
            Stage::HttpProbe => self.write_service_urls(chained),
            _ => Ok(false),
        }
    }

    /// Derives `ports.txt` from the scanner's JSON records.
    fn write_port_list(&self, allow_fallback: bool) -> anyhow::Result<bool> {
        let records = output::read_json_records(&self.session.ports_json()).unwrap_or_default();
        let endpoints = output::port_endpoints(&records);
        let path = self.session.ports_file();

        if !endpoints.is_empty() {
            info!("Port scan reported {} open port(s)", endpoints.len());
            let mut body = endpoints.join("\n");
            body.push('\n');
            fs::write(&path, body).with_context(|| format!("failed to write {}", path.display()))?;
            return Ok(false);
        }

        if !allow_fallback {
            return Ok(false);
        }

        warn!("No open ports found, falling back to ports 80 and 443");
        fs::write(&path, fallback_ports(&self.target))
            .with_context(|| format!("failed to write {}", path.display()))?;
        Ok(true)
    }

    fn write_service_urls(&self, allow_fallback: bool) -> anyhow::Result<bool> {
        let records = output::read_json_records(&self.session.http_services_json()).unwrap_or_default();
        let urls = output::service_urls(&records);
        let path = self.session.http_services_file();

        if !urls.is_empty() {
            info!("HTTP probe found {} live service(s)", urls.len());
            let mut body = urls.join("\n");
            body.push('\n');
            fs::write(&path, body).with_context(|| format!("failed to write {}", path.display()))?;
            return Ok(false);
        }

        if !allow_fallback {
            return Ok(false);
        }

        warn!("No HTTP services found, falling back to http and https on the target");
        fs::write(&path, fallback_urls(&self.target))
            .with_context(|| format!("failed to write {}", path.display()))?;
        Ok(true)
    }

    fn summarize(&self) -> Option<Summary> {
        match report::generate(&self.session, &self.target) {
            Ok(summary) => {
                success!("Summary report generated: {}", self.session.summary_file().display());
                info!("Detailed report: {}", self.session.report_file().display());
                Some(summary)
            }
            Err(e) => {
                error!("Could not generate summary: {e:#}");
                self.record_failure(&format!("summary failed: {e:#}"));
                None
            }
        }
    }

    fn record_failure(&self, message: &str) {
        if let Err(e) = self.session.log_error(message) {
            debug!("Could not append to error log: {e:#}");
        }
    }
}

/// Host part of a target given as a host, `host:port` or URL.
pub fn bare_host(target: &str) -> &str {
    strip_port(authority(target))
}

/// `host[:port]` of a target, without scheme or path.
pub fn authority(target: &str) -> &str {
    let target = target.trim();
    let rest = target.split_once("://").map_or(target, |(_, rest)| rest);
    rest.split(['/', '?', '#']).next().unwrap_or(rest)
}

fn strip_port(authority: &str) -> &str {
    if let Some(inner) = authority.strip_prefix('[') {
        return match inner.find(']') {
            Some(end) => &authority[..end + 2],
            None => authority,
        };
    }
    match authority.rsplit_once(':') {
        Some((host, port))
            if !host.contains(':') && !port.is_empty() && port.bytes().all(|b| b.is_ascii_digit()) =>
        {
            host
        }
        _ => authority,
    }
}

pub fn fallback_ports(target: &str) -> String {
    let host = bare_host(target);
    let host = if host.contains(':') && !host.starts_with('[') {
        format!("[{host}]")
    } else {
        host.to_string()
    };
    FALLBACK_PORTS
        .iter()
        .map(|port| format!("{host}:{port}\n"))
        .collect()
}

pub fn fallback_urls(target: &str) -> String {
    let authority = authority(target);
    FALLBACK_SCHEMES
        .iter()
        .map(|scheme| format!("{scheme}://{authority}\n"))
        .collect()
}

fn capitalize(label: &str) -> String {
    let mut chars = label.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
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

    fn pipeline(dir: &std::path::Path, scope: Scope) -> Pipeline {
        let session = Session::open(dir).unwrap();
        let options = ScanOptions {
            scope,
            ..ScanOptions::default()
        };
        Pipeline::new("example.com", session, Toolbox::default(), Config::default(), options)
            .with_runner(RunnerConfig::default().with_retry(0).silent(true))
    }

    #[test]
    fn fallbacks_use_the_bare_host() {
        assert_eq!(fallback_ports("example.com"), "example.com:80\nexample.com:443\n");
        assert_eq!(
            fallback_urls("https://example.com/login"),
            "http://example.com\nhttps://example.com\n"
        );
    }

    #[test]
    fn explicit_ports_are_stripped_from_port_fallback() {
        assert_eq!(fallback_ports("example.com:8080"), "example.com:80\nexample.com:443\n");
        assert_eq!(fallback_ports("https://example.com:8443/x"), "example.com:80\nexample.com:443\n");
        assert_eq!(fallback_ports("[::1]:8080"), "[::1]:80\n[::1]:443\n");
        assert_eq!(fallback_ports("::1"), "[::1]:80\n[::1]:443\n");
    }

    #[test]
    fn url_fallback_keeps_an_explicit_port() {
        assert_eq!(
            fallback_urls("https://example.com:8443/x?q=1"),
            "http://example.com:8443\nhttps://example.com:8443\n"
        );
        assert_eq!(fallback_urls("[::1]:8080"), "http://[::1]:8080\nhttps://[::1]:8080\n");
        assert_eq!(bare_host("https://user.example:8443/path"), "user.example");
        assert_eq!(bare_host("[fe80::1]"), "[fe80::1]");
    }

    #[test]
    fn port_list_is_derived_from_scanner_json() {
        let dir = tempfile::tempdir().unwrap();
        let p = pipeline(dir.path(), Scope::Only(Stage::PortScan));
        fs::write(
            dir.path().join("ports.json"),
            "{\"host\":\"example.com\",\"port\":22}\n{\"host\":\"example.com\",\"port\":8080}\n",
        )
        .unwrap();

        assert!(!p.write_port_list(false).unwrap());
        let ports = fs::read_to_string(dir.path().join("ports.txt")).unwrap();
        assert_eq!(ports, "example.com:22\nexample.com:8080\n");
    }

    #[test]
    fn scoped_port_scan_without_results_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let p = pipeline(dir.path(), Scope::Only(Stage::PortScan));

        assert!(!p.write_port_list(false).unwrap());
        assert!(!dir.path().join("ports.txt").exists());
    }

    #[test]
    fn scoped_run_includes_summary_only_besides_its_stage() {
        let scope = Scope::Only(Stage::HttpProbe);
        assert!(scope.includes(Stage::HttpProbe));
        assert!(scope.includes(Stage::Summary));
        assert!(!scope.includes(Stage::PortScan));
        assert!(!scope.includes(Stage::VulnScan));
    }

    #[tokio::test]
    async fn missing_tools_still_produce_fallbacks_and_summary() {
        let dir = tempfile::tempdir().unwrap();
        let report = pipeline(dir.path(), Scope::Full).run().await;

        assert_eq!(report.failed_stages(), vec![Stage::PortScan, Stage::HttpProbe, Stage::VulnScan]);
        assert!(report.summary.is_some());
        assert!(!report.is_clean());

        let ports = fs::read_to_string(dir.path().join("ports.txt")).unwrap();
        assert_eq!(ports, "example.com:80\nexample.com:443\n");
        let urls = fs::read_to_string(dir.path().join("http_services.txt")).unwrap();
        assert_eq!(urls, "http://example.com\nhttps://example.com\n");

        let log = fs::read_to_string(dir.path().join("errors.log")).unwrap();
        assert_eq!(log.lines().count(), 3);
        assert!(dir.path().join("summary.txt").is_file());
        assert!(dir.path().join("report.md").is_file());
        assert!(dir.path().join("results.json").is_file());
    }

    #[tokio::test]
    async fn scoped_run_targets_the_raw_host_without_fallbacks() {
        let dir = tempfile::tempdir().unwrap();
        let p = pipeline(dir.path(), Scope::Only(Stage::VulnScan));

        assert_eq!(p.input_for(Stage::VulnScan), TargetInput::host("example.com"));

        let report = p.run().await;
        assert_eq!(report.stages.len(), 1);
        assert_eq!(report.stages[0].stage, Stage::VulnScan);
        assert!(!dir.path().join("ports.txt").exists());
        assert!(report.summary.is_some());
    }

    #[test]
    fn full_run_chains_result_files() {
        let dir = tempfile::tempdir().unwrap();
        let p = pipeline(dir.path(), Scope::Full);

        assert_eq!(p.input_for(Stage::PortScan), TargetInput::host("example.com"));
        assert_eq!(p.input_for(Stage::HttpProbe), TargetInput::list(dir.path().join("ports.txt")));
        assert_eq!(
            p.input_for(Stage::VulnScan),
            TargetInput::list(dir.path().join("http_services.txt"))
        );
    }

    #[test]
    fn cli_overrides_win_over_config() {
        let dir = tempfile::tempdir().unwrap();
        let mut p = pipeline(dir.path(), Scope::Full);
        p.options.ports = Some("22,80".into());
        p.options.tags = Some("rce".into());
        p.options.scan_mode = Some(ScanMode::Syn);

        let naabu = p.port_scan();
        assert_eq!(naabu.ports.as_deref(), Some("22,80"));
        assert_eq!(naabu.effective_scan_mode(), Some(ScanMode::Syn));

        let nuclei = p.vuln_scan();
        assert_eq!(nuclei.tags.as_deref(), Some("rce"));
        assert_eq!(nuclei.severity.as_deref(), Some("critical,high"));
        assert!(nuclei.store_responses);
    }
}
