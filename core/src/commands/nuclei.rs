//! Vulnerability scanner invocation.

use std::collections::BTreeMap;
use std::path::PathBuf;

use mtscan_common::config::NucleiConfig;
use mtscan_common::error::RequestError;
use mtscan_common::request::TargetInput;

use super::{non_blank, push_path, push_switch, push_value};

const HOST_FLAG: &str = "-u";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VulnScan {
    pub target: TargetInput,
    /// Template file or directory.
    pub templates: Option<String>,
    pub tags: Option<String>,
    pub severity: Option<String>,
    pub exclude_tags: Option<String>,
    pub output: Option<PathBuf>,
    pub jsonl: bool,
    pub silent: bool,
    pub store_responses: bool,
    pub responses_dir: Option<PathBuf>,
    /// Raw `Name: value` headers, one `-H` each.
    pub headers: Vec<String>,
    /// Template variables, one `-var key=value` each.
    pub variables: BTreeMap<String, String>,
    pub rate_limit: Option<u32>,
    pub bulk_size: Option<u32>,
    /// Request timeout in seconds.
    pub timeout: Option<u32>,
    pub retries: Option<u32>,
    pub extra_args: Vec<String>,
}

impl VulnScan {
    pub fn new(target: TargetInput) -> Self {
        Self {
            target,
            templates: None,
            tags: None,
            severity: None,
            exclude_tags: None,
            output: None,
            jsonl: false,
            silent: false,
            store_responses: false,
            responses_dir: None,
            headers: Vec::new(),
            variables: BTreeMap::new(),
            rate_limit: None,
            bulk_size: None,
            timeout: None,
            retries: None,
            extra_args: Vec::new(),
        }
    }

    pub fn from_config(target: TargetInput, config: &NucleiConfig) -> Self {
        Self {
            templates: config.templates.clone(),
            tags: Some(config.tags.clone()),
            severity: Some(config.severity.clone()),
            exclude_tags: config.exclude_tags.clone(),
            rate_limit: config.rate_limit,
            bulk_size: config.bulk_size,
            timeout: config.timeout,
            retries: config.retries,
            ..Self::new(target)
        }
    }

    pub fn validate(&self) -> Result<(), RequestError> {
        self.target.validate()
    }

    pub fn to_args(&self) -> Vec<String> {
        let mut args = Vec::new();

        self.target.push_args(HOST_FLAG, &mut args);
        push_value(&mut args, "-t", non_blank(&self.templates));
        push_value(&mut args, "-tags", non_blank(&self.tags));
        push_value(&mut args, "-severity", non_blank(&self.severity));
        push_value(&mut args, "-exclude-tags", non_blank(&self.exclude_tags));
        push_path(&mut args, "-o", self.output.as_deref());
        push_switch(&mut args, "-jsonl", self.jsonl);
        push_switch(&mut args, "-silent", self.silent);
        push_switch(&mut args, "-store-resp", self.store_responses);
        push_path(&mut args, "-store-resp-dir", self.responses_dir.as_deref());

        for header in &self.headers {
            push_value(&mut args, "-H", Some(header));
        }
        for (key, value) in &self.variables {
            push_value(&mut args, "-var", Some(format!("{key}={value}")));
        }

        push_value(&mut args, "-rate-limit", self.rate_limit);
        push_value(&mut args, "-bulk-size", self.bulk_size);
        push_value(&mut args, "-timeout", self.timeout);
        push_value(&mut args, "-retries", self.retries);
        args.extend(self.extra_args.iter().cloned());

        args
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
