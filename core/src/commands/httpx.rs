//! HTTP probe invocation.

use std::path::PathBuf;

use mtscan_common::config::HttpxConfig;
use mtscan_common::error::RequestError;
use mtscan_common::request::TargetInput;

use super::{push_path, push_switch, push_value};

const HOST_FLAG: &str = "-u";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpProbe {
    pub target: TargetInput,
    pub output: Option<PathBuf>,
    pub json: bool,
    pub title: bool,
    pub status_code: bool,
    pub tech_detect: bool,
    pub web_server: bool,
    pub follow_redirects: bool,
    pub silent: bool,
    /// Request timeout in seconds.
    pub timeout: Option<u32>,
    pub threads: Option<u32>,
    pub extra_args: Vec<String>,
}

impl HttpProbe {
    pub fn new(target: TargetInput) -> Self {
        Self {
            target,
            output: None,
            json: false,
            title: false,
            status_code: false,
            tech_detect: false,
            web_server: false,
            follow_redirects: false,
            silent: false,
            timeout: None,
            threads: None,
            extra_args: Vec::new(),
        }
    }

    pub fn from_config(target: TargetInput, config: &HttpxConfig) -> Self {
        Self {
            title: config.title,
            status_code: config.status_code,
            tech_detect: config.tech_detect,
            web_server: config.web_server,
            follow_redirects: config.follow_redirects,
            timeout: config.timeout,
            threads: config.threads,
            ..Self::new(target)
        }
    }

    pub fn validate(&self) -> Result<(), RequestError> {
        self.target.validate()
    }

    pub fn to_args(&self) -> Vec<String> {
        let mut args = Vec::new();

        self.target.push_args(HOST_FLAG, &mut args);
        push_path(&mut args, "-o", self.output.as_deref());
        push_switch(&mut args, "-json", self.json);
        push_switch(&mut args, "-title", self.title);
        push_switch(&mut args, "-status-code", self.status_code);
        push_switch(&mut args, "-tech-detect", self.tech_detect);
        push_switch(&mut args, "-web-server", self.web_server);
        push_switch(&mut args, "-follow-redirects", self.follow_redirects);
        push_switch(&mut args, "-silent", self.silent);
        push_value(&mut args, "-timeout", self.timeout);
        push_value(&mut args, "-threads", self.threads);
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_probe_only_names_the_target() {
        assert_eq!(
            HttpProbe::new(TargetInput::host("https://example.com")).to_args(),
            vec!["-u", "https://example.com"]
        );
    }

    #[test]
    fn configured_probe_enables_fingerprinting() {
        let mut probe = HttpProbe::from_config(
            TargetInput::list("/tmp/ports.txt"),
            &HttpxConfig::default(),
        );
        probe.output = Some(PathBuf::from("/tmp/http_services.json"));
        probe.json = true;
        probe.silent = true;

        assert_eq!(
            probe.to_args(),
            vec![
                "-l", "/tmp/ports.txt", "-o", "/tmp/http_services.json", "-json", "-title",
                "-status-code", "-tech-detect", "-web-server", "-follow-redirects", "-silent",
                "-timeout", "5", "-threads", "50",
            ]
        );
    }

    #[test]
    fn extra_args_come_last() {
        let mut probe = HttpProbe::new(TargetInput::host("example.com"));
        probe.threads = Some(10);
        probe.extra_args = vec!["-probe".into()];
        let args = probe.to_args();
        assert_eq!(args.last().map(String::as_str), Some("-probe"));
    }
}
