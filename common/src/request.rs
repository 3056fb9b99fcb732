//! # Scan Targets
//!
//! Every tool accepts either a single target on the command line or a file
//! listing one target per line. [`TargetInput`] makes "exactly one of the two"
//! a property of the type, so builders cannot emit both flags.

use std::fs::File;
use std::path::{Path, PathBuf};

use crate::error::RequestError;

/// Flag every tool uses for a target-list file.
pub const LIST_FLAG: &str = "-l";

/// What a tool should scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetInput {
    /// A single host, IP, CIDR or URL.
    Host(String),
    /// A file with one target per line.
    List(PathBuf),
}

impl TargetInput {
    /// Builds an input from the two optional sources a caller may hold.
    pub fn from_parts(host: Option<String>, list: Option<PathBuf>) -> Result<Self, RequestError> {
        let host = host.filter(|h| !h.trim().is_empty());
        match (host, list) {
            (Some(_), Some(_)) => Err(RequestError::ConflictingTargets),
            (Some(host), None) => Ok(TargetInput::Host(host.trim().to_string())),
            (None, Some(list)) => Ok(TargetInput::List(list)),
            (None, None) => Err(RequestError::MissingTarget),
        }
    }

    pub fn host(host: impl Into<String>) -> Self {
        TargetInput::Host(host.into())
    }

    pub fn list(path: impl AsRef<Path>) -> Self {
        TargetInput::List(path.as_ref().to_path_buf())
    }

    /// Checks that a target-list file exists and can be opened.
    pub fn validate(&self) -> Result<(), RequestError> {
        match self {
            TargetInput::Host(host) if host.trim().is_empty() => Err(RequestError::MissingTarget),
            TargetInput::Host(_) => Ok(()),
            TargetInput::List(path) => {
                if !path.is_file() {
                    return Err(RequestError::TargetListMissing(path.clone()));
                }
                File::open(path)
                    .map(|_| ())
                    .map_err(|source| RequestError::TargetListUnreadable {
                        path: path.clone(),
                        source,
                    })
            }
        }
    }

    /// Appends the target flag: `host_flag <host>` or `-l <path>`.
    pub fn push_args(&self, host_flag: &str, args: &mut Vec<String>) {
        match self {
            TargetInput::Host(host) => {
                args.push(host_flag.to_string());
                args.push(host.clone());
            }
            TargetInput::List(path) => {
                args.push(LIST_FLAG.to_string());
                args.push(path.display().to_string());
            }
        }
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
    use std::io::Write;

    #[test]
    fn from_parts_requires_exactly_one_source() {
        assert!(matches!(
            TargetInput::from_parts(None, None),
            Err(RequestError::MissingTarget)
        ));
        assert!(matches!(
            TargetInput::from_parts(Some("   ".into()), None),
            Err(RequestError::MissingTarget)
        ));
        assert!(matches!(
            TargetInput::from_parts(Some("10.0.0.1".into()), Some("hosts.txt".into())),
            Err(RequestError::ConflictingTargets)
        ));
        assert_eq!(
            TargetInput::from_parts(Some(" example.com ".into()), None).unwrap(),
            TargetInput::Host("example.com".into())
        );
    }

    #[test]
    fn validate_rejects_missing_list_file() {
        let input = TargetInput::list("/definitely/not/here/targets.txt");
        assert!(matches!(
            input.validate(),
            Err(RequestError::TargetListMissing(_))
        ));
    }

    #[test]
    fn validate_accepts_existing_list_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "10.0.0.1").unwrap();
        assert!(TargetInput::list(file.path()).validate().is_ok());
    }

    #[test]
    fn push_args_emits_one_target_flag() {
        let mut args = Vec::new();
        TargetInput::host("10.0.0.1").push_args("-host", &mut args);
        assert_eq!(args, vec!["-host", "10.0.0.1"]);

        let mut args = Vec::new();
        TargetInput::list("/tmp/targets.txt").push_args("-host", &mut args);
        assert_eq!(args, vec!["-l", "/tmp/targets.txt"]);
    }
}
