//! # Shell Environment
//!
//! Tools installed with `go install` land in `$GOPATH/bin`, which new shells
//! only find if a start-up file puts it on `PATH`. Planning the edit is pure;
//! applying it goes through [`EnvironmentTransaction`], which restores every
//! touched file if any write fails.

use std::env;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use mtscan_common::error::EnvironmentError;
use tracing::debug;

/// First line of every block `mtscan` appends. Presence means "already done".
pub const MARKER: &str = "# Go environment (mtscan)";

const GO_ROOT_BIN: &str = "/usr/local/go/bin";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
    Other,
}

impl Shell {
    /// Shell named by `$SHELL`.
    pub fn detect() -> Self {
        env::var("SHELL").map_or(Shell::Other, |shell| Self::from_path(&shell))
    }

    pub fn from_path(shell: &str) -> Self {
        let name = Path::new(shell.trim())
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default();
        match name {
            "bash" => Shell::Bash,
            "zsh" => Shell::Zsh,
            "fish" => Shell::Fish,
            _ => Shell::Other,
        }
    }

    /// Start-up file relative to the home directory.
    pub fn startup_file(self) -> &'static str {
        match self {
            Shell::Bash => ".bashrc",
            Shell::Zsh => ".zshrc",
            Shell::Fish => ".config/fish/config.fish",
            Shell::Other => ".profile",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GoPaths {
    pub gopath: PathBuf,
    pub gobin: PathBuf,
}

impl GoPaths {
    /// `~/go` and `~/go/bin`.
    pub fn under(home: &Path) -> Self {
        let gopath = home.join("go");
        Self {
            gobin: gopath.join("bin"),
            gopath,
        }
    }
}

/// A block to append to one start-up file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEdit {
    pub path: PathBuf,
    pub block: String,
}

/// Edits that make `paths.gobin` visible to new `shell` sessions.
pub fn plan_edits(shell: Shell, home: &Path, paths: &GoPaths) -> Vec<FileEdit> {
    let gopath = paths.gopath.display();
    let gobin = paths.gobin.display();

    let body = match shell {
        Shell::Fish => format!(
            "set -gx PATH $PATH {GO_ROOT_BIN}\n\
             set -gx GOPATH {gopath}\n\
             set -gx GOBIN {gobin}\n\
             set -gx PATH $PATH $GOBIN\n"
        ),
        _ => format!(
            "export PATH=\"$PATH:{GO_ROOT_BIN}\"\n\
             export GOPATH=\"{gopath}\"\n\
             export GOBIN=\"{gobin}\"\n\
             export PATH=\"$PATH:$GOBIN\"\n"
        ),
    };

    vec![FileEdit {
        path: home.join(shell.startup_file()),
        block: format!("\n{MARKER}\n{body}"),
    }]
}

struct Backup {
    path: PathBuf,
    /// `None` when the file did not exist before.
    original: Option<Vec<u8>>,
}

/// Applies a set of edits as a unit.
#[derive(Default)]
pub struct EnvironmentTransaction {
    backups: Vec<Backup>,
}

impl EnvironmentTransaction {
    /// Appends every block whose marker is missing. Returns the files changed.
    ///
    /// If one edit fails, every file changed so far is restored before the
    /// error is returned.
    pub fn apply(edits: &[FileEdit]) -> Result<Vec<PathBuf>, EnvironmentError> {
        let mut transaction = Self::default();
        let mut changed = Vec::new();

        for edit in edits {
            match transaction.apply_one(edit) {
                Ok(true) => changed.push(edit.path.clone()),
                Ok(false) => debug!("{} already configured", edit.path.display()),
                Err(source) => {
                    transaction.rollback()?;
                    return Err(EnvironmentError::Write {
                        path: edit.path.clone(),
                        source,
                    });
                }
            }
        }

        Ok(changed)
    }

    fn apply_one(&mut self, edit: &FileEdit) -> io::Result<bool> {
        let original = match fs::read(&edit.path) {
            Ok(bytes) => Some(bytes),
            Err(e) if e.kind() == io::ErrorKind::NotFound => None,
            Err(e) => return Err(e),
        };

        if let Some(bytes) = &original {
            if String::from_utf8_lossy(bytes).contains(MARKER) {
                return Ok(false);
            }
        }

        if let Some(parent) = edit.path.parent() {
            fs::create_dir_all(parent)?;
        }

        self.backups.push(Backup {
            path: edit.path.clone(),
            original,
        });

        let mut file = OpenOptions::new().create(true).append(true).open(&edit.path)?;
        file.write_all(edit.block.as_bytes())?;
        Ok(true)
    }

    fn rollback(&mut self) -> Result<(), EnvironmentError> {
        for backup in self.backups.drain(..).rev() {
            let restored = match &backup.original {
                Some(bytes) => fs::write(&backup.path, bytes),
                None => match fs::remove_file(&backup.path) {
                    Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
                    other => other,
                },
            };
            restored.map_err(|source| EnvironmentError::Rollback {
                path: backup.path.clone(),
                source,
            })?;
        }
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
