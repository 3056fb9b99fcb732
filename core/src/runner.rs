//! # Process Runner
//!
//! The one place `mtscan` starts external processes. Every scanner, installer
//! and verification call goes through [`ProcessRunner::run`], which applies
//! the same timeout, retry, privilege and output policy to all of them.
//!
//! A run never fails loudly: spawn errors, non-zero exits and timeouts are
//! logged, retried according to [`RunnerConfig`] and finally reported as
//! `false`.
//!
//! The timeout covers the whole attempt, including draining the pipes, so a
//! background descendant that keeps stdout open cannot stall a run.

use std::fmt;
use std::future::Future;
use std::io;
use std::path::Path;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use mtscan_common::macros::PRINT_TARGET;
use mtscan_common::{error, info, warn};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncRead, AsyncReadExt, BufReader, Lines};
use tokio::process::{Child, Command};
use tokio::time::Instant;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);
pub const DEFAULT_RETRY: u32 = 1;
pub const RETRY_DELAY: Duration = Duration::from_secs(2);
/// How long an ungrouped child gets to exit after SIGTERM before SIGKILL.
pub const TERM_GRACE: Duration = Duration::from_secs(5);

const MAX_OUTPUT_LINES: usize = 20;
const TRUNCATED_OUTPUT_LINES: usize = 10;
const SUDO: &str = "sudo";

/// A command as the caller wants it executed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandSpec {
    /// Program followed by its arguments; never interpreted by a shell.
    Argv(Vec<String>),
    /// A command line handed to `sh -c`.
    Shell(String),
}

impl CommandSpec {
    pub fn argv<I, S>(args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        CommandSpec::Argv(args.into_iter().map(Into::into).collect())
    }

    /// `program` followed by `args`.
    pub fn program(program: &Path, args: Vec<String>) -> Self {
        let mut argv = Vec::with_capacity(args.len() + 1);
        argv.push(program.display().to_string());
        argv.extend(args);
        CommandSpec::Argv(argv)
    }

    pub fn shell(line: impl Into<String>) -> Self {
        CommandSpec::Shell(line.into())
    }

    fn elevated(&self) -> Self {
        match self {
            CommandSpec::Argv(argv) => {
                let mut elevated = Vec::with_capacity(argv.len() + 1);
                elevated.push(SUDO.to_string());
                elevated.extend(argv.iter().cloned());
                CommandSpec::Argv(elevated)
            }
            CommandSpec::Shell(line) => CommandSpec::Shell(format!("{SUDO} {line}")),
        }
    }

    fn to_command(&self) -> io::Result<Command> {
        match self {
            CommandSpec::Argv(argv) => {
                let (program, args) = argv
                    .split_first()
                    .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "empty command"))?;
                let mut command = Command::new(program);
                command.args(args);
                Ok(command)
            }
            CommandSpec::Shell(line) => {
                let mut command = shell_command();
                command.arg(line);
                Ok(command)
            }
        }
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommandSpec::Argv(argv) => f.write_str(&argv.join(" ")),
            CommandSpec::Shell(line) => f.write_str(line),
        }
    }
}

#[cfg(unix)]
fn shell_command() -> Command {
    let mut command = Command::new("sh");
    command.arg("-c");
    command
}

#[cfg(not(unix))]
fn shell_command() -> Command {
    let mut command = Command::new("cmd");
    command.arg("/C");
    command
}

/// Execution policy shared by every invocation of a runner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunnerConfig {
    /// Wall-clock limit per attempt; `None` waits forever.
    pub timeout: Option<Duration>,
    /// Additional attempts after the first failure.
    pub retry: u32,
    /// Pause before each retry.
    pub retry_delay: Duration,
    /// Prefix with `sudo` unless already root.
    pub use_sudo: bool,
    /// Suppress diagnostics and discard the child's output.
    pub silent: bool,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            timeout: Some(DEFAULT_TIMEOUT),
            retry: DEFAULT_RETRY,
            retry_delay: RETRY_DELAY,
            use_sudo: false,
            silent: false,
        }
    }
}

impl RunnerConfig {
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_retry(mut self, retry: u32) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    pub fn with_sudo(mut self, use_sudo: bool) -> Self {
        self.use_sudo = use_sudo;
        self
    }

    pub fn silent(mut self, silent: bool) -> Self {
        self.silent = silent;
        self
    }
}

enum Attempt {
    Succeeded { stdout: String },
    Failed { status: ExitStatus, stdout: String, stderr: String },
    TimedOut(Duration),
    SpawnError(io::Error),
}

#[derive(Debug, Clone, Default)]
pub struct ProcessRunner {
    config: RunnerConfig,
}

impl ProcessRunner {
    pub fn new(config: RunnerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RunnerConfig {
        &self.config
    }

    /// Runs `spec` until it exits with status zero or the retries run out.
    pub async fn run(&self, spec: &CommandSpec) -> bool {
        let elevated = self.config.use_sudo && needs_elevation();
        let spec = if elevated { spec.elevated() } else { spec.clone() };
        let attempts = self.config.retry.saturating_add(1);
        let silent = self.config.silent;

        for attempt in 1..=attempts {
            if !silent {
                info!("Running: {spec}");
            }

            match self.attempt(&spec, elevated).await {
                Attempt::Succeeded { stdout } => {
                    self.surface_output(&stdout);
                    return true;
                }
                Attempt::Failed { status, stdout, stderr } => {
                    self.surface_output(&stdout);
                    if !silent {
                        warn!("Command failed ({status}): {spec}");
                        if !stderr.trim().is_empty() {
                            error!("Error: {}", stderr.trim());
                        }
                    }
                }
                Attempt::TimedOut(limit) => {
                    if !silent {
                        warn!("Command timed out after {} seconds: {spec}", limit.as_secs());
                    }
                }
                Attempt::SpawnError(e) => {
                    if !silent {
                        error!("Error running command {spec}: {e}");
                    }
                }
            }

            if attempt < attempts {
                if !silent {
                    warn!("Retrying ({attempt}/{})...", self.config.retry);
                }
                tokio::time::sleep(self.config.retry_delay).await;
            }
        }

        false
    }

    async fn attempt(&self, spec: &CommandSpec, elevated: bool) -> Attempt {
        let mut command = match spec.to_command() {
            Ok(command) => command,
            Err(e) => return Attempt::SpawnError(e),
        };

        let (stdout, stderr) = if self.config.silent {
            (Stdio::null(), Stdio::null())
        } else {
            (Stdio::piped(), Stdio::piped())
        };
        command
            .stdin(Stdio::null())
            .stdout(stdout)
            .stderr(stderr)
            .kill_on_drop(true);

        // sudo must stay in the foreground group to prompt for a password.
        let grouped = !elevated;
        #[cfg(unix)]
        {
            if grouped {
                command.process_group(0);
            }
        }

        let mut child = match command.spawn() {
            Ok(child) => child,
            Err(e) => return Attempt::SpawnError(e),
        };
        // The id is gone once the child is reaped, the group may outlive it.
        let pid = child.id();

        let stdout_task = tokio::spawn(drain(child.stdout.take()));
        let stderr_task = tokio::spawn(drain(child.stderr.take()));
        let drains = [stdout_task.abort_handle(), stderr_task.abort_handle()];
        let deadline = self.config.timeout.map(|limit| (Instant::now() + limit, limit));

        let status = match deadline {
            Some((at, limit)) => match tokio::time::timeout_at(at, child.wait()).await {
                Ok(status) => status,
                Err(_elapsed) => {
                    terminate(&mut child, grouped).await;
                    drains.iter().for_each(|handle| handle.abort());
                    return Attempt::TimedOut(limit);
                }
            },
            None => child.wait().await,
        };

        let status = match status {
            Ok(status) => status,
            Err(e) => return Attempt::SpawnError(e),
        };

        let drained = async { (stdout_task.await, stderr_task.await) };
        tokio::pin!(drained);
        let (stdout, stderr) = match deadline {
            Some((at, limit)) => match tokio::time::timeout_at(at, &mut drained).await {
                Ok(joined) => joined,
                Err(_elapsed) => {
                    // A descendant still holds the pipes open.
                    if grouped {
                        kill_group(pid);
                    }
                    drains.iter().for_each(|handle| handle.abort());
                    return Attempt::TimedOut(limit);
                }
            },
            None => drained.await,
        };
        let stdout = stdout.unwrap_or_default();
        let stderr = stderr.unwrap_or_default();

        if status.success() {
            Attempt::Succeeded { stdout }
        } else {
            Attempt::Failed { status, stdout, stderr }
        }
    }

    fn surface_output(&self, stdout: &str) {
        if self.config.silent || stdout.trim().is_empty() {
            return;
        }

        let lines: Vec<&str> = stdout.trim_end().lines().collect();
        if lines.len() > MAX_OUTPUT_LINES {
            for line in &lines[..TRUNCATED_OUTPUT_LINES] {
                info!(target: PRINT_TARGET, "{line}");
            }
            info!(target: PRINT_TARGET, "[...output truncated...]");
        } else {
            for line in lines {
                info!(target: PRINT_TARGET, "{line}");
            }
        }
    }
}

/// Whether a `sudo` prefix would change anything on this platform.
pub fn needs_elevation() -> bool {
    cfg!(unix) && !is_root::is_root()
}

async fn drain<R>(reader: Option<R>) -> String
where
    R: AsyncRead + Unpin,
{
    let mut buf = Vec::new();
    if let Some(mut reader) = reader {
        let _ = reader.read_to_end(&mut buf).await;
    }
    String::from_utf8_lossy(&buf).into_owned()
}

/// Stops a timed-out child and everything it started.
///
/// A grouped child is killed together with its process group. An ungrouped
/// one is the `sudo` wrapper: it relays SIGTERM to the scanner it runs, while
/// a SIGKILL would leave that scanner orphaned as root. It gets [`TERM_GRACE`]
/// to exit before it is killed.
async fn terminate(child: &mut Child, grouped: bool) {
    if grouped {
        kill_group(child.id());
    } else if signal_term(child.id())
        && tokio::time::timeout(TERM_GRACE, child.wait()).await.is_ok()
    {
        return;
    }

    let _ = child.kill().await;
    let _ = child.wait().await;
}

#[cfg(unix)]
fn kill_group(pid: Option<u32>) {
    use nix::sys::signal::{Signal, killpg};
    use nix::unistd::Pid;

    if let Some(pid) = pid {
        let _ = killpg(Pid::from_raw(pid as i32), Signal::SIGKILL);
    }
}

#[cfg(not(unix))]
fn kill_group(_pid: Option<u32>) {}

/// Returns whether the signal was delivered.
#[cfg(unix)]
fn signal_term(pid: Option<u32>) -> bool {
    use nix::sys::signal::{Signal, kill};
    use nix::unistd::Pid;

    pid.is_some_and(|pid| kill(Pid::from_raw(pid as i32), Signal::SIGTERM).is_ok())
}

#[cfg(not(unix))]
fn signal_term(_pid: Option<u32>) -> bool {
    false
}

/// Which pipe a streamed line came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamSource {
    Stdout,
    Stderr,
}

/// Runs `spec` and hands every output line to `sink` as soon as it arrives.
///
/// Both pipes are read concurrently, so a chatty stderr never stalls stdout.
/// stdin is inherited, which keeps interactive prompts of the child usable.
pub async fn stream_lines<F>(spec: &CommandSpec, mut sink: F) -> io::Result<ExitStatus>
where
    F: FnMut(StreamSource, &str),
{
    let mut command = spec.to_command()?;
    command
        .stdin(Stdio::inherit())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let mut child = command.spawn()?;
    let mut stdout = child.stdout.take().map(|s| BufReader::new(s).lines());
    let mut stderr = child.stderr.take().map(|s| BufReader::new(s).lines());
    let mut stdout_open = stdout.is_some();
    let mut stderr_open = stderr.is_some();

    while stdout_open || stderr_open {
        tokio::select! {
            line = next_line(&mut stdout), if stdout_open => match line {
                Some(line) => sink(StreamSource::Stdout, &line),
                None => stdout_open = false,
            },
            line = next_line(&mut stderr), if stderr_open => match line {
                Some(line) => sink(StreamSource::Stderr, &line),
                None => stderr_open = false,
            },
        }
    }

    child.wait().await
}

/// How a [`stream_lines_until`] run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamOutcome {
    /// The child exited on its own.
    Exited(ExitStatus),
    /// `interrupt` fired first. Holds the exit status if the child finished
    /// within the grace period, `None` if it had to be killed.
    Interrupted(Option<ExitStatus>),
}

/// [`stream_lines`] that stops waiting once `interrupt` completes.
///
/// The child usually receives the same interrupt (it shares the terminal's
/// process group) and is given `grace` to clean up after itself before it is
/// killed.
pub async fn stream_lines_until<F, I>(
    spec: &CommandSpec,
    sink: F,
    interrupt: I,
    grace: Duration,
) -> io::Result<StreamOutcome>
where
    F: FnMut(StreamSource, &str),
    I: Future,
{
    let streamed = stream_lines(spec, sink);
    tokio::pin!(streamed);

    tokio::select! {
        status = &mut streamed => return status.map(StreamOutcome::Exited),
        _ = interrupt => {}
    }

    match tokio::time::timeout(grace, &mut streamed).await {
        Ok(status) => status.map(|status| StreamOutcome::Interrupted(Some(status))),
        Err(_elapsed) => Ok(StreamOutcome::Interrupted(None)),
    }
}

async fn next_line<R>(lines: &mut Option<Lines<R>>) -> Option<String>
where
    R: AsyncBufRead + Unpin,
{
    match lines {
        Some(lines) => lines.next_line().await.ok().flatten(),
        None => None,
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
