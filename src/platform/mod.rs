//! Platform abstraction layer.
//!
//! This module defines the `Platform` trait that wraps every OS-specific
//! operation the search core needs, so providers and the execution
//! dispatcher stay platform-agnostic and can be tested against a mock.

#[cfg(target_os = "linux")]
mod linux;

#[cfg(target_os = "macos")]
mod macos;

use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::error::{ActionError, ActionResult};

/// Represents an installed application discovered on the system.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct AppEntry {
    /// Stable identifier (desktop file id on Linux, bundle id on macOS)
    pub id: String,
    /// Display name of the application
    pub name: String,
    /// `.desktop` file or `.app` bundle; the target of a Launch action
    pub path: PathBuf,
    /// Description or comment about the application
    pub description: Option<String>,
    /// Extra search terms
    pub keywords: Vec<String>,
}

/// Session and power commands offered by the system command provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SystemCommand {
    Lock,
    Sleep,
    Logout,
    Restart,
    Shutdown,
}

impl SystemCommand {
    pub const ALL: [SystemCommand; 5] = [
        SystemCommand::Lock,
        SystemCommand::Sleep,
        SystemCommand::Logout,
        SystemCommand::Restart,
        SystemCommand::Shutdown,
    ];

    /// Stable identity used for dedup and usage tracking.
    pub fn id(&self) -> &'static str {
        match self {
            SystemCommand::Lock => "system:lock",
            SystemCommand::Sleep => "system:sleep",
            SystemCommand::Logout => "system:logout",
            SystemCommand::Restart => "system:restart",
            SystemCommand::Shutdown => "system:shutdown",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            SystemCommand::Lock => "Lock Screen",
            SystemCommand::Sleep => "Sleep",
            SystemCommand::Logout => "Log Out",
            SystemCommand::Restart => "Restart",
            SystemCommand::Shutdown => "Shut Down",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            SystemCommand::Lock => "Lock the current session",
            SystemCommand::Sleep => "Suspend the computer",
            SystemCommand::Logout => "End the current session",
            SystemCommand::Restart => "Reboot the computer",
            SystemCommand::Shutdown => "Power off the computer",
        }
    }

    /// Alternative words that should also find this command.
    pub fn aliases(&self) -> &'static [&'static str] {
        match self {
            SystemCommand::Lock => &["lock"],
            SystemCommand::Sleep => &["suspend"],
            SystemCommand::Logout => &["logout", "sign out"],
            SystemCommand::Restart => &["reboot"],
            SystemCommand::Shutdown => &["power off", "poweroff", "halt"],
        }
    }
}

/// Platform-specific operations.
///
/// Methods returning [`ActionResult`] are side effects triggered by an
/// activation; their errors are shown to the user.
pub trait Platform: Send + Sync {
    /// Platform name for logging and display
    fn name(&self) -> &'static str;

    /// Discover installed applications.
    ///
    /// - Linux: XDG .desktop files
    /// - macOS: /Applications, ~/Applications
    fn discover_apps(&self) -> Vec<AppEntry>;

    /// Read the current clipboard content as text.
    ///
    /// Returns `None` if the clipboard is empty or contains non-text data.
    fn clipboard_read(&self) -> Option<String>;

    fn clipboard_write(&self, content: &str) -> ActionResult<()>;

    /// Open a URL or a path with its default handler.
    fn open(&self, target: &str) -> ActionResult<()>;

    /// Show a file or directory in the file manager.
    fn reveal(&self, path: &Path) -> ActionResult<()>;

    /// Launch an application entry, or open any other path with its
    /// default application.
    fn launch(&self, path: &Path) -> ActionResult<()>;

    /// Run a command through `sh -c` without waiting for it.
    fn run_shell_command(&self, command: &str) -> ActionResult<()> {
        if command.trim().is_empty() {
            return Err(ActionError::EmptyCommand);
        }
        spawn_detached("sh", ["-c", command])
    }

    /// Shell command line performing a session/power command.
    fn system_command_line(&self, command: SystemCommand) -> String;

    /// Platform-specific configuration directory.
    ///
    /// - Linux: `~/.config/orbit/`
    /// - macOS: `~/Library/Application Support/orbit/`
    fn config_dir(&self) -> PathBuf {
        config_dir()
    }

    /// Platform-specific data directory (usage counters).
    ///
    /// - Linux: `~/.local/share/orbit/`
    /// - macOS: `~/Library/Application Support/orbit/`
    fn data_dir(&self) -> PathBuf {
        data_dir()
    }
}

/// Get the platform implementation for the current OS.
pub fn current() -> Arc<dyn Platform> {
    #[cfg(target_os = "linux")]
    {
        Arc::new(linux::LinuxPlatform::new())
    }

    #[cfg(target_os = "macos")]
    {
        Arc::new(macos::MacOSPlatform::new())
    }

    #[cfg(not(any(target_os = "linux", target_os = "macos")))]
    {
        compile_error!("Unsupported platform")
    }
}

pub fn config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| {
            dirs::home_dir()
                .map(|h| h.join(".config"))
                .unwrap_or_else(|| PathBuf::from("/tmp"))
        })
        .join("orbit")
}

pub fn data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| {
            dirs::home_dir()
                .map(|h| h.join(".local/share"))
                .unwrap_or_else(|| PathBuf::from("/tmp"))
        })
        .join("orbit")
}

/// Start a helper program and return without waiting for it.
pub(crate) fn spawn_detached<I, S>(program: &str, args: I) -> ActionResult<()>
where
    I: IntoIterator<Item = S>,
    S: AsRef<std::ffi::OsStr>,
{
    Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .map(drop)
        .map_err(|source| spawn_error(program, source))
}

/// Run a helper program, feeding `input` on stdin, and require success.
pub(crate) fn pipe_to(program: &str, args: &[&str], input: &str) -> ActionResult<()> {
    use std::io::Write;

    let mut child = Command::new(program)
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .map_err(|source| spawn_error(program, source))?;

    if let Some(mut stdin) = child.stdin.take() {
        stdin
            .write_all(input.as_bytes())
            .map_err(|e| ActionError::Clipboard(format!("Failed to write to {program}: {e}")))?;
    }

    let status = child.wait().map_err(|source| spawn_error(program, source))?;
    if status.success() {
        Ok(())
    } else {
        Err(ActionError::CommandFailed {
            program: program.to_string(),
            status: status.to_string(),
        })
    }
}

/// Longest a helper run through [`capture`] may take before it is killed.
pub(crate) const CAPTURE_TIMEOUT: Duration = Duration::from_secs(1);

const POLL_INTERVAL: Duration = Duration::from_millis(5);

/// Run a helper program and capture stdout if it succeeds in time.
pub(crate) fn capture(program: &str, args: &[&str]) -> Option<String> {
    capture_within(program, args, CAPTURE_TIMEOUT)
}

fn capture_within(program: &str, args: &[&str], timeout: Duration) -> Option<String> {
    let child = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .ok()?;

    let started = Instant::now();
    match collect_output(child, || started.elapsed() >= timeout) {
        Ok(Some((status, stdout))) => status.success().then_some(stdout),
        Ok(None) => {
            debug!(program, ?timeout, "helper timed out");
            None
        }
        Err(e) => {
            debug!(program, error = %e, "helper failed");
            None
        }
    }
}

/// Wait for a child spawned with a piped stdout and collect that output.
///
/// The child is polled, never waited on, and killed as soon as `stop`
/// returns true; that case yields `Ok(None)`. Stdout is drained on a side
/// thread so a full pipe cannot stall the child.
pub(crate) fn collect_output(
    mut child: Child,
    stop: impl Fn() -> bool,
) -> io::Result<Option<(ExitStatus, String)>> {
    let mut stdout = child
        .stdout
        .take()
        .ok_or_else(|| io::Error::new(io::ErrorKind::Other, "child stdout is not piped"))?;
    let reader = thread::spawn(move || {
        let mut output = Vec::new();
        stdout
            .read_to_end(&mut output)
            .map(|_| String::from_utf8_lossy(&output).into_owned())
    });

    let status = loop {
        if stop() {
            if let Err(e) = child.kill() {
                warn!(pid = child.id(), error = %e, "failed to kill helper");
            }
            // Reap it; the reader thread ends once the pipe closes
            let _ = child.wait();
            return Ok(None);
        }

        match child.try_wait()? {
            Some(status) => break status,
            None => thread::sleep(POLL_INTERVAL),
        }
    };

    let output = reader
        .join()
        .map_err(|_| io::Error::new(io::ErrorKind::Other, "output reader panicked"))??;
    Ok(Some((status, output)))
}

fn spawn_error(program: &str, source: io::Error) -> ActionError {
    ActionError::Spawn {
        program: program.to_string(),
        source,
    }
}
