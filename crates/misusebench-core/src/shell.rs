//! Synchronous shell command execution
//!
//! All external processes (build tools, svn, detectors) run through this
//! module. Execution blocks the calling thread; cancellation is realized
//! only via the optional timeout, after which the child is killed.

use std::fs;
use std::path::Path;
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};

use tracing::debug;

use crate::error::CommandError;

/// Poll interval while waiting for a child with a timeout
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Run a single shell command in `cwd`, capturing combined output
///
/// Fails with [`CommandError::Failed`] carrying the command text and its
/// output on non-zero exit.
pub fn run_command(command: &str, cwd: &Path) -> Result<String, CommandError> {
    debug!(command, cwd = %cwd.display(), "running command");
    let output = Command::new("sh")
        .arg("-c")
        .arg(command)
        .current_dir(cwd)
        .output()
        .map_err(|source| CommandError::Launch {
            command: command.to_string(),
            source,
        })?;

    let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
    combined.push_str(&String::from_utf8_lossy(&output.stderr));

    if output.status.success() {
        Ok(combined)
    } else {
        Err(CommandError::Failed {
            command: command.to_string(),
            output: combined,
        })
    }
}

/// Run a list of shell commands in order, stopping at the first failure
pub fn run_commands(commands: &[String], cwd: &Path) -> Result<(), CommandError> {
    for command in commands {
        run_command(command, cwd)?;
    }
    Ok(())
}

/// Run a shell command with an optional timeout
///
/// The child's output is redirected to temporary files so a chatty process
/// cannot deadlock on a full pipe while we poll for its exit. On timeout the
/// child is killed and [`CommandError::Timeout`] is returned.
pub fn run_with_timeout(
    command: &str,
    cwd: &Path,
    timeout: Option<Duration>,
) -> Result<String, CommandError> {
    let Some(timeout) = timeout else {
        return run_command(command, cwd);
    };

    debug!(command, timeout_secs = timeout.as_secs(), "running command with timeout");
    let stdout_file = tempfile::NamedTempFile::new().map_err(|source| CommandError::Io {
        command: command.to_string(),
        source,
    })?;
    let stderr_file = tempfile::NamedTempFile::new().map_err(|source| CommandError::Io {
        command: command.to_string(),
        source,
    })?;

    let mut child = Command::new("sh")
        .arg("-c")
        .arg(command)
        .current_dir(cwd)
        .stdout(Stdio::from(stdout_file.reopen().map_err(|source| {
            CommandError::Io {
                command: command.to_string(),
                source,
            }
        })?))
        .stderr(Stdio::from(stderr_file.reopen().map_err(|source| {
            CommandError::Io {
                command: command.to_string(),
                source,
            }
        })?))
        .spawn()
        .map_err(|source| CommandError::Launch {
            command: command.to_string(),
            source,
        })?;

    let started = Instant::now();
    let status = loop {
        match child.try_wait() {
            Ok(Some(status)) => break status,
            Ok(None) => {
                if started.elapsed() >= timeout {
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(CommandError::Timeout {
                        command: command.to_string(),
                        timeout_secs: timeout.as_secs(),
                    });
                }
                std::thread::sleep(POLL_INTERVAL);
            }
            Err(source) => {
                return Err(CommandError::Io {
                    command: command.to_string(),
                    source,
                })
            }
        }
    };

    let mut combined = fs::read_to_string(stdout_file.path()).unwrap_or_default();
    combined.push_str(&fs::read_to_string(stderr_file.path()).unwrap_or_default());

    if status.success() {
        Ok(combined)
    } else {
        Err(CommandError::Failed {
            command: command.to_string(),
            output: combined,
        })
    }
}

/// External build collaborator
///
/// The compile stage treats the build as an opaque synchronous call; tests
/// substitute a fake that fabricates class files.
pub trait Builder {
    /// Execute the build command list against an assembled build directory
    fn build(
        &self,
        commands: &[String],
        build_dir: &Path,
        dependencies_dir: &Path,
    ) -> Result<(), CommandError>;
}

/// Builder that runs the configured commands through the shell
#[derive(Debug, Default)]
pub struct ShellBuilder;

impl Builder for ShellBuilder {
    fn build(
        &self,
        commands: &[String],
        build_dir: &Path,
        dependencies_dir: &Path,
    ) -> Result<(), CommandError> {
        debug!(
            build_dir = %build_dir.display(),
            dependencies = %dependencies_dir.display(),
            "invoking build commands"
        );
        run_commands(commands, build_dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn run_command_captures_output() {
        let temp = TempDir::new().unwrap();
        let output = run_command("echo hello", temp.path()).unwrap();
        assert_eq!(output.trim(), "hello");
    }

    #[test]
    fn run_command_reports_failure() {
        let temp = TempDir::new().unwrap();
        let err = run_command("echo oops >&2; exit 3", temp.path()).unwrap_err();
        match err {
            CommandError::Failed { command, output } => {
                assert_eq!(command, "echo oops >&2; exit 3");
                assert!(output.contains("oops"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn run_commands_stops_at_first_failure() {
        let temp = TempDir::new().unwrap();
        let marker = temp.path().join("marker");
        let commands = vec![
            "false".to_string(),
            format!("touch {}", marker.display()),
        ];
        assert!(run_commands(&commands, temp.path()).is_err());
        assert!(!marker.exists());
    }

    #[test]
    fn run_with_timeout_kills_slow_command() {
        let temp = TempDir::new().unwrap();
        let err =
            run_with_timeout("sleep 10", temp.path(), Some(Duration::from_millis(200))).unwrap_err();
        assert!(matches!(err, CommandError::Timeout { .. }));
    }

    #[test]
    fn run_with_timeout_passes_fast_command() {
        let temp = TempDir::new().unwrap();
        let output =
            run_with_timeout("echo quick", temp.path(), Some(Duration::from_secs(5))).unwrap();
        assert_eq!(output.trim(), "quick");
    }
}
