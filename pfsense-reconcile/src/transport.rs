use std::io::Write;
use std::process::{Command, Stdio};

use tracing::debug;

use crate::error::ReconcileError;

/// Captured result of one command.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ShellOutput {
    pub status: i32,
    pub stdout: String,
    pub stderr: String,
}

impl ShellOutput {
    pub fn success(&self) -> bool {
        self.status == 0
    }
}

/// Runs commands on the firewall.
///
/// `argv` is the command as it should run on the firewall; implementations add
/// whatever prefix they need to get there.
pub trait Transport {
    fn run(&self, argv: &[String], stdin: Option<&str>) -> Result<ShellOutput, ReconcileError>;
}

/// Spawns local processes, optionally through a launcher such as `ssh host`.
#[derive(Debug, Clone, Default)]
pub struct CommandTransport {
    launcher: Vec<String>,
}

impl CommandTransport {
    pub fn new(launcher: Vec<String>) -> Self {
        Self { launcher }
    }
}

impl Transport for CommandTransport {
    fn run(&self, argv: &[String], stdin: Option<&str>) -> Result<ShellOutput, ReconcileError> {
        let mut full = self.launcher.iter().chain(argv.iter());
        let Some(program) = full.next() else {
            return Err(ReconcileError::Precondition("empty command".to_string()));
        };
        debug!(program = %program, args = ?argv, "spawning");

        let mut child = Command::new(program)
            .args(full)
            .stdin(if stdin.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|err| ReconcileError::Precondition(format!("cannot run {program}: {err}")))?;

        if let (Some(input), Some(mut pipe)) = (stdin, child.stdin.take()) {
            pipe.write_all(input.as_bytes())
                .map_err(|err| ReconcileError::Transport {
                    action: "sending script",
                    status: -1,
                    stderr: err.to_string(),
                    stdout: String::new(),
                })?;
        }

        let output = child
            .wait_with_output()
            .map_err(|err| ReconcileError::Transport {
                action: "waiting for shell",
                status: -1,
                stderr: err.to_string(),
                stdout: String::new(),
            })?;

        Ok(ShellOutput {
            status: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}
