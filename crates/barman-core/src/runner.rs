//! Subprocess bridge to the backup tool.
//!
//! Every call builds an argument vector of the form
//! `[prefix..., tool, "-f", "json", subcommand, identifiers...]`, spawns it
//! directly (never through a shell), and parses stdout as one JSON document.

use crate::config::RunnerConfig;
use crate::error::{CoreError, Result};
use crate::operation::Operation;
use async_trait::async_trait;
use serde_json::Value;
use std::process::Stdio;
use std::sync::Arc;
use tokio::process::Command;
use tracing::{debug, trace, warn};

/// Maximum amount of stderr carried into an error message.
const MAX_STDERR_IN_ERROR: usize = 4 * 1024;

/// Raw result of one child process.
#[derive(Debug, Clone, Default)]
pub struct ProcessOutput {
    /// Exit code, `None` if the process was terminated by a signal.
    pub code: Option<i32>,
    /// Captured standard output.
    pub stdout: Vec<u8>,
    /// Captured standard error.
    pub stderr: Vec<u8>,
}

impl ProcessOutput {
    /// Whether the process exited with status 0.
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

/// Spawns a process from an argument vector and collects its output.
#[async_trait]
pub trait ProcessSpawner: Send + Sync {
    /// Run `argv[0]` with `argv[1..]` as its arguments.
    async fn spawn(&self, argv: &[String]) -> std::io::Result<ProcessOutput>;
}

/// Spawns real child processes with tokio.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemSpawner;

#[async_trait]
impl ProcessSpawner for SystemSpawner {
    async fn spawn(&self, argv: &[String]) -> std::io::Result<ProcessOutput> {
        let (program, args) = argv.split_first().ok_or_else(|| {
            std::io::Error::new(std::io::ErrorKind::InvalidInput, "empty argument vector")
        })?;

        let output = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await?;

        Ok(ProcessOutput {
            code: output.status.code(),
            stdout: output.stdout,
            stderr: output.stderr,
        })
    }
}

/// Runs operations against the backup tool.
///
/// Holds no mutable state, so clones can be used freely from concurrent
/// request handlers.
#[derive(Clone)]
pub struct CommandRunner {
    config: Arc<RunnerConfig>,
    spawner: Arc<dyn ProcessSpawner>,
}

impl std::fmt::Debug for CommandRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandRunner")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl CommandRunner {
    /// Create a runner that spawns real processes.
    pub fn new(config: RunnerConfig) -> Self {
        Self::with_spawner(config, Arc::new(SystemSpawner))
    }

    /// Create a runner with a custom spawner.
    pub fn with_spawner(config: RunnerConfig, spawner: Arc<dyn ProcessSpawner>) -> Self {
        Self {
            config: Arc::new(config),
            spawner,
        }
    }

    /// Get the runner configuration.
    pub fn config(&self) -> &RunnerConfig {
        &self.config
    }

    /// Build the argument vector for an operation.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Arity`] if `ids` does not match the operation's arity,
    /// and [`CoreError::InvalidIdentifier`] if an identifier starts with `-`.
    pub fn build_argv<S: AsRef<str>>(&self, op: Operation, ids: &[S]) -> Result<Vec<String>> {
        if ids.len() != op.arity() {
            return Err(CoreError::Arity {
                operation: op,
                expected: op.arity(),
                actual: ids.len(),
            });
        }

        // The argv carries no `--` separator, so an identifier cannot look like an option
        if let Some(id) = ids.iter().map(|id| id.as_ref()).find(|id| id.starts_with('-')) {
            return Err(CoreError::InvalidIdentifier {
                operation: op,
                identifier: id.to_string(),
            });
        }

        let mut argv = Vec::with_capacity(self.config.prefix.len() + 4 + ids.len());
        argv.extend(self.config.prefix.iter().cloned());
        argv.push(self.config.tool_path.clone());
        argv.push("-f".to_string());
        argv.push("json".to_string());
        argv.push(op.subcommand().to_string());
        argv.extend(ids.iter().map(|id| id.as_ref().to_string()));
        Ok(argv)
    }

    /// Run an operation and parse its JSON output.
    ///
    /// Spawns exactly one child process. Nothing is retried.
    ///
    /// # Errors
    ///
    /// - [`CoreError::Arity`] or [`CoreError::InvalidIdentifier`] before anything
    ///   is spawned
    /// - [`CoreError::Execution`] if the process cannot start, times out,
    ///   is killed, or exits non-zero without valid JSON on stdout
    /// - [`CoreError::Parse`] if a successful run prints invalid JSON
    pub async fn run<S: AsRef<str>>(&self, op: Operation, ids: &[S]) -> Result<Value> {
        let argv = self.build_argv(op, ids)?;
        let program = argv[0].clone();
        debug!(operation = %op, argv = ?argv, "running tool");

        let spawn = self.spawner.spawn(&argv);
        let spawned = match self.config.timeout {
            Some(limit) => match tokio::time::timeout(limit, spawn).await {
                Ok(result) => result,
                Err(_) => {
                    warn!(operation = %op, timeout = ?limit, "tool timed out");
                    return Err(CoreError::Execution {
                        program,
                        reason: format!("timed out after {limit:?}"),
                    });
                }
            },
            None => spawn.await,
        };

        let output = spawned.map_err(|e| {
            warn!(operation = %op, program = %program, error = %e, "failed to spawn tool");
            CoreError::Execution {
                program: program.clone(),
                reason: e.to_string(),
            }
        })?;

        debug!(
            operation = %op,
            code = ?output.code,
            stdout_len = output.stdout.len(),
            stderr_len = output.stderr.len(),
            "tool exited"
        );
        trace!(stdout = %String::from_utf8_lossy(&output.stdout), "tool output");

        if output.success() {
            return parse_output(op, &output.stdout);
        }

        // `check` exits non-zero when a check fails but still prints its report
        match parse_output(op, &output.stdout) {
            Ok(value) => {
                warn!(operation = %op, code = ?output.code, "tool exited non-zero, keeping its JSON output");
                Ok(value)
            }
            Err(_) => {
                let reason = exit_reason(&output);
                warn!(operation = %op, program = %program, reason = %reason, "tool failed");
                Err(CoreError::Execution { program, reason })
            }
        }
    }
}

/// Decode stdout as UTF-8 and parse it as one JSON document.
fn parse_output(op: Operation, stdout: &[u8]) -> Result<Value> {
    let text = std::str::from_utf8(stdout).map_err(|e| CoreError::Parse {
        subcommand: op.subcommand(),
        reason: format!("output is not UTF-8: {e}"),
    })?;

    serde_json::from_str(text).map_err(|e| CoreError::Parse {
        subcommand: op.subcommand(),
        reason: e.to_string(),
    })
}

/// Describe a failed exit for an error message.
fn exit_reason(output: &ProcessOutput) -> String {
    let status = match output.code {
        Some(code) => format!("exited with status {code}"),
        None => "terminated by signal".to_string(),
    };

    let stderr = String::from_utf8_lossy(&output.stderr);
    let stderr = truncate(stderr.trim(), MAX_STDERR_IN_ERROR);
    if stderr.is_empty() {
        status
    } else {
        format!("{status}: {stderr}")
    }
}

/// Truncate to at most `max_bytes`, keeping UTF-8 boundaries.
fn truncate(s: &str, max_bytes: usize) -> &str {
    if s.len() <= max_bytes {
        return s;
    }
    let mut end = max_bytes;
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}
