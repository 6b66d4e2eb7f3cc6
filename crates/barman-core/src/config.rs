//! Command-execution context.

use std::time::Duration;

/// Default name of the backup tool binary, resolved through `PATH`.
pub const DEFAULT_TOOL: &str = "barman";

/// How the tool is invoked. Read-only once the runner is built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunnerConfig {
    /// Path or name of the tool binary.
    pub tool_path: String,
    /// Wrapping command prepended unmodified to every invocation
    /// (e.g. `["sudo", "-u", "barman"]`). Empty means none.
    pub prefix: Vec<String>,
    /// Upper bound on a single invocation. `None` waits indefinitely.
    pub timeout: Option<Duration>,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            tool_path: DEFAULT_TOOL.to_string(),
            prefix: Vec::new(),
            timeout: None,
        }
    }
}

impl RunnerConfig {
    /// Config for the given tool binary with no prefix and no timeout.
    pub fn new(tool_path: impl Into<String>) -> Self {
        Self {
            tool_path: tool_path.into(),
            ..Default::default()
        }
    }

    /// Set the wrapping prefix.
    pub fn prefix<I, S>(mut self, prefix: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.prefix = prefix.into_iter().map(Into::into).collect();
        self
    }

    /// Set the per-invocation timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}
