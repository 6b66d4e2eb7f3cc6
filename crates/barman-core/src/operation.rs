//! The closed set of operations the console can run against the tool.

use serde::Serialize;
use std::fmt;

/// A named action with a fixed number of positional identifiers.
///
/// Each operation maps to exactly one tool subcommand. The mapping is static:
/// identifiers never influence which subcommand runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Operation {
    /// List every server the tool manages.
    ListServers,
    /// Status of one server.
    Status,
    /// Run the tool's health checks for one server.
    Check,
    /// List the backups of one server.
    ListBackups,
    /// Configuration details of one server.
    ShowServer,
    /// Details of one backup of a server.
    ShowBackup,
    /// Delete one backup of a server.
    DeleteBackup,
    /// Start a new backup of a server.
    LaunchBackup,
}

impl Operation {
    /// Every operation, in menu order.
    pub const ALL: [Operation; 8] = [
        Operation::ListServers,
        Operation::Status,
        Operation::Check,
        Operation::ListBackups,
        Operation::ShowServer,
        Operation::ShowBackup,
        Operation::DeleteBackup,
        Operation::LaunchBackup,
    ];

    /// Tool subcommand this operation invokes.
    pub fn subcommand(self) -> &'static str {
        match self {
            Operation::ListServers => "list-server",
            Operation::Status => "status",
            Operation::Check => "check",
            Operation::ListBackups => "list-backup",
            Operation::ShowServer => "show-server",
            Operation::ShowBackup => "show-backup",
            Operation::DeleteBackup => "delete",
            Operation::LaunchBackup => "backup",
        }
    }

    /// Number of identifiers (server name, then backup id) the operation takes.
    pub fn arity(self) -> usize {
        match self {
            Operation::ListServers => 0,
            Operation::Status
            | Operation::Check
            | Operation::ListBackups
            | Operation::ShowServer
            | Operation::LaunchBackup => 1,
            Operation::ShowBackup | Operation::DeleteBackup => 2,
        }
    }

    /// Stable name used in logs and error messages.
    pub fn name(self) -> &'static str {
        match self {
            Operation::ListServers => "list-servers",
            Operation::Status => "status",
            Operation::Check => "check",
            Operation::ListBackups => "list-backups",
            Operation::ShowServer => "show-server",
            Operation::ShowBackup => "show-backup",
            Operation::DeleteBackup => "delete-backup",
            Operation::LaunchBackup => "launch-backup",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_subcommands_are_unique() {
        let subcommands: HashSet<_> = Operation::ALL.iter().map(|op| op.subcommand()).collect();
        assert_eq!(subcommands.len(), Operation::ALL.len());
    }

    #[test]
    fn test_arity() {
        assert_eq!(Operation::ListServers.arity(), 0);
        assert_eq!(Operation::Status.arity(), 1);
        assert_eq!(Operation::LaunchBackup.arity(), 1);
        assert_eq!(Operation::ShowBackup.arity(), 2);
        assert_eq!(Operation::DeleteBackup.arity(), 2);
    }

    #[test]
    fn test_tool_subcommand_names() {
        assert_eq!(Operation::ListServers.subcommand(), "list-server");
        assert_eq!(Operation::ListBackups.subcommand(), "list-backup");
        assert_eq!(Operation::DeleteBackup.subcommand(), "delete");
        assert_eq!(Operation::LaunchBackup.subcommand(), "backup");
    }

    #[test]
    fn test_serialize_name() {
        let json = serde_json::to_string(&Operation::ListBackups).unwrap();
        assert_eq!(json, "\"list-backups\"");
    }
}
