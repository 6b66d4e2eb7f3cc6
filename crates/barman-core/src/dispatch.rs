//! Static table of user-facing actions and the console facade that runs them.

use crate::cache::ServerListCache;
use crate::error::{CoreError, Result};
use crate::operation::Operation;
use crate::runner::CommandRunner;
use serde_json::Value;
use std::sync::Arc;

/// Role a session must hold to reach an action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    /// Full operator access.
    SuperAdmin,
}

/// Who may reach an action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    /// Any logged-in user.
    Login,
    /// Logged-in users holding the role.
    Role(Role),
}

/// What an action does when reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionKind {
    /// Landing page, only the navigation menu.
    Home,
    /// Drop the cached server list.
    RefreshList,
    /// Run an operation with the path identifiers.
    Run(Operation),
    /// Confirmation page before launching a backup. Runs nothing.
    PreLaunch,
}

/// One row of the dispatch table.
#[derive(Debug, Clone, Copy)]
pub struct Action {
    /// Stable action name.
    pub name: &'static str,
    /// Route, with `:param` segments for identifiers.
    pub path: &'static str,
    /// Page template the result is rendered with.
    pub page: &'static str,
    /// Behavior.
    pub kind: ActionKind,
    /// Access requirement.
    pub access: Access,
}

impl Action {
    /// Number of `:param` segments in the path.
    pub fn path_params(&self) -> usize {
        self.path
            .split('/')
            .filter(|segment| segment.starts_with(':'))
            .count()
    }
}

const ADMIN: Access = Access::Role(Role::SuperAdmin);

/// Every action the console exposes.
pub const ACTIONS: &[Action] = &[
    Action {
        name: "home",
        path: "/",
        page: "index_template",
        kind: ActionKind::Home,
        access: Access::Login,
    },
    Action {
        name: "refresh-list",
        path: "/refreshlist",
        page: "index_template",
        kind: ActionKind::RefreshList,
        access: ADMIN,
    },
    Action {
        name: "list-servers",
        path: "/listservers",
        page: "list_servers",
        kind: ActionKind::Run(Operation::ListServers),
        access: ADMIN,
    },
    Action {
        name: "status-server",
        path: "/statusserver/:server",
        page: "status_server",
        kind: ActionKind::Run(Operation::Status),
        access: ADMIN,
    },
    Action {
        name: "check-server",
        path: "/checkserver/:server",
        page: "check_server",
        kind: ActionKind::Run(Operation::Check),
        access: ADMIN,
    },
    Action {
        name: "list-backups",
        path: "/listbackupsserver/:server",
        page: "list_backup",
        kind: ActionKind::Run(Operation::ListBackups),
        access: ADMIN,
    },
    Action {
        name: "show-server",
        path: "/showserver/:server",
        page: "show_server",
        kind: ActionKind::Run(Operation::ShowServer),
        access: ADMIN,
    },
    Action {
        name: "show-backup",
        path: "/showbackup/:server/:backupid",
        page: "show_backup",
        kind: ActionKind::Run(Operation::ShowBackup),
        access: ADMIN,
    },
    Action {
        name: "delete-backup",
        path: "/deletebackup/:server/:backupid",
        page: "delete_backup",
        kind: ActionKind::Run(Operation::DeleteBackup),
        access: ADMIN,
    },
    Action {
        name: "prelaunch-backup",
        path: "/prelaunchbackup/:server",
        page: "pre_launch_backup",
        kind: ActionKind::PreLaunch,
        access: ADMIN,
    },
    Action {
        name: "launch-backup",
        path: "/launchbackup/:server",
        page: "launch_backup",
        kind: ActionKind::Run(Operation::LaunchBackup),
        access: ADMIN,
    },
];

/// Look up an action by name.
pub fn action(name: &str) -> Option<&'static Action> {
    ACTIONS.iter().find(|action| action.name == name)
}

/// Result of a dispatched operation plus the navigation menu.
#[derive(Debug, Clone, PartialEq)]
pub struct Dispatched {
    /// Parsed tool output.
    pub result: Arc<Value>,
    /// Current server list, absent if it could not be fetched.
    pub tab_menu: Option<Arc<Value>>,
}

/// Runs operations and keeps the server list cache.
///
/// Built once at startup and shared by every request handler.
#[derive(Debug, Clone)]
pub struct Console {
    runner: CommandRunner,
    servers: Arc<ServerListCache>,
}

impl Console {
    /// Create a console with an empty server list cache.
    pub fn new(runner: CommandRunner) -> Self {
        let servers = Arc::new(ServerListCache::new(runner.clone()));
        Self { runner, servers }
    }

    /// Get the command runner.
    pub fn runner(&self) -> &CommandRunner {
        &self.runner
    }

    /// Get the server list cache.
    pub fn server_list(&self) -> &ServerListCache {
        &self.servers
    }

    /// Run an operation and attach the navigation menu.
    ///
    /// `ListServers` is served from the cache; everything else runs the tool.
    ///
    /// # Errors
    ///
    /// Returns the operation's error. A failure to fetch the menu is not an
    /// error; `tab_menu` is `None` instead.
    pub async fn dispatch<S: AsRef<str>>(&self, op: Operation, ids: &[S]) -> Result<Dispatched> {
        tracing::debug!(operation = %op, "Dispatching operation");

        if op == Operation::ListServers {
            if !ids.is_empty() {
                return Err(CoreError::Arity {
                    operation: op,
                    expected: 0,
                    actual: ids.len(),
                });
            }
            let servers = self.servers.get().await?;
            return Ok(Dispatched {
                result: Arc::clone(&servers),
                tab_menu: Some(servers),
            });
        }

        let result = Arc::new(self.runner.run(op, ids).await?);
        Ok(Dispatched {
            result,
            tab_menu: self.menu().await,
        })
    }

    /// Navigation menu, fetching it on a cache miss.
    pub async fn menu(&self) -> Option<Arc<Value>> {
        match self.servers.get().await {
            Ok(servers) => Some(servers),
            Err(e) => {
                tracing::warn!(error = %e, "Navigation menu unavailable");
                None
            }
        }
    }

    /// Drop the cached server list.
    pub fn refresh(&self) {
        self.servers.invalidate();
    }
}
