//! # barman-core
//!
//! Command bridge between the Barman web console and the `barman` CLI.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                      barman-core                         │
//! ├──────────────────────────────────────────────────────────┤
//! │                                                          │
//! │  ┌─────────────────┐     ┌──────────────────────────┐   │
//! │  │    Console      │────▶│    ServerListCache       │   │
//! │  │  - dispatch()   │     │  - get()                 │   │
//! │  │  - menu()       │     │  - invalidate()          │   │
//! │  │  - refresh()    │     └──────────────────────────┘   │
//! │  └─────────────────┘                │ on miss           │
//! │           │                         ▼                   │
//! │           │              ┌──────────────────────────┐   │
//! │           └─────────────▶│    CommandRunner         │   │
//! │                          │  - build_argv()          │   │
//! │                          │  - run()                 │   │
//! │                          └──────────────────────────┘   │
//! │                                     │ argv, no shell    │
//! └─────────────────────────────────────┼────────────────────┘
//!                                       ▼
//!                 [prefix...] barman -f json <subcommand> <ids...>
//! ```
//!
//! ## Quick Start
//!
//! ```ignore
//! use barman_core::{CommandRunner, Console, Operation, RunnerConfig};
//!
//! # async fn example() -> barman_core::Result<()> {
//! let runner = CommandRunner::new(
//!     RunnerConfig::new("barman").prefix(["sudo", "-u", "barman"]),
//! );
//! let console = Console::new(runner);
//!
//! // Runs `sudo -u barman barman -f json status main`
//! let page = console.dispatch(Operation::Status, &["main"]).await?;
//! println!("{}", page.result);
//!
//! // Served from the cache after the first call
//! let servers = console.server_list().get().await?;
//! println!("{servers}");
//!
//! console.refresh();
//! # Ok(())
//! # }
//! ```

mod cache;
mod config;
mod dispatch;
mod error;
mod operation;
mod runner;

#[cfg(test)]
mod test_support;

pub use cache::{CacheStats, ServerListCache};
pub use config::{RunnerConfig, DEFAULT_TOOL};
pub use dispatch::{action, Access, Action, ActionKind, Console, Dispatched, Role, ACTIONS};
pub use error::{CoreError, Result};
pub use operation::Operation;
pub use runner::{CommandRunner, ProcessOutput, ProcessSpawner, SystemSpawner};

/// Parsed structured output of one tool invocation.
pub type CommandResult = serde_json::Value;
