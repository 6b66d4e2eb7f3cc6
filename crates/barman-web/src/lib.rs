//! # barman-web
//!
//! Web console for inspecting and driving Barman backups.
//!
//! ## Quick Start
//!
//! Run the server with default configuration:
//!
//! ```bash
//! BARMAN_WEB_ADMIN_PASSWORD=changeme cargo run -p barman-web
//! ```
//!
//! Run `barman` as another user:
//!
//! ```bash
//! export BARMAN_WEB_USE_PREFIX=true
//! export BARMAN_WEB_PREFIX="sudo -u barman"
//! cargo run -p barman-web
//! ```
//!
//! ## Pages
//!
//! | Route | Barman command |
//! |-------|----------------|
//! | `/listservers` | `list-server` (cached) |
//! | `/refreshlist` | clears the cache |
//! | `/statusserver/:server` | `status` |
//! | `/checkserver/:server` | `check` |
//! | `/listbackupsserver/:server` | `list-backup` |
//! | `/showserver/:server` | `show-server` |
//! | `/showbackup/:server/:backupid` | `show-backup` |
//! | `/deletebackup/:server/:backupid` | `delete` |
//! | `/prelaunchbackup/:server` | none |
//! | `/launchbackup/:server` | `backup` |

pub mod auth;
mod config;
pub mod http;
mod pages;
mod state;

pub use auth::{User, UserStore};
pub use config::{ConfigError, WebConfig, DEFAULT_HTTP_PORT, DEFAULT_PREFIX};
pub use pages::{AuthFailure, FailurePage, Page};
pub use state::AppState;
