//! Shared state handed to every request handler.

use crate::auth::UserStore;
use barman_core::Console;
use std::sync::Arc;

/// Application state.
#[derive(Clone)]
pub struct AppState {
    /// Command bridge and server list cache.
    pub console: Console,
    /// Users allowed to log in.
    pub users: Arc<UserStore>,
}

impl AppState {
    pub fn new(console: Console, users: UserStore) -> Self {
        Self {
            console,
            users: Arc::new(users),
        }
    }
}
