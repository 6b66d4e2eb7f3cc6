//! Users, roles, and the HTTP Basic gate in front of the console routes.

use crate::pages::AuthFailure;
use crate::state::AppState;
use axum::extract::{Request, State};
use axum::http::header::AUTHORIZATION;
use axum::http::HeaderMap;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use barman_core::{Access, Role};
use base64::{engine::general_purpose, Engine as _};
use std::collections::HashMap;
use std::sync::RwLock;

/// A console user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub username: String,
    pub password: String,
    pub active: bool,
    pub roles: Vec<Role>,
}

impl User {
    /// Whether the user holds `role`.
    pub fn has_role(&self, role: Role) -> bool {
        self.roles.contains(&role)
    }

    /// Whether the user may reach an action with the given access rule.
    pub fn can_access(&self, access: Access) -> bool {
        match access {
            Access::Login => true,
            Access::Role(role) => self.has_role(role),
        }
    }
}

/// In-memory user table. Usernames are case-insensitive.
#[derive(Debug, Default)]
pub struct UserStore {
    users: RwLock<HashMap<String, User>>,
}

impl UserStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create the administrator unless a user with that name already exists.
    ///
    /// Returns `true` if the user was created.
    pub fn bootstrap_admin(&self, username: &str, password: &str) -> bool {
        let key = username.to_lowercase();
        let mut users = self.users.write().unwrap_or_else(|e| e.into_inner());
        if users.contains_key(&key) {
            tracing::debug!(username, "Administrator already exists");
            return false;
        }

        users.insert(
            key,
            User {
                username: username.to_string(),
                password: password.to_string(),
                active: true,
                roles: vec![Role::SuperAdmin],
            },
        );
        tracing::info!(username, "Bootstrap administrator created");
        true
    }

    /// Add or replace a user.
    pub fn insert(&self, user: User) {
        let mut users = self.users.write().unwrap_or_else(|e| e.into_inner());
        users.insert(user.username.to_lowercase(), user);
    }

    /// Check credentials. Inactive users never authenticate.
    pub fn authenticate(&self, username: &str, password: &str) -> Option<User> {
        let users = self.users.read().unwrap_or_else(|e| e.into_inner());
        users
            .get(&username.to_lowercase())
            .filter(|user| user.active && user.password == password)
            .cloned()
    }

    /// Number of users.
    pub fn len(&self) -> usize {
        self.users.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// Whether the store has no users.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Extract `(username, password)` from an `Authorization: Basic` header.
pub fn basic_credentials(headers: &HeaderMap) -> Option<(String, String)> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, encoded) = value.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("basic") {
        return None;
    }

    let decoded = general_purpose::STANDARD.decode(encoded.trim()).ok()?;
    let decoded = String::from_utf8(decoded).ok()?;
    let (username, password) = decoded.split_once(':')?;
    Some((username.to_string(), password.to_string()))
}

/// Resolve the request's user and check it against `access`.
fn authorize(state: &AppState, headers: &HeaderMap, access: Access) -> Result<User, AuthFailure> {
    let Some((username, password)) = basic_credentials(headers) else {
        return Err(AuthFailure::Unauthenticated);
    };

    let Some(user) = state.users.authenticate(&username, &password) else {
        tracing::warn!(username = %username, "Rejected login");
        return Err(AuthFailure::Unauthenticated);
    };

    if !user.can_access(access) {
        tracing::warn!(username = %user.username, ?access, "Missing role");
        return Err(AuthFailure::Forbidden);
    }

    Ok(user)
}

async fn gate(state: AppState, access: Access, mut request: Request, next: Next) -> Response {
    match authorize(&state, request.headers(), access) {
        Ok(user) => {
            tracing::trace!(username = %user.username, path = %request.uri().path(), "Authorized");
            request.extensions_mut().insert(user);
            next.run(request).await
        }
        Err(failure) => failure.into_response(),
    }
}

/// Middleware: any authenticated user.
pub async fn require_login(State(state): State<AppState>, request: Request, next: Next) -> Response {
    gate(state, Access::Login, request, next).await
}

/// Middleware: authenticated user holding `SuperAdmin`.
pub async fn require_superadmin(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    gate(state, Access::Role(Role::SuperAdmin), request, next).await
}
