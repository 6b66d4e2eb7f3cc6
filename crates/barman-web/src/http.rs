//! HTTP routes for the console.
//!
//! Routes come from the static action table in `barman-core`; each row
//! becomes one `GET` route behind the login or role gate it declares.
//!
//! ## Endpoints
//!
//! - `GET /` - Navigation menu (any logged-in user)
//! - `GET /refreshlist` - Drop the cached server list, redirect to `/`
//! - `GET /listservers` - Server list
//! - `GET /statusserver/:server`, `/checkserver/:server`,
//!   `/listbackupsserver/:server`, `/showserver/:server` - Per-server views
//! - `GET /showbackup/:server/:backupid`, `/deletebackup/:server/:backupid`
//! - `GET /prelaunchbackup/:server` - Confirmation, runs nothing
//! - `GET /launchbackup/:server` - Start a backup
//! - `GET /health` - Health check (no login)

use crate::auth::{require_login, require_superadmin};
use crate::pages::{FailurePage, Page};
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    middleware,
    response::{IntoResponse, Json, Redirect, Response},
    routing::{get, MethodRouter},
    Router,
};
use barman_core::{Access, Action, ActionKind, Operation, Role, ACTIONS};
use tower_http::trace::TraceLayer;

/// Build the HTTP router for the console.
pub fn build_router(state: AppState) -> Router {
    tracing::debug!("Building HTTP router");

    let mut open = Router::new();
    let mut admin = Router::new();

    for action in ACTIONS {
        let route = action_route(action);
        match action.access {
            Access::Login => open = open.route(action.path, route),
            Access::Role(Role::SuperAdmin) => admin = admin.route(action.path, route),
        }
    }

    let open = open.route_layer(middleware::from_fn_with_state(
        state.clone(),
        require_login,
    ));
    let admin = admin.route_layer(middleware::from_fn_with_state(
        state.clone(),
        require_superadmin,
    ));

    let router = Router::new()
        .route("/health", get(health_handler))
        .merge(open)
        .merge(admin)
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    tracing::debug!(actions = ACTIONS.len(), "HTTP router built");
    router
}

/// Handler for one action, extracting as many path segments as it declares.
fn action_route(action: &'static Action) -> MethodRouter<AppState> {
    match action.kind {
        ActionKind::Home => get(move |State(state): State<AppState>| async move {
            Page::new(action.page, state.console.menu().await)
        }),
        ActionKind::RefreshList => get(|State(state): State<AppState>| async move {
            state.console.refresh();
            Redirect::to("/")
        }),
        ActionKind::PreLaunch => get(
            move |State(state): State<AppState>, Path(server): Path<String>| async move {
                Page::new(action.page, state.console.menu().await).server(server)
            },
        ),
        ActionKind::Run(op) => match op.arity() {
            0 => get(move |State(state): State<AppState>| async move {
                run_action(state, action, op, Vec::new()).await
            }),
            1 => get(
                move |State(state): State<AppState>, Path(server): Path<String>| async move {
                    run_action(state, action, op, vec![server]).await
                },
            ),
            _ => get(
                move |State(state): State<AppState>,
                      Path((server, backup_id)): Path<(String, String)>| async move {
                    run_action(state, action, op, vec![server, backup_id]).await
                },
            ),
        },
    }
}

/// Dispatch an operation and render its page or a failure page.
async fn run_action(
    state: AppState,
    action: &'static Action,
    op: Operation,
    ids: Vec<String>,
) -> Response {
    tracing::info!(action = action.name, ids = ?ids, "Running action");

    match state.console.dispatch(op, ids.as_slice()).await {
        Ok(dispatched) => {
            let mut page = Page::new(action.page, dispatched.tab_menu).tab(dispatched.result);
            match op {
                Operation::ListBackups => {
                    page = page.datejour(chrono::Local::now().date_naive());
                }
                Operation::DeleteBackup | Operation::LaunchBackup => {
                    if let Some(server) = ids.into_iter().next() {
                        page = page.server(server);
                    }
                }
                _ => {}
            }
            page.into_response()
        }
        Err(e) => {
            tracing::error!(action = action.name, error = %e, "Action failed");
            FailurePage::new(e, state.console.server_list().peek()).into_response()
        }
    }
}

/// Health check endpoint.
async fn health_handler() -> impl IntoResponse {
    tracing::trace!("Health check request");
    Json(serde_json::json!({
        "status": "healthy",
        "service": "barman-web"
    }))
}

/// Start the HTTP server.
///
/// This function runs until the server is shut down via the provided
/// shutdown signal.
pub async fn serve(
    state: AppState,
    addr: std::net::SocketAddr,
    shutdown: impl std::future::Future<Output = ()> + Send + 'static,
) -> Result<(), std::io::Error> {
    let router = build_router(state);

    tracing::info!(%addr, "Starting HTTP server");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::debug!(%addr, "TCP listener bound");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown)
        .await
}
