//! Barman web console entry point.
//!
//! Loads configuration from the environment, seeds the administrator, and
//! serves the console over HTTP until Ctrl-C.

use barman_core::{CommandRunner, Console};
use barman_web::{http, AppState, UserStore, WebConfig};
use tokio::signal;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            EnvFilter::from_default_env()
                .add_directive("barman_web=info".parse()?)
                .add_directive("barman_core=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    tracing::info!("Starting Barman web console");

    let config = WebConfig::from_env()?;
    tracing::info!(?config, "Configuration loaded");

    // Warn-only so the console can start before barman is installed
    config.validate_warn();

    let users = UserStore::new();
    let password = match &config.admin_password {
        Some(password) => password.clone(),
        None => {
            let generated = uuid::Uuid::new_v4().simple().to_string();
            // Shown once on the terminal, never through the log pipeline
            eprintln!(
                "Administrator password for {}: {}",
                config.admin_username, generated
            );
            tracing::warn!(
                username = %config.admin_username,
                "No administrator password configured, generated one; set BARMAN_WEB_ADMIN_PASSWORD to choose it"
            );
            generated
        }
    };
    users.bootstrap_admin(&config.admin_username, &password);

    let runner = CommandRunner::new(config.runner_config());
    tracing::info!(runner = ?runner.config(), "Command runner ready");

    let state = AppState::new(Console::new(runner), users);

    let shutdown = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for shutdown signal");
        }
        tracing::info!("Received shutdown signal");
    };

    tracing::info!(addr = %config.http_addr, "Server ready");
    http::serve(state, config.http_addr, shutdown).await?;

    tracing::info!("Server shutdown complete");
    Ok(())
}
