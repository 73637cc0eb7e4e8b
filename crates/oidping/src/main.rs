mod app;
mod config;
mod error;
mod handlers;
mod middleware;
mod state;

use std::{str::FromStr, sync::Arc};

use anyhow::{Context, Result};
use clap::Parser;
use listenfd::ListenFd;
use oidping_auth::{AuthConfig, AuthState, EnvSource, SqliteSessionStore, SqliteUserStore};
use oidping_core::auth::{load, SchemeRegistry};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use tokio::{net::TcpListener, signal};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::{app::create_app, config::Config, state::AppState};

/// oidping - Sign users in through an OpenID Connect authority
#[derive(Parser, Debug)]
#[command(name = "oidping")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Host address to bind the server to
    #[arg(long, short = 'H', default_value = "0.0.0.0", env = "HOST")]
    host: String,

    /// Port to listen on
    #[arg(long, short, default_value = "3000", env = "PORT")]
    port: u16,

    /// Port for the mock identity provider
    #[cfg(feature = "mock")]
    #[arg(long, default_value = "3001", env = "MOCK_IDP_PORT")]
    mock_idp_port: u16,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing subscriber
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "oidping=debug,oidping_auth=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Configuration problems stop the process before anything binds
    let config = Config::from_env().context("loading application configuration")?;
    let auth_config = AuthConfig::from_env().context("loading auth configuration")?;
    let settings = load(&EnvSource).context("loading OpenIdConnect settings")?;
    let schemes = SchemeRegistry::standard();

    tracing::info!(
        environment = %config.environment,
        authority = %settings.authority,
        client_id = %settings.client_id,
        "starting oidping"
    );

    let state = AppState::new(init_auth(&config, auth_config, settings, schemes).await?, config);

    #[cfg(feature = "mock")]
    spawn_mock_idp(cli.mock_idp_port);

    // Build the application router
    let app = create_app(state);

    // Auto-reload support via listenfd
    let mut listenfd = ListenFd::from_env();
    let listener = match listenfd.take_tcp_listener(0)? {
        // If we are given a tcp listener on listen fd 0, use that one
        Some(listener) => {
            listener.set_nonblocking(true)?;
            TcpListener::from_std(listener)?
        }
        // Otherwise fall back to CLI-specified host:port
        None => {
            let addr = format!("{}:{}", cli.host, cli.port);
            TcpListener::bind(&addr).await?
        }
    };

    tracing::info!("listening on {}", listener.local_addr()?);

    // Run the server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

/// Open the identity store and connect to the authority.
async fn init_auth(
    config: &Config,
    auth_config: AuthConfig,
    settings: oidping_core::auth::OidcSettings,
    schemes: SchemeRegistry,
) -> Result<AuthState> {
    let options = SqliteConnectOptions::from_str(&config.default_connection)
        .context("parsing ConnectionStrings:DefaultConnection")?
        .create_if_missing(true);
    let pool = SqlitePoolOptions::new()
        .connect_with(options)
        .await
        .context("opening the identity store")?;

    let sessions = SqliteSessionStore::new(pool.clone());
    sessions.migrate().await?;
    let users = SqliteUserStore::new(pool);
    users.migrate().await?;

    let auth = AuthState::connect(
        Arc::new(sessions),
        Arc::new(users),
        settings,
        schemes,
        auth_config,
    )
    .await
    .context("connecting to the OpenID Connect authority")?;

    Ok(auth)
}

#[cfg(feature = "mock")]
fn spawn_mock_idp(port: u16) {
    tokio::spawn(async move {
        if let Err(e) = oidping_auth::mock_idp::MockIdpServer::new(port).run().await {
            tracing::error!(error = %e, "mock IdP stopped");
        }
    });
}

/// Wait for shutdown signals (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, shutting down...");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, shutting down...");
        }
    }
}
