//! # Bookshelf Binary
//!
//! Assembles the server from settings and compile-time features: picks the
//! store, builds the token authority and serves the router until Ctrl-C or
//! SIGTERM.

use std::sync::Arc;

use anyhow::Context;
use api_adapters::{router, AppState};
use auth_adapters::{Argon2Hasher, JwtAuthority};
use configs::{LogFormat, LogSettings, Settings};
use secrecy::ExposeSecret;
use storage_adapters::{MemoryStore, Repositories};
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = Settings::load().context("failed to load settings")?;
    init_tracing(&settings.log);

    let repos = open_store(&settings).await?;
    let tokens = JwtAuthority::new(settings.auth.secret.expose_secret().as_bytes(), settings.auth.token_ttl_secs);
    let state = AppState::new(repos, Arc::new(Argon2Hasher::new()), Arc::new(tokens));
    let app = router(state, &settings.cors.allowed_origins);

    let address = settings.bind_address();
    let listener = TcpListener::bind(&address).await.with_context(|| format!("failed to bind {address}"))?;
    info!(%address, "bookshelf listening");

    axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await?;
    info!("bookshelf stopped");
    Ok(())
}

/// `RUST_LOG` wins over the configured level.
fn init_tracing(log: &LogSettings) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&log.level));
    let installed = match log.format {
        LogFormat::Json => tracing_subscriber::fmt().with_env_filter(filter).json().try_init(),
        LogFormat::Text => tracing_subscriber::fmt().with_env_filter(filter).compact().try_init(),
    };
    if let Err(e) = installed {
        warn!(error = %e, "tracing init failed");
    }
}

async fn open_store(settings: &Settings) -> anyhow::Result<Repositories> {
    #[cfg(feature = "db-postgres")]
    if let Some(url) = &settings.database.url {
        let store = storage_adapters::PgStore::connect(url.expose_secret(), settings.database.max_connections)
            .await
            .context("failed to connect to postgres")?;
        store.migrate().await.context("failed to run migrations")?;
        info!(max_connections = settings.database.max_connections, "using postgres store");
        return Ok(Repositories::from_store(Arc::new(store)));
    }

    if settings.database.url.is_some() {
        warn!("database.url is set but this build has no postgres support");
    }
    warn!("using the in-memory store; data is lost on exit");
    Ok(Repositories::from_store(Arc::new(MemoryStore::new())))
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("shutdown signal received");
}
