//! Seeds one demo account into the configured store and logs a bearer
//! token for it.
//!
//! `SEED_EMAIL` and `SEED_PASSWORD` are required; `SEED_NAME` defaults to
//! "Demo Reader". An existing account is logged into instead.

use std::env;
use std::sync::Arc;

use anyhow::Context;
use auth_adapters::{Argon2Hasher, JwtAuthority};
use configs::Settings;
use domains::AppError;
use secrecy::ExposeSecret;
use services::{LoginRequest, SignupRequest, UserService};
use storage_adapters::{MemoryStore, Repositories};
use tracing::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_env_filter("info").compact().init();

    let settings = Settings::load().context("failed to load settings")?;
    let email = env::var("SEED_EMAIL").context("SEED_EMAIL is not set")?;
    let password = env::var("SEED_PASSWORD").context("SEED_PASSWORD is not set")?;
    let name = env::var("SEED_NAME").unwrap_or_else(|_| "Demo Reader".to_string());

    let repos = open_store(&settings).await?;
    let tokens = JwtAuthority::new(settings.auth.secret.expose_secret().as_bytes(), settings.auth.token_ttl_secs);
    let users = UserService::new(repos.users, Arc::new(Argon2Hasher::new()), Arc::new(tokens));

    let signup = SignupRequest { name, email: email.clone(), password: password.clone(), image: None };
    let session = match users.signup(signup).await {
        Ok(session) => {
            info!(user_id = %session.user_id, "demo user created");
            session
        }
        Err(AppError::Conflict(_)) => {
            info!("demo user exists already, logging in");
            users.login(LoginRequest { email, password }).await.context("failed to log in as the demo user")?
        }
        Err(e) => return Err(e).context("failed to create the demo user"),
    };

    info!(user_id = %session.user_id, email = %session.email, token = %session.token, "seed complete");
    Ok(())
}

async fn open_store(settings: &Settings) -> anyhow::Result<Repositories> {
    #[cfg(feature = "db-postgres")]
    if let Some(url) = &settings.database.url {
        let store = storage_adapters::PgStore::connect(url.expose_secret(), settings.database.max_connections)
            .await
            .context("failed to connect to postgres")?;
        store.migrate().await.context("failed to run migrations")?;
        return Ok(Repositories::from_store(Arc::new(store)));
    }

    warn!("no database configured; seeding the in-memory store, which is discarded on exit");
    Ok(Repositories::from_store(Arc::new(MemoryStore::new())))
}
