use std::net::SocketAddr;
use std::sync::Arc;

use sqlx::postgres::PgPoolOptions;
use tokio::signal;
use tokio::sync::watch;
use tracing_subscriber::EnvFilter;

use pwreset::auth::{Argon2Hasher, PasswordHasher};
use pwreset::config::Config;
use pwreset::db::{MemoryUserStore, PgUserStore, UserStore};
use pwreset::email::{LogMailer, MailNotifier, SystemMailer};
use pwreset::state::AppState;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    let config = Config::from_env().expect("Failed to load configuration");

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(&config.log_level)
        }))
        .init();

    tracing::info!("Starting password reset service");

    let store: Arc<dyn UserStore> = match &config.database_url {
        Some(url) => {
            let pool = PgPoolOptions::new()
                .max_connections(10)
                .connect(url)
                .await
                .expect("Failed to connect to database");

            sqlx::migrate!("./migrations")
                .run(&pool)
                .await
                .expect("Failed to run migrations");

            tracing::info!("Migrations applied");
            Arc::new(PgUserStore::new(pool))
        }
        None => {
            tracing::warn!("DATABASE_URL not set, users are kept in memory");
            Arc::new(MemoryUserStore::new())
        }
    };

    let hasher: Arc<dyn PasswordHasher> = Arc::new(Argon2Hasher::new(
        config.argon2_memory_kib,
        config.argon2_iterations,
    )?);

    let mailer: Arc<dyn MailNotifier> = match config.smtp.as_ref().map(SystemMailer::new) {
        Some(Ok(mailer)) => {
            tracing::info!("System SMTP configured");
            Arc::new(mailer)
        }
        Some(Err(e)) => {
            tracing::warn!("System SMTP not available: {e}");
            Arc::new(LogMailer)
        }
        None => Arc::new(LogMailer),
    };

    pwreset::seed_users(store.as_ref(), hasher.as_ref(), &config.seed_users).await?;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let sweeper = config
        .sweep_interval
        .map(|interval| pwreset::worker::spawn_sweeper(store.clone(), interval, shutdown_rx));

    let addr = SocketAddr::new(config.host, config.port);
    let state = Arc::new(AppState::new(config, store, hasher, mailer));
    let app = pwreset::build_app(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Listening on {addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    let _ = shutdown_tx.send(true);
    if let Some(handle) = sweeper {
        let _ = handle.await;
    }

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received, starting graceful shutdown");
}
