use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::db::{StoreError, UserStore};

/// Spawn the expired-token sweeper. It stops once `shutdown` flips to true.
pub fn spawn_sweeper(
    store: Arc<dyn UserStore>,
    interval: Duration,
    shutdown: watch::Receiver<bool>,
) -> JoinHandle<()> {
    tokio::spawn(run(store, interval, shutdown))
}

async fn run(store: Arc<dyn UserStore>, interval: Duration, mut shutdown: watch::Receiver<bool>) {
    tracing::info!("Reset token sweeper started (every {}s)", interval.as_secs());

    loop {
        tokio::select! {
            _ = tokio::time::sleep(interval) => {}
            changed = shutdown.changed() => {
                // A dropped sender also means shutdown.
                if changed.is_err() {
                    break;
                }
            }
        }

        if *shutdown.borrow() {
            break;
        }

        match sweep_once(store.as_ref(), Utc::now()).await {
            Ok(0) => {}
            Ok(count) => tracing::info!(cleaned = count, "Cleared expired reset tokens"),
            Err(e) => tracing::error!("Reset token sweep failed: {e}"),
        }
    }

    tracing::info!("Reset token sweeper stopped");
}

pub async fn sweep_once(store: &dyn UserStore, now: DateTime<Utc>) -> Result<u64, StoreError> {
    store.purge_expired(now).await
}
