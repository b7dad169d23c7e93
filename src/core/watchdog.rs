// src/core/watchdog.rs — Reclassify stalled `processing` sessions
//
// A run that dies with the process leaves its session in `processing`
// forever. Anything without a write for `stale_after` is moved to `error`.

use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;

use super::session::{SessionPatch, SessionStatus};
use crate::infra::config::WatchdogConfig;
use crate::infra::errors::{PurgeError, PurgeResult};
use crate::store::SessionStore;

/// One sweep. Returns how many sessions were moved to `error`.
pub async fn reap_stale(store: &dyn SessionStore, stale_after: Duration) -> PurgeResult<usize> {
    let window = chrono::Duration::from_std(stale_after)
        .map_err(|e| PurgeError::Config(format!("stale window out of range: {e}")))?;
    let cutoff = Utc::now() - window;

    let stale = store.list_stale(SessionStatus::Processing, cutoff).await?;
    let mut reaped = 0;

    for session in stale {
        let message = format!(
            "processing stalled: no progress since {}",
            session.updated_at.format("%Y-%m-%d %H:%M:%S UTC")
        );
        // A run that finishes in the meantime wins
        if store
            .update_if_status(&session.id, SessionStatus::Processing, SessionPatch::failed(message))
            .await?
        {
            tracing::warn!(
                "Session {}: stalled at {}/{}, marked as error",
                session.id,
                session.processed_items,
                session.total_items
            );
            reaped += 1;
        }
    }

    Ok(reaped)
}

/// Run [`reap_stale`] every `interval_secs` until the task is aborted.
pub fn spawn_watchdog(
    store: Arc<dyn SessionStore>,
    config: WatchdogConfig,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let stale_after = Duration::from_secs(config.stale_after_secs);
        let mut ticker = tokio::time::interval(Duration::from_secs(config.interval_secs.max(1)));
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            match reap_stale(store.as_ref(), stale_after).await {
                Ok(0) => {}
                Ok(n) => tracing::info!("Watchdog reclassified {} stalled session(s)", n),
                Err(e) => tracing::error!("Watchdog sweep failed: {}", e),
            }
        }
    })
}
