// src/cli/reap.rs — One-off stall sweep

use std::time::Duration;

use crate::core::watchdog;
use crate::infra::config::Config;
use crate::store::{spawn_store_server, SessionDb};

pub async fn run_reap(config: &Config, older_than_secs: Option<u64>) -> anyhow::Result<()> {
    let stale_after =
        Duration::from_secs(older_than_secs.unwrap_or(config.watchdog.stale_after_secs));

    let db_path = config.storage.resolved_db_path();
    if !db_path.exists() {
        println!("No database found at: {}", db_path.display());
        return Ok(());
    }

    let (store, store_task) = spawn_store_server(SessionDb::open(&db_path)?);
    let reaped = watchdog::reap_stale(&store, stale_after).await?;
    drop(store);
    let _ = store_task.await;

    println!(
        "Marked {} stalled session(s) as error (no progress for {}s).",
        reaped,
        stale_after.as_secs()
    );
    Ok(())
}
