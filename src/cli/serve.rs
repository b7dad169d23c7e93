// src/cli/serve.rs — Long-running service: API + runner + watchdog

use std::sync::Arc;

use crate::api::{self, ApiState};
use crate::core::{watchdog, PurgeService, TaskRunner};
use crate::infra::config::Config;
use crate::store::{spawn_store_server, SessionDb, SessionStore};
use crate::upstream::ReqwestTransport;

pub async fn run_serve(mut config: Config, port: Option<u16>, bind: Option<String>) -> anyhow::Result<()> {
    if let Some(port) = port {
        config.api.port = port;
    }
    if let Some(bind) = bind {
        config.api.bind = bind;
    }

    let db_path = config.storage.resolved_db_path();
    let db = SessionDb::open(&db_path)?;
    tracing::info!("Session database: {}", db_path.display());
    let (handle, store_task) = spawn_store_server(db);
    let store: Arc<dyn SessionStore> = Arc::new(handle);

    let transport = Arc::new(ReqwestTransport::new(config.upstream.timeout())?);
    let runner = Arc::new(TaskRunner::new());
    let service = Arc::new(PurgeService::new(
        &config,
        transport,
        store.clone(),
        runner.clone(),
    )?);

    let watchdog = config
        .watchdog
        .enabled
        .then(|| watchdog::spawn_watchdog(store.clone(), config.watchdog.clone()));

    let state = ApiState {
        service: service.clone(),
        runner,
    };
    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
        tracing::info!("Shutdown requested");
    };
    api::start_server(&config.api, state, shutdown).await?;

    if let Some(task) = watchdog {
        task.abort();
        let _ = task.await;
    }
    service.shutdown().await;

    // Last handles gone: the store server drains and exits
    drop(service);
    drop(store);
    let _ = store_task.await;

    tracing::info!("Stopped");
    Ok(())
}
