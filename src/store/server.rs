// src/store/server.rs — Async message passing for SessionDb

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::{mpsc, oneshot};

use super::sqlite::SessionDb;
use super::SessionStore;
use crate::core::session::{Session, SessionPatch, SessionStatus};
use crate::infra::errors::{PurgeError, PurgeResult};

type Reply<T> = oneshot::Sender<PurgeResult<T>>;

pub enum StoreCommand {
    Insert {
        session: Session,
        resp: Reply<()>,
    },
    Get {
        id: String,
        resp: Reply<Option<Session>>,
    },
    Update {
        id: String,
        patch: SessionPatch,
        resp: Reply<Option<Session>>,
    },
    UpdateIfStatus {
        id: String,
        expected: SessionStatus,
        patch: SessionPatch,
        resp: Reply<bool>,
    },
    ListStale {
        status: SessionStatus,
        cutoff: DateTime<Utc>,
        resp: Reply<Vec<Session>>,
    },
}

/// A handle to the SessionDb that uses message passing.
#[derive(Clone)]
pub struct StoreHandle {
    tx: mpsc::Sender<StoreCommand>,
}

impl StoreHandle {
    pub fn new(tx: mpsc::Sender<StoreCommand>) -> Self {
        Self { tx }
    }

    async fn call<T>(
        &self,
        build: impl FnOnce(Reply<T>) -> StoreCommand,
    ) -> PurgeResult<T> {
        let (resp_tx, resp_rx) = oneshot::channel();
        self.tx
            .send(build(resp_tx))
            .await
            .map_err(|_| anyhow::anyhow!("session store server has stopped"))?;
        let res = resp_rx
            .await
            .map_err(|_| anyhow::anyhow!("session store server dropped the reply"))?;
        res
    }
}

#[async_trait]
impl SessionStore for StoreHandle {
    async fn create(&self, session: Session) -> PurgeResult<()> {
        self.call(|resp| StoreCommand::Insert { session, resp }).await
    }

    async fn get(&self, id: &str) -> PurgeResult<Option<Session>> {
        let id = id.to_string();
        self.call(|resp| StoreCommand::Get { id, resp }).await
    }

    async fn update(&self, id: &str, patch: SessionPatch) -> PurgeResult<()> {
        let key = id.to_string();
        let merged = self
            .call(|resp| StoreCommand::Update {
                id: key,
                patch,
                resp,
            })
            .await?;
        merged
            .map(|_| ())
            .ok_or_else(|| PurgeError::SessionNotFound(id.to_string()))
    }

    async fn update_if_status(
        &self,
        id: &str,
        expected: SessionStatus,
        patch: SessionPatch,
    ) -> PurgeResult<bool> {
        let id = id.to_string();
        self.call(|resp| StoreCommand::UpdateIfStatus {
            id,
            expected,
            patch,
            resp,
        })
        .await
    }

    async fn list_stale(
        &self,
        status: SessionStatus,
        cutoff: DateTime<Utc>,
    ) -> PurgeResult<Vec<Session>> {
        self.call(|resp| StoreCommand::ListStale {
            status,
            cutoff,
            resp,
        })
        .await
    }
}

/// Helper to spawn the store server and return a handle.
pub fn spawn_store_server(db: SessionDb) -> (StoreHandle, tokio::task::JoinHandle<()>) {
    let (tx, rx) = mpsc::channel(100);
    let handle = StoreHandle::new(tx);
    let join_handle = tokio::spawn(run_store_server(db, rx));
    (handle, join_handle)
}

/// The background task that owns the SessionDb. Exits once every handle is dropped.
pub async fn run_store_server(db: SessionDb, mut rx: mpsc::Receiver<StoreCommand>) {
    while let Some(cmd) = rx.recv().await {
        match cmd {
            StoreCommand::Insert { session, resp } => {
                let _ = resp.send(db.insert(&session).map_err(PurgeError::from));
            }
            StoreCommand::Get { id, resp } => {
                let _ = resp.send(db.get(&id).map_err(PurgeError::from));
            }
            StoreCommand::Update { id, patch, resp } => {
                let _ = resp.send(db.update(&id, &patch));
            }
            StoreCommand::UpdateIfStatus {
                id,
                expected,
                patch,
                resp,
            } => {
                let _ = resp.send(db.update_if_status(&id, expected, &patch));
            }
            StoreCommand::ListStale {
                status,
                cutoff,
                resp,
            } => {
                let _ = resp.send(db.list_stale(status, cutoff).map_err(PurgeError::from));
            }
        }
    }
    tracing::debug!("Session store server stopped");
}
