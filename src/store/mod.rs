// src/store/mod.rs — Durable session records
//
// The core only sees the `SessionStore` trait. Two implementations: the SQLite
// actor (`StoreHandle`) for real runs, and `MemoryStore` for tests and
// throwaway instances.

pub mod memory;
pub mod schema;
pub mod server;
pub mod sqlite;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::core::session::{Session, SessionPatch, SessionStatus};
use crate::infra::errors::{PurgeError, PurgeResult};

pub use memory::MemoryStore;
pub use server::{spawn_store_server, StoreHandle};
pub use sqlite::SessionDb;

#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn create(&self, session: Session) -> PurgeResult<()>;

    async fn get(&self, id: &str) -> PurgeResult<Option<Session>>;

    /// Field merge; refreshes `updated_at`. Fails with `SessionNotFound`.
    async fn update(&self, id: &str, patch: SessionPatch) -> PurgeResult<()>;

    /// Compare-and-set: merge only while the session is in `expected`.
    /// Returns whether the write happened.
    async fn update_if_status(
        &self,
        id: &str,
        expected: SessionStatus,
        patch: SessionPatch,
    ) -> PurgeResult<bool>;

    /// Sessions in `status` with no write since `cutoff`, oldest first.
    async fn list_stale(
        &self,
        status: SessionStatus,
        cutoff: DateTime<Utc>,
    ) -> PurgeResult<Vec<Session>>;

    /// Progress write for a running sweep. Fails with `RunSuperseded` once the
    /// session has left `processing`.
    async fn record_progress(&self, id: &str, patch: SessionPatch) -> PurgeResult<()> {
        if self
            .update_if_status(id, SessionStatus::Processing, patch)
            .await?
        {
            Ok(())
        } else {
            Err(PurgeError::RunSuperseded(id.to_string()))
        }
    }

    /// `RunSuperseded` unless the session is still `processing`.
    async fn ensure_processing(&self, id: &str) -> PurgeResult<()> {
        match self.get(id).await? {
            Some(session) if session.status == SessionStatus::Processing => Ok(()),
            Some(_) => Err(PurgeError::RunSuperseded(id.to_string())),
            None => Err(PurgeError::SessionNotFound(id.to_string())),
        }
    }
}
