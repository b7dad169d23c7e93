// src/store/memory.rs — In-process SessionStore

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;

use super::SessionStore;
use crate::core::session::{Session, SessionPatch, SessionStatus};
use crate::infra::errors::{PurgeError, PurgeResult};

/// Sessions kept in a map. Nothing survives the process.
#[derive(Default)]
pub struct MemoryStore {
    sessions: RwLock<HashMap<String, Session>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}

#[async_trait]
impl SessionStore for MemoryStore {
    async fn create(&self, session: Session) -> PurgeResult<()> {
        let mut sessions = self.sessions.write().await;
        if sessions.contains_key(&session.id) {
            return Err(anyhow::anyhow!("session '{}' already exists", session.id).into());
        }
        sessions.insert(session.id.clone(), session);
        Ok(())
    }

    async fn get(&self, id: &str) -> PurgeResult<Option<Session>> {
        Ok(self.sessions.read().await.get(id).cloned())
    }

    async fn update(&self, id: &str, patch: SessionPatch) -> PurgeResult<()> {
        let mut sessions = self.sessions.write().await;
        let session = sessions
            .get_mut(id)
            .ok_or_else(|| PurgeError::SessionNotFound(id.to_string()))?;
        patch.check_transition(session)?;
        patch.apply(session);
        session.updated_at = Utc::now();
        Ok(())
    }

    async fn update_if_status(
        &self,
        id: &str,
        expected: SessionStatus,
        patch: SessionPatch,
    ) -> PurgeResult<bool> {
        let mut sessions = self.sessions.write().await;
        match sessions.get_mut(id) {
            Some(session) if session.status == expected => {
                patch.check_transition(session)?;
                patch.apply(session);
                session.updated_at = Utc::now();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn list_stale(
        &self,
        status: SessionStatus,
        cutoff: DateTime<Utc>,
    ) -> PurgeResult<Vec<Session>> {
        let sessions = self.sessions.read().await;
        let mut stale: Vec<Session> = sessions
            .values()
            .filter(|s| s.status == status && s.updated_at < cutoff)
            .cloned()
            .collect();
        stale.sort_by_key(|s| s.updated_at);
        Ok(stale)
    }
}
