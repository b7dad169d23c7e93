// src/core/deleter.rs — Batched, paced deletion
//
// Batches run one after another; deletes inside a batch run concurrently.
// `processed_items` advances by the batch size whatever the outcomes were.
// A session that leaves `processing` mid-run gets no further batches.

use futures::future::join_all;
use std::sync::Arc;

use crate::core::session::SessionPatch;
use crate::infra::config::SweepConfig;
use crate::infra::errors::PurgeResult;
use crate::oauth::TokenPair;
use crate::store::SessionStore;
use crate::upstream::{Tweet, TwitterClient};

/// What happened to one delete attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted { tweet_id: String },
    /// 2xx, but the API did not confirm the deletion.
    NotDeleted { tweet_id: String },
    Failed { tweet_id: String, reason: String },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeletionSummary {
    pub attempted: u32,
    pub deleted: u32,
    pub not_deleted: u32,
    pub failed: u32,
}

impl DeletionSummary {
    pub fn record(&mut self, outcome: &DeleteOutcome) {
        self.attempted += 1;
        match outcome {
            DeleteOutcome::Deleted { .. } => self.deleted += 1,
            DeleteOutcome::NotDeleted { .. } => self.not_deleted += 1,
            DeleteOutcome::Failed { .. } => self.failed += 1,
        }
    }
}

pub struct BulkDeleter {
    client: Arc<TwitterClient>,
    store: Arc<dyn SessionStore>,
    config: SweepConfig,
}

impl BulkDeleter {
    pub fn new(client: Arc<TwitterClient>, store: Arc<dyn SessionStore>, config: SweepConfig) -> Self {
        Self {
            client,
            store,
            config,
        }
    }

    pub async fn delete_all(
        &self,
        session_id: &str,
        items: &[Tweet],
        access: &TokenPair,
    ) -> PurgeResult<DeletionSummary> {
        let batch_size = self.config.batch_size.max(1);
        let batch_count = items.len().div_ceil(batch_size);
        let mut summary = DeletionSummary::default();
        let mut processed = 0u32;

        for (index, batch) in items.chunks(batch_size).enumerate() {
            self.store.ensure_processing(session_id).await?;

            let outcomes = join_all(batch.iter().map(|t| self.delete_one(session_id, t, access))).await;
            for outcome in &outcomes {
                summary.record(outcome);
            }

            processed += batch.len() as u32;
            self.store
                .record_progress(session_id, SessionPatch::processed(processed))
                .await?;

            tracing::info!(
                "Session {}: batch {}/{} done, {}/{} processed",
                session_id,
                index + 1,
                batch_count,
                processed,
                items.len()
            );

            if index + 1 < batch_count {
                tokio::time::sleep(self.config.batch_delay()).await;
            }
        }

        Ok(summary)
    }

    async fn delete_one(&self, session_id: &str, tweet: &Tweet, access: &TokenPair) -> DeleteOutcome {
        let tweet_id = tweet.id.clone();
        match self.client.delete_tweet(&tweet.id, access).await {
            Ok(true) => DeleteOutcome::Deleted { tweet_id },
            Ok(false) => {
                tracing::debug!("Session {}: post {} not confirmed deleted", session_id, tweet_id);
                DeleteOutcome::NotDeleted { tweet_id }
            }
            Err(e) => {
                tracing::warn!("Session {}: {}", session_id, e);
                DeleteOutcome::Failed {
                    tweet_id,
                    reason: e.to_string(),
                }
            }
        }
    }
}
