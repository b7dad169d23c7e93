// src/core/orchestrator.rs — Session state machine driving fetch then delete

use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use super::deleter::{BulkDeleter, DeletionSummary};
use super::fetcher::TweetFetcher;
use super::runner::TaskRunner;
use super::session::{SessionPatch, SessionStatus};
use crate::infra::errors::{PurgeError, PurgeResult};
use crate::oauth::TokenPair;
use crate::store::SessionStore;

/// Moves an authenticated session through `processing` to a terminal state.
pub struct SessionOrchestrator {
    store: Arc<dyn SessionStore>,
    fetcher: TweetFetcher,
    deleter: BulkDeleter,
    runner: Arc<TaskRunner>,
}

/// Everything a background run needs, captured at trigger time.
struct RunInput {
    session_id: String,
    account_id: String,
    access: TokenPair,
}

impl SessionOrchestrator {
    pub fn new(
        store: Arc<dyn SessionStore>,
        fetcher: TweetFetcher,
        deleter: BulkDeleter,
        runner: Arc<TaskRunner>,
    ) -> Self {
        Self {
            store,
            fetcher,
            deleter,
            runner,
        }
    }

    /// Mark the session `processing` and hand the run to the task runner.
    ///
    /// Returns once the transition is durable; the run itself continues in
    /// the background and reports only through the session record.
    pub async fn start(self: &Arc<Self>, session_id: &str) -> PurgeResult<()> {
        let session = self
            .store
            .get(session_id)
            .await?
            .ok_or_else(|| PurgeError::SessionNotFound(session_id.to_string()))?;

        let invalid = |actual| PurgeError::InvalidState {
            session_id: session_id.to_string(),
            expected: SessionStatus::Authenticated,
            actual,
        };

        if session.status != SessionStatus::Authenticated {
            return Err(invalid(session.status));
        }
        let (Some(access), Some(account_id)) = (session.access_token, session.account_id) else {
            return Err(invalid(session.status));
        };

        let moved = self
            .store
            .update_if_status(
                session_id,
                SessionStatus::Authenticated,
                SessionPatch::status(SessionStatus::Processing),
            )
            .await?;
        if !moved {
            let actual = self
                .store
                .get(session_id)
                .await?
                .map(|s| s.status)
                .ok_or_else(|| PurgeError::SessionNotFound(session_id.to_string()))?;
            return Err(invalid(actual));
        }

        tracing::info!("Session {}: processing started", session_id);

        let input = RunInput {
            session_id: session_id.to_string(),
            account_id,
            access,
        };
        let this = Arc::clone(self);
        self.runner.spawn(async move { this.run(input).await });
        Ok(())
    }

    /// Body plus terminal transition. Never returns an error: every failure
    /// ends up on the session record.
    async fn run(&self, input: RunInput) {
        let result = AssertUnwindSafe(self.process(&input)).catch_unwind().await;

        let session_id = input.session_id.as_str();
        let patch = match result {
            Ok(Ok(summary)) => {
                tracing::info!(
                    "Session {}: completed, {} attempted ({} deleted, {} unconfirmed, {} failed)",
                    session_id,
                    summary.attempted,
                    summary.deleted,
                    summary.not_deleted,
                    summary.failed
                );
                SessionPatch::status(SessionStatus::Completed).with_processed(summary.attempted)
            }
            Ok(Err(PurgeError::RunSuperseded(_))) => {
                tracing::warn!(
                    "Session {}: left processing while running, sweep stopped",
                    session_id
                );
                return;
            }
            Ok(Err(e)) => {
                tracing::error!("Session {}: processing failed: {}", session_id, e);
                SessionPatch::failed(e.to_string())
            }
            Err(panic) => {
                let message = format!("processing panicked: {}", panic_message(panic.as_ref()));
                tracing::error!("Session {}: {}", session_id, message);
                SessionPatch::failed(message)
            }
        };

        match self
            .store
            .update_if_status(session_id, SessionStatus::Processing, patch)
            .await
        {
            Ok(true) => {}
            Ok(false) => tracing::warn!(
                "Session {}: left processing before the run finished, terminal write skipped",
                session_id
            ),
            Err(e) => tracing::error!("Session {}: could not record outcome: {}", session_id, e),
        }
    }

    async fn process(&self, input: &RunInput) -> PurgeResult<DeletionSummary> {
        let items = self
            .fetcher
            .fetch_all(&input.session_id, &input.account_id, &input.access)
            .await?;
        self.deleter
            .delete_all(&input.session_id, &items, &input.access)
            .await
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
