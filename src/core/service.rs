// src/core/service.rs — Entry points shared by the HTTP surface and the CLI

use std::sync::Arc;
use std::time::Duration;

use super::deleter::BulkDeleter;
use super::fetcher::TweetFetcher;
use super::orchestrator::SessionOrchestrator;
use super::runner::TaskRunner;
use super::session::{AccountIdentity, StatusView};
use super::watchdog;
use crate::infra::config::Config;
use crate::infra::errors::{PurgeError, PurgeResult};
use crate::oauth::{AuthorizationFlow, BeginAuthorization, RequestSigner};
use crate::store::SessionStore;
use crate::upstream::{HttpTransport, TwitterClient};

/// Wires the handshake, the orchestrator and the store from one `Config`.
pub struct PurgeService {
    flow: AuthorizationFlow,
    orchestrator: Arc<SessionOrchestrator>,
    store: Arc<dyn SessionStore>,
    runner: Arc<TaskRunner>,
}

impl PurgeService {
    /// Fails with `Config` when the consumer credentials are missing.
    pub fn new(
        config: &Config,
        transport: Arc<dyn HttpTransport>,
        store: Arc<dyn SessionStore>,
        runner: Arc<TaskRunner>,
    ) -> PurgeResult<Self> {
        let (key, secret) = config.oauth.consumer_pair()?;
        let client = Arc::new(TwitterClient::new(
            transport,
            RequestSigner::new(key, secret),
            config.upstream.clone(),
        ));

        let fetcher = TweetFetcher::new(client.clone(), store.clone(), config.sweep.clone());
        let deleter = BulkDeleter::new(client.clone(), store.clone(), config.sweep.clone());
        let orchestrator = Arc::new(SessionOrchestrator::new(
            store.clone(),
            fetcher,
            deleter,
            runner.clone(),
        ));
        let flow = AuthorizationFlow::new(client, store.clone(), config.oauth.callback_url.clone());

        Ok(Self {
            flow,
            orchestrator,
            store,
            runner,
        })
    }

    pub async fn begin_authorization(
        &self,
        callback_url: Option<&str>,
    ) -> PurgeResult<BeginAuthorization> {
        self.flow.start(callback_url).await
    }

    pub async fn complete_authorization(
        &self,
        session_id: &str,
        returned_token: &str,
        verifier: &str,
    ) -> PurgeResult<AccountIdentity> {
        self.flow.complete(session_id, returned_token, verifier).await
    }

    /// Accepts the session for background processing.
    pub async fn start_processing(&self, session_id: &str) -> PurgeResult<()> {
        self.orchestrator.start(session_id).await
    }

    pub async fn status(&self, session_id: &str) -> PurgeResult<StatusView> {
        self.store
            .get(session_id)
            .await?
            .map(|s| s.status_view())
            .ok_or_else(|| PurgeError::SessionNotFound(session_id.to_string()))
    }

    pub async fn reap_stale(&self, stale_after: Duration) -> PurgeResult<usize> {
        watchdog::reap_stale(self.store.as_ref(), stale_after).await
    }

    pub fn store(&self) -> Arc<dyn SessionStore> {
        self.store.clone()
    }

    /// Wait for in-flight runs to finish.
    pub async fn shutdown(&self) {
        self.runner.drain().await;
    }
}
