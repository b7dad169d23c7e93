// src/oauth/flow.rs — Three-legged handshake bound to a session record
//
//   start:    request credential -> pending session -> authorize URL
//   complete: verifier -> access credential + identity -> authenticated

use std::sync::Arc;

use super::TokenPair;
use crate::core::session::{AccountIdentity, Session, SessionPatch, SessionStatus};
use crate::infra::errors::{PurgeError, PurgeResult};
use crate::store::SessionStore;
use crate::upstream::TwitterClient;

/// Callback used when neither the caller nor config names one (PIN flow).
pub const OUT_OF_BAND: &str = "oob";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BeginAuthorization {
    pub session_id: String,
    pub authorize_url: String,
}

pub struct AuthorizationFlow {
    client: Arc<TwitterClient>,
    store: Arc<dyn SessionStore>,
    default_callback: Option<String>,
}

impl AuthorizationFlow {
    pub fn new(
        client: Arc<TwitterClient>,
        store: Arc<dyn SessionStore>,
        default_callback: Option<String>,
    ) -> Self {
        Self {
            client,
            store,
            default_callback,
        }
    }

    /// Obtain a request credential for `callback_url`.
    pub async fn begin(&self, callback_url: &str) -> PurgeResult<TokenPair> {
        self.client.request_token(callback_url).await
    }

    /// Begin the handshake and persist a `pending` session for it.
    pub async fn start(&self, callback_url: Option<&str>) -> PurgeResult<BeginAuthorization> {
        let callback = callback_url
            .or(self.default_callback.as_deref())
            .unwrap_or(OUT_OF_BAND);
        validate_callback(callback)?;

        let request = self.begin(callback).await?;
        let authorize_url = self.client.authorize_url(&request.token);

        let session = Session::pending(request);
        let session_id = session.id.clone();
        self.store.create(session).await?;

        tracing::info!("Session {} created, awaiting approval", session_id);

        Ok(BeginAuthorization {
            session_id,
            authorize_url,
        })
    }

    /// Finish the handshake for `session_id` with what the provider redirected back.
    pub async fn complete(
        &self,
        session_id: &str,
        returned_token: &str,
        verifier: &str,
    ) -> PurgeResult<AccountIdentity> {
        let session = self
            .store
            .get(session_id)
            .await?
            .ok_or_else(|| PurgeError::SessionNotFound(session_id.to_string()))?;

        if session.request_token.token != returned_token {
            tracing::warn!("Session {}: returned oauth_token does not match", session_id);
            return Err(PurgeError::TokenMismatch {
                session_id: session_id.to_string(),
            });
        }
        if session.status != SessionStatus::Pending {
            return Err(PurgeError::InvalidState {
                session_id: session_id.to_string(),
                expected: SessionStatus::Pending,
                actual: session.status,
            });
        }

        let grant = self
            .client
            .access_token(&session.request_token, verifier)
            .await?;

        let profile_image_url = match self.client.profile_image_url(&grant.access_token).await {
            Ok(url) => url,
            Err(e) => {
                tracing::debug!("Session {}: no profile image ({})", session_id, e);
                None
            }
        };

        let identity = AccountIdentity {
            id: Some(grant.user_id.clone()),
            username: grant.screen_name.clone(),
            profile_image_url: profile_image_url.clone(),
        };

        let patch = SessionPatch {
            status: Some(SessionStatus::Authenticated),
            access_token: Some(grant.access_token),
            account_id: Some(grant.user_id),
            username: grant.screen_name,
            profile_image_url,
            ..Default::default()
        };

        if !self
            .store
            .update_if_status(session_id, SessionStatus::Pending, patch)
            .await?
        {
            // Lost a race with a concurrent completion
            let actual = self
                .store
                .get(session_id)
                .await?
                .map(|s| s.status)
                .ok_or_else(|| PurgeError::SessionNotFound(session_id.to_string()))?;
            return Err(PurgeError::InvalidState {
                session_id: session_id.to_string(),
                expected: SessionStatus::Pending,
                actual,
            });
        }

        tracing::info!(
            "Session {} authenticated as @{}",
            session_id,
            identity.username.as_deref().unwrap_or("?")
        );

        Ok(identity)
    }
}

/// `oob` or an absolute http(s) URL.
fn validate_callback(callback: &str) -> PurgeResult<()> {
    if callback == OUT_OF_BAND {
        return Ok(());
    }
    match url::Url::parse(callback) {
        Ok(u) if matches!(u.scheme(), "http" | "https") && u.has_host() => Ok(()),
        _ => Err(PurgeError::InvalidCallback(callback.to_string())),
    }
}
