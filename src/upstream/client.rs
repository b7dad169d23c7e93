// src/upstream/client.rs — Signed calls against the X/Twitter API
//
// Owns the signer and the endpoint configuration. Handshake calls fail with
// `UpstreamAuth`; timeline and delete calls fail with `ItemOperation`, which
// callers treat as non-fatal.

use reqwest::Method;
use std::sync::Arc;

use super::types::{parse_form, DeleteResponse, MeResponse, TweetPage};
use super::{HttpRequest, HttpResponse, HttpTransport};
use crate::infra::config::UpstreamConfig;
use crate::infra::errors::{PurgeError, PurgeResult};
use crate::oauth::signer::percent_encode;
use crate::oauth::{AccessGrant, RequestSigner, TokenPair};

/// Timeline filter: original posts only.
const EXCLUDE_FILTER: &str = "retweets,replies";
const EXCERPT_LEN: usize = 200;

/// One outgoing call before signing.
struct Call<'a> {
    method: Method,
    url: String,
    query: Vec<(String, String)>,
    form: Vec<(String, String)>,
    /// `oauth_*` protocol params (callback, verifier) carried in the header.
    oauth_extra: Vec<(String, String)>,
    token: Option<&'a TokenPair>,
}

pub struct TwitterClient {
    transport: Arc<dyn HttpTransport>,
    signer: RequestSigner,
    endpoints: UpstreamConfig,
}

impl TwitterClient {
    pub fn new(
        transport: Arc<dyn HttpTransport>,
        signer: RequestSigner,
        endpoints: UpstreamConfig,
    ) -> Self {
        Self {
            transport,
            signer,
            endpoints,
        }
    }

    /// Where the user is sent to approve the app for a request token.
    pub fn authorize_url(&self, request_token: &str) -> String {
        format!(
            "{}?oauth_token={}",
            self.endpoints.authorize_url,
            percent_encode(request_token)
        )
    }

    fn api_url(&self, path: &str) -> String {
        format!("{}{}", self.endpoints.api_base.trim_end_matches('/'), path)
    }

    async fn send(&self, call: Call<'_>) -> anyhow::Result<HttpResponse> {
        // Form copies of oauth_* params are already signed via oauth_extra
        let mut signed: Vec<(String, String)> = call.query.clone();
        signed.extend(
            call.form
                .iter()
                .filter(|(k, _)| !k.starts_with("oauth_"))
                .cloned(),
        );
        signed.extend(call.oauth_extra.iter().cloned());

        let authorization = self
            .signer
            .sign(call.method.as_str(), &call.url, &signed, call.token);

        self.transport
            .execute(HttpRequest {
                method: call.method,
                url: call.url,
                query: call.query,
                form: call.form,
                authorization,
            })
            .await
    }

    // ── Handshake ────────────────────────────────────────────────────────

    /// Step 1: obtain a request credential bound to `callback_url`.
    pub async fn request_token(&self, callback_url: &str) -> PurgeResult<TokenPair> {
        let resp = self
            .send(Call {
                method: Method::POST,
                url: self.endpoints.request_token_url.clone(),
                query: vec![],
                form: vec![],
                oauth_extra: vec![("oauth_callback".into(), callback_url.into())],
                token: None,
            })
            .await
            .map_err(|e| PurgeError::UpstreamAuth(format!("request token call failed: {e}")))?;

        if !resp.is_success() {
            return Err(PurgeError::UpstreamAuth(format!(
                "request token returned {}: {}",
                resp.status,
                excerpt(&resp.body)
            )));
        }

        let form = parse_form(&resp.body)
            .map_err(|e| PurgeError::UpstreamAuth(format!("unparseable request token body: {e}")))?;
        let token = non_empty(form.get("oauth_token"));
        let secret = non_empty(form.get("oauth_token_secret"));

        match (token, secret) {
            (Some(token), Some(secret)) => Ok(TokenPair::new(token, secret)),
            _ => Err(PurgeError::UpstreamAuth(
                "request token response lacks oauth_token/oauth_token_secret".into(),
            )),
        }
    }

    /// Step 3: exchange the approved request credential for an access credential.
    pub async fn access_token(
        &self,
        request: &TokenPair,
        verifier: &str,
    ) -> PurgeResult<AccessGrant> {
        let resp = self
            .send(Call {
                method: Method::POST,
                url: self.endpoints.access_token_url.clone(),
                query: vec![],
                form: vec![("oauth_verifier".into(), verifier.into())],
                oauth_extra: vec![("oauth_verifier".into(), verifier.into())],
                token: Some(request),
            })
            .await
            .map_err(|e| PurgeError::UpstreamAuth(format!("access token call failed: {e}")))?;

        if !resp.is_success() {
            return Err(PurgeError::UpstreamAuth(format!(
                "access token returned {}: {}",
                resp.status,
                excerpt(&resp.body)
            )));
        }

        let form = parse_form(&resp.body)
            .map_err(|e| PurgeError::UpstreamAuth(format!("unparseable access token body: {e}")))?;

        let token = non_empty(form.get("oauth_token"));
        let secret = non_empty(form.get("oauth_token_secret"));
        let (Some(token), Some(secret)) = (token, secret) else {
            return Err(PurgeError::UpstreamAuth(
                "access token response lacks oauth_token/oauth_token_secret".into(),
            ));
        };
        let user_id = non_empty(form.get("user_id")).ok_or_else(|| {
            PurgeError::UpstreamAuth("access token response lacks user_id".into())
        })?;

        Ok(AccessGrant {
            access_token: TokenPair::new(token, secret),
            user_id,
            screen_name: non_empty(form.get("screen_name")),
        })
    }

    /// Profile picture of the authorized account. Callers treat failure as "no picture".
    pub async fn profile_image_url(&self, access: &TokenPair) -> PurgeResult<Option<String>> {
        const OP: &str = "fetch profile";

        let resp = self
            .send(Call {
                method: Method::GET,
                url: self.api_url("/2/users/me"),
                query: vec![("user.fields".into(), "profile_image_url".into())],
                form: vec![],
                oauth_extra: vec![],
                token: Some(access),
            })
            .await
            .map_err(|e| PurgeError::item(OP, None, e.to_string()))?;

        if !resp.is_success() {
            return Err(PurgeError::item(OP, Some(resp.status), excerpt(&resp.body)));
        }

        let me: MeResponse = serde_json::from_str(&resp.body)
            .map_err(|e| PurgeError::item(OP, Some(resp.status), format!("undecodable body: {e}")))?;
        Ok(me
            .data
            .and_then(|d| d.profile_image_url)
            .filter(|u| !u.is_empty()))
    }

    // ── Timeline + delete ────────────────────────────────────────────────

    /// One page of the account's own posts (no retweets, no replies), newest first.
    pub async fn user_tweets(
        &self,
        user_id: &str,
        access: &TokenPair,
        max_results: u32,
        cursor: Option<&str>,
    ) -> PurgeResult<TweetPage> {
        const OP: &str = "fetch page";

        let mut query = vec![
            ("max_results".to_string(), max_results.to_string()),
            ("exclude".to_string(), EXCLUDE_FILTER.to_string()),
        ];
        if let Some(token) = cursor {
            query.push(("pagination_token".to_string(), token.to_string()));
        }

        let resp = self
            .send(Call {
                method: Method::GET,
                url: self.api_url(&format!("/2/users/{}/tweets", percent_encode(user_id))),
                query,
                form: vec![],
                oauth_extra: vec![],
                token: Some(access),
            })
            .await
            .map_err(|e| PurgeError::item(OP, None, e.to_string()))?;

        if !resp.is_success() {
            return Err(PurgeError::item(OP, Some(resp.status), excerpt(&resp.body)));
        }

        serde_json::from_str(&resp.body)
            .map_err(|e| PurgeError::item(OP, Some(resp.status), format!("undecodable body: {e}")))
    }

    /// Delete one post. `Ok(false)` means the API answered 2xx without
    /// confirming the deletion.
    pub async fn delete_tweet(&self, tweet_id: &str, access: &TokenPair) -> PurgeResult<bool> {
        const OP: &str = "delete tweet";

        let resp = self
            .send(Call {
                method: Method::DELETE,
                url: self.api_url(&format!("/2/tweets/{}", percent_encode(tweet_id))),
                query: vec![],
                form: vec![],
                oauth_extra: vec![],
                token: Some(access),
            })
            .await
            .map_err(|e| PurgeError::item(OP, None, format!("{tweet_id}: {e}")))?;

        if !resp.is_success() {
            return Err(PurgeError::item(
                OP,
                Some(resp.status),
                format!("{tweet_id}: {}", excerpt(&resp.body)),
            ));
        }

        let body: DeleteResponse = serde_json::from_str(&resp.body).unwrap_or(DeleteResponse { data: None });
        Ok(body.data.is_some_and(|d| d.deleted))
    }
}

fn non_empty(value: Option<&String>) -> Option<String> {
    value.filter(|v| !v.is_empty()).cloned()
}

fn excerpt(body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.chars().count() <= EXCERPT_LEN {
        return trimmed.to_string();
    }
    let cut: String = trimmed.chars().take(EXCERPT_LEN).collect();
    format!("{cut}…")
}
