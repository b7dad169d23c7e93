// tests/common/mod.rs — Scripted upstream API and a recording store

#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Method;
use tokio::time::Instant;

use tweetpurge::core::session::{Session, SessionPatch, SessionStatus};
use tweetpurge::infra::config::Config;
use tweetpurge::infra::errors::{PurgeError, PurgeResult};
use tweetpurge::oauth::TokenPair;
use tweetpurge::store::{MemoryStore, SessionStore};
use tweetpurge::upstream::{HttpRequest, HttpResponse, HttpTransport};

pub const ACCOUNT_ID: &str = "42";

/// Shape of the account's timeline.
#[derive(Clone)]
pub enum Timeline {
    /// Page sizes in order; every page but the last carries a cursor.
    Pages(Vec<usize>),
    /// Full pages with a cursor, forever.
    Endless,
}

/// Fake X/Twitter API. Answers the handshake, serves a scripted timeline,
/// and records every request with the (virtual) time it arrived.
pub struct FakeTwitter {
    timeline: Timeline,
    failing_deletes: HashSet<String>,
    failing_page: Option<usize>,
    panic_on_delete: bool,
    requests: Mutex<Vec<(Instant, HttpRequest)>>,
}

impl FakeTwitter {
    pub fn new(timeline: Timeline) -> Self {
        Self {
            timeline,
            failing_deletes: HashSet::new(),
            failing_page: None,
            panic_on_delete: false,
            requests: Mutex::new(Vec::new()),
        }
    }

    /// These post ids answer 404 on delete.
    pub fn failing_deletes(mut self, ids: &[&str]) -> Self {
        self.failing_deletes = ids.iter().map(|s| s.to_string()).collect();
        self
    }

    /// The page at this zero-based index answers 503.
    pub fn failing_page(mut self, index: usize) -> Self {
        self.failing_page = Some(index);
        self
    }

    pub fn panic_on_delete(mut self) -> Self {
        self.panic_on_delete = true;
        self
    }

    pub fn requests(&self) -> Vec<(Instant, HttpRequest)> {
        self.requests.lock().unwrap().clone()
    }

    pub fn timeline_requests(&self) -> Vec<(Instant, HttpRequest)> {
        self.requests()
            .into_iter()
            .filter(|(_, r)| r.method == Method::GET && r.url.ends_with("/tweets"))
            .collect()
    }

    pub fn delete_requests(&self) -> Vec<(Instant, HttpRequest)> {
        self.requests()
            .into_iter()
            .filter(|(_, r)| r.method == Method::DELETE)
            .collect()
    }

    /// Id of the i-th post on the given page.
    pub fn post_id(page: usize, i: usize) -> String {
        format!("{}", 1_000_000 - (page * 1_000 + i))
    }

    fn timeline_page(&self, request: &HttpRequest) -> HttpResponse {
        let index = request
            .query_param("pagination_token")
            .and_then(|t| t.strip_prefix("page-"))
            .and_then(|n| n.parse::<usize>().ok())
            .unwrap_or(0);

        if self.failing_page == Some(index) {
            return HttpResponse::new(503, r#"{"title":"Service Unavailable"}"#);
        }

        let max_results: usize = request
            .query_param("max_results")
            .and_then(|m| m.parse().ok())
            .unwrap_or(10);

        let (size, has_next) = match &self.timeline {
            Timeline::Pages(sizes) => (
                sizes.get(index).copied().unwrap_or(0),
                index + 1 < sizes.len(),
            ),
            Timeline::Endless => (max_results, true),
        };

        let data: Vec<serde_json::Value> = (0..size)
            .map(|i| serde_json::json!({"id": Self::post_id(index, i), "text": "hello"}))
            .collect();

        let mut meta = serde_json::json!({ "result_count": size });
        if has_next {
            meta["next_token"] = serde_json::json!(format!("page-{}", index + 1));
        }

        let body = if data.is_empty() {
            serde_json::json!({ "meta": meta })
        } else {
            serde_json::json!({ "data": data, "meta": meta })
        };
        HttpResponse::new(200, body.to_string())
    }
}

#[async_trait]
impl HttpTransport for FakeTwitter {
    async fn execute(&self, request: HttpRequest) -> anyhow::Result<HttpResponse> {
        self.requests
            .lock()
            .unwrap()
            .push((Instant::now(), request.clone()));

        let url = request.url.as_str();
        let resp = if url.ends_with("/oauth/request_token") {
            HttpResponse::new(
                200,
                "oauth_token=rt&oauth_token_secret=rts&oauth_callback_confirmed=true",
            )
        } else if url.ends_with("/oauth/access_token") {
            HttpResponse::new(
                200,
                format!(
                    "oauth_token=at&oauth_token_secret=ats&user_id={ACCOUNT_ID}&screen_name=purger"
                ),
            )
        } else if url.ends_with("/2/users/me") {
            HttpResponse::new(
                200,
                r#"{"data":{"id":"42","profile_image_url":"https://img.example/42.png"}}"#,
            )
        } else if request.method == Method::GET && url.ends_with("/tweets") {
            self.timeline_page(&request)
        } else if request.method == Method::DELETE {
            if self.panic_on_delete {
                panic!("delete exploded");
            }
            let id = url.rsplit('/').next().unwrap_or_default();
            if self.failing_deletes.contains(id) {
                HttpResponse::new(404, r#"{"title":"Not Found Error"}"#)
            } else {
                HttpResponse::new(200, r#"{"data":{"deleted":true}}"#)
            }
        } else {
            HttpResponse::new(404, "unknown endpoint")
        };
        Ok(resp)
    }
}

/// MemoryStore that remembers every `processed_items` / `total_items` it was given.
#[derive(Default)]
pub struct RecordingStore {
    inner: MemoryStore,
    processed: Mutex<Vec<u32>>,
    totals: Mutex<Vec<u32>>,
    fail_total_writes: bool,
}

impl RecordingStore {
    /// Any write carrying `total_items` fails as if the disk were full.
    pub fn failing_total_writes(mut self) -> Self {
        self.fail_total_writes = true;
        self
    }

    fn check_writable(&self, patch: &SessionPatch) -> PurgeResult<()> {
        if self.fail_total_writes && patch.total_items.is_some() {
            return Err(PurgeError::Other(anyhow::anyhow!("disk full")));
        }
        Ok(())
    }

    pub fn processed_writes(&self) -> Vec<u32> {
        self.processed.lock().unwrap().clone()
    }

    pub fn total_writes(&self) -> Vec<u32> {
        self.totals.lock().unwrap().clone()
    }

    fn record(&self, patch: &SessionPatch) {
        if let Some(p) = patch.processed_items {
            self.processed.lock().unwrap().push(p);
        }
        if let Some(t) = patch.total_items {
            self.totals.lock().unwrap().push(t);
        }
    }
}

#[async_trait]
impl SessionStore for RecordingStore {
    async fn create(&self, session: Session) -> PurgeResult<()> {
        self.inner.create(session).await
    }

    async fn get(&self, id: &str) -> PurgeResult<Option<Session>> {
        self.inner.get(id).await
    }

    async fn update(&self, id: &str, patch: SessionPatch) -> PurgeResult<()> {
        self.check_writable(&patch)?;
        self.record(&patch);
        self.inner.update(id, patch).await
    }

    async fn update_if_status(
        &self,
        id: &str,
        expected: SessionStatus,
        patch: SessionPatch,
    ) -> PurgeResult<bool> {
        self.check_writable(&patch)?;
        let wrote = self.inner.update_if_status(id, expected, patch.clone()).await?;
        if wrote {
            self.record(&patch);
        }
        Ok(wrote)
    }

    async fn list_stale(
        &self,
        status: SessionStatus,
        cutoff: DateTime<Utc>,
    ) -> PurgeResult<Vec<Session>> {
        self.inner.list_stale(status, cutoff).await
    }
}

pub fn test_config() -> Config {
    let mut config = Config::default();
    config.oauth.consumer_key = Some("test-consumer-key".into());
    config.oauth.consumer_secret = Some("test-consumer-secret".into());
    config.watchdog.enabled = false;
    config
}

/// An `authenticated` session ready for processing. Returns its id.
pub async fn authenticated_session(store: &dyn SessionStore) -> String {
    let mut session = Session::pending(TokenPair::new("rt", "rts"));
    session.status = SessionStatus::Authenticated;
    session.access_token = Some(TokenPair::new("at", "ats"));
    session.account_id = Some(ACCOUNT_ID.into());
    session.username = Some("purger".into());
    let id = session.id.clone();
    store.create(session).await.unwrap();
    id
}

/// A session already moved to `processing`, as the fetcher and deleter expect.
pub async fn processing_session(store: &dyn SessionStore) -> String {
    let id = authenticated_session(store).await;
    store
        .update_if_status(
            &id,
            SessionStatus::Authenticated,
            SessionPatch::status(SessionStatus::Processing),
        )
        .await
        .unwrap();
    id
}

pub fn access() -> TokenPair {
    TokenPair::new("at", "ats")
}

pub fn shared<T>(value: T) -> Arc<T> {
    Arc::new(value)
}
