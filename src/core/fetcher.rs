// src/core/fetcher.rs — Paged retrieval of the account's own posts

use std::sync::Arc;

use crate::core::session::SessionPatch;
use crate::infra::config::SweepConfig;
use crate::infra::errors::PurgeResult;
use crate::oauth::TokenPair;
use crate::store::SessionStore;
use crate::upstream::{Tweet, TwitterClient};

pub struct TweetFetcher {
    client: Arc<TwitterClient>,
    store: Arc<dyn SessionStore>,
    config: SweepConfig,
}

impl TweetFetcher {
    pub fn new(client: Arc<TwitterClient>, store: Arc<dyn SessionStore>, config: SweepConfig) -> Self {
        Self {
            client,
            store,
            config,
        }
    }

    /// Collect posts newest first, at most `hard_cap` of them.
    ///
    /// A failed page ends the walk early; whatever was gathered is returned.
    /// `total_items` on the session tracks the running count. Only store
    /// errors propagate, including `RunSuperseded` once the session has left
    /// `processing`.
    pub async fn fetch_all(
        &self,
        session_id: &str,
        account_id: &str,
        access: &TokenPair,
    ) -> PurgeResult<Vec<Tweet>> {
        let cap = self.config.hard_cap as usize;
        let mut items: Vec<Tweet> = Vec::new();
        let mut cursor: Option<String> = None;
        let mut page_no = 0u32;

        loop {
            page_no += 1;

            let page = match self
                .client
                .user_tweets(account_id, access, self.config.page_size, cursor.as_deref())
                .await
            {
                Ok(page) => page,
                Err(e) => {
                    tracing::warn!(
                        "Session {}: page {} failed, keeping {} fetched: {}",
                        session_id,
                        page_no,
                        items.len(),
                        e
                    );
                    break;
                }
            };

            let (tweets, next) = page.into_parts();
            if tweets.is_empty() {
                break;
            }

            items.extend(tweets);
            let reached_cap = items.len() >= cap;
            if reached_cap {
                items.truncate(cap);
            }

            self.store
                .record_progress(session_id, SessionPatch::total(items.len() as u32))
                .await?;
            tracing::debug!(
                "Session {}: page {} -> {} posts so far",
                session_id,
                page_no,
                items.len()
            );

            if reached_cap {
                break;
            }
            match next {
                Some(token) => cursor = Some(token),
                None => break,
            }

            tokio::time::sleep(self.config.page_delay()).await;
        }

        tracing::info!(
            "Session {}: fetched {} posts in {} page(s)",
            session_id,
            items.len(),
            page_no
        );
        Ok(items)
    }
}
