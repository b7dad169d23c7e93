// src/upstream/types.rs — Upstream API response shapes (v2 JSON + OAuth form bodies)

use serde::Deserialize;
use std::collections::HashMap;

/// A post as returned by the timeline endpoint. Only the id is kept: content
/// is never needed to delete it, and never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Tweet {
    pub id: String,
}

impl Tweet {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }
}

/// One page of `GET /2/users/{id}/tweets`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TweetPage {
    #[serde(default)]
    pub data: Option<Vec<Tweet>>,
    #[serde(default)]
    pub meta: Option<PageMeta>,
}

impl TweetPage {
    pub fn into_parts(self) -> (Vec<Tweet>, Option<String>) {
        let next = self.meta.and_then(|m| m.next_token);
        (self.data.unwrap_or_default(), next)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PageMeta {
    #[serde(default)]
    pub next_token: Option<String>,
}

/// `DELETE /2/tweets/{id}` body: `{"data":{"deleted":true}}`.
#[derive(Debug, Clone, Deserialize)]
pub struct DeleteResponse {
    #[serde(default)]
    pub data: Option<DeleteData>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DeleteData {
    #[serde(default)]
    pub deleted: bool,
}

/// `GET /2/users/me?user.fields=profile_image_url`.
#[derive(Debug, Clone, Deserialize)]
pub struct MeResponse {
    #[serde(default)]
    pub data: Option<MeData>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MeData {
    #[serde(default)]
    pub profile_image_url: Option<String>,
}

/// Parse a `application/x-www-form-urlencoded` OAuth token response.
pub fn parse_form(body: &str) -> Result<HashMap<String, String>, serde_urlencoded::de::Error> {
    serde_urlencoded::from_str(body.trim())
}
