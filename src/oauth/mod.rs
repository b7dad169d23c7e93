// src/oauth/mod.rs — OAuth 1.0a request signing and the three-legged handshake

pub mod flow;
pub mod signer;

use std::fmt;

pub use flow::{AuthorizationFlow, BeginAuthorization};
pub use signer::{RequestSigner, SigningStamp};

/// A token/secret pair: either the short-lived request credential or the
/// long-lived access credential. `Debug` never prints the secret.
#[derive(Clone, PartialEq, Eq)]
pub struct TokenPair {
    pub token: String,
    pub secret: String,
}

impl TokenPair {
    pub fn new(token: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            secret: secret.into(),
        }
    }
}

impl fmt::Debug for TokenPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenPair")
            .field("token", &self.token)
            .field("secret", &"<redacted>")
            .finish()
    }
}

/// Result of the access-token exchange: the long-lived credential plus the
/// identity claim that came with it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessGrant {
    pub access_token: TokenPair,
    pub user_id: String,
    pub screen_name: Option<String>,
}
