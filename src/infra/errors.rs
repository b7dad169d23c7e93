// src/infra/errors.rs — Error types for tweetpurge

use thiserror::Error;

use crate::core::session::SessionStatus;

#[derive(Error, Debug)]
pub enum PurgeError {
    // Handshake errors (surfaced to the caller)
    #[error("Upstream authorization failed: {0}")]
    UpstreamAuth(String),

    #[error("OAuth token mismatch for session '{session_id}'")]
    TokenMismatch { session_id: String },

    #[error("Session '{0}' not found")]
    SessionNotFound(String),

    #[error("Invalid callback URL '{0}'")]
    InvalidCallback(String),

    #[error("Session '{session_id}' is {actual}, expected {expected}")]
    InvalidState {
        session_id: String,
        expected: SessionStatus,
        actual: SessionStatus,
    },

    #[error("Session '{session_id}' cannot move from {from} to {to}")]
    IllegalTransition {
        session_id: String,
        from: SessionStatus,
        to: SessionStatus,
    },

    /// The session left `processing` under a running sweep (reaped or finished elsewhere).
    #[error("Session '{0}' is no longer processing")]
    RunSuperseded(String),

    // Per-item failures (logged, never fatal to a run)
    #[error("{operation} failed{}: {detail}", status_suffix(.status))]
    ItemOperation {
        operation: &'static str,
        status: Option<u16>,
        detail: String,
    },

    // Infra
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl PurgeError {
    pub(crate) fn item(operation: &'static str, status: Option<u16>, detail: impl Into<String>) -> Self {
        PurgeError::ItemOperation {
            operation,
            status,
            detail: detail.into(),
        }
    }

    /// True for errors caused by the caller (bad id, wrong token, wrong phase).
    pub fn is_precondition(&self) -> bool {
        matches!(
            self,
            PurgeError::TokenMismatch { .. }
                | PurgeError::SessionNotFound(_)
                | PurgeError::InvalidState { .. }
                | PurgeError::InvalidCallback(_)
                | PurgeError::IllegalTransition { .. }
        )
    }
}

pub type PurgeResult<T> = Result<T, PurgeError>;

fn status_suffix(status: &Option<u16>) -> String {
    match status {
        Some(code) => format!(" with status {code}"),
        None => String::new(),
    }
}
