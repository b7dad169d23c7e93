// src/core/session.rs — Session record, status machine, and the polling projection
//
// A session is the unit of work: one authorized account, one purge run.
// Status only moves forward:
//   pending -> authenticated -> processing -> completed | error

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::infra::errors::{PurgeError, PurgeResult};
use crate::oauth::TokenPair;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Pending,
    Authenticated,
    Processing,
    Completed,
    Error,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Pending => "pending",
            SessionStatus::Authenticated => "authenticated",
            SessionStatus::Processing => "processing",
            SessionStatus::Completed => "completed",
            SessionStatus::Error => "error",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionStatus::Completed | SessionStatus::Error)
    }

    /// Whether the state machine allows moving from `self` to `next`.
    pub fn can_transition_to(&self, next: SessionStatus) -> bool {
        use SessionStatus::*;
        if self.is_terminal() {
            return false;
        }
        matches!(
            (self, next),
            (Pending, Authenticated)
                | (Authenticated, Processing)
                | (Processing, Completed)
                | (Processing, Error)
        )
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SessionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(SessionStatus::Pending),
            "authenticated" => Ok(SessionStatus::Authenticated),
            "processing" => Ok(SessionStatus::Processing),
            "completed" => Ok(SessionStatus::Completed),
            "error" => Ok(SessionStatus::Error),
            other => Err(format!("unknown session status '{other}'")),
        }
    }
}

/// Durable session record. Holds credentials, so it is deliberately not
/// `Serialize`; anything leaving the process goes through [`StatusView`].
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub id: String,
    pub request_token: TokenPair,
    pub access_token: Option<TokenPair>,
    pub account_id: Option<String>,
    pub username: Option<String>,
    pub profile_image_url: Option<String>,
    pub status: SessionStatus,
    pub total_items: u32,
    pub processed_items: u32,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Session {
    /// A fresh `pending` session carrying the handshake's request credential.
    pub fn pending(request_token: TokenPair) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            request_token,
            access_token: None,
            account_id: None,
            username: None,
            profile_image_url: None,
            status: SessionStatus::Pending,
            total_items: 0,
            processed_items: 0,
            error_message: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn identity(&self) -> AccountIdentity {
        AccountIdentity {
            id: self.account_id.clone(),
            username: self.username.clone(),
            profile_image_url: self.profile_image_url.clone(),
        }
    }

    pub fn status_view(&self) -> StatusView {
        StatusView {
            session_id: self.id.clone(),
            status: self.status,
            user: self.identity(),
            progress: Progress::new(self.processed_items, self.total_items),
            error_message: self.error_message.clone(),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// Field-level partial update. `None` fields are left untouched by the store.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionPatch {
    pub status: Option<SessionStatus>,
    pub access_token: Option<TokenPair>,
    pub account_id: Option<String>,
    pub username: Option<String>,
    pub profile_image_url: Option<String>,
    pub total_items: Option<u32>,
    pub processed_items: Option<u32>,
    pub error_message: Option<String>,
}

impl SessionPatch {
    pub fn status(status: SessionStatus) -> Self {
        Self {
            status: Some(status),
            ..Default::default()
        }
    }

    pub fn total(total: u32) -> Self {
        Self {
            total_items: Some(total),
            ..Default::default()
        }
    }

    pub fn processed(processed: u32) -> Self {
        Self {
            processed_items: Some(processed),
            ..Default::default()
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            status: Some(SessionStatus::Error),
            error_message: Some(message.into()),
            ..Default::default()
        }
    }

    pub fn with_processed(mut self, processed: u32) -> Self {
        self.processed_items = Some(processed);
        self
    }

    /// Refuse a status change the state machine does not allow.
    pub fn check_transition(&self, session: &Session) -> PurgeResult<()> {
        match self.status {
            Some(next) if !session.status.can_transition_to(next) => {
                Err(PurgeError::IllegalTransition {
                    session_id: session.id.clone(),
                    from: session.status,
                    to: next,
                })
            }
            _ => Ok(()),
        }
    }

    /// Merge into an in-memory session. Does not touch `updated_at`.
    pub fn apply(&self, session: &mut Session) {
        if let Some(status) = self.status {
            session.status = status;
        }
        if let Some(ref access) = self.access_token {
            session.access_token = Some(access.clone());
        }
        if let Some(ref id) = self.account_id {
            session.account_id = Some(id.clone());
        }
        if let Some(ref name) = self.username {
            session.username = Some(name.clone());
        }
        if let Some(ref url) = self.profile_image_url {
            session.profile_image_url = Some(url.clone());
        }
        if let Some(total) = self.total_items {
            session.total_items = total;
        }
        if let Some(processed) = self.processed_items {
            session.processed_items = processed;
        }
        if let Some(ref msg) = self.error_message {
            session.error_message = Some(msg.clone());
        }
    }
}

/// Identity of the authorized account, as shown to pollers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountIdentity {
    pub id: Option<String>,
    pub username: Option<String>,
    pub profile_image_url: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Progress {
    pub processed: u32,
    pub total: u32,
    pub percentage: u32,
}

impl Progress {
    pub fn new(processed: u32, total: u32) -> Self {
        let percentage = if total > 0 {
            (((processed as f64 / total as f64) * 100.0).round() as u32).min(100)
        } else {
            0
        };
        Self {
            processed,
            total,
            percentage,
        }
    }
}

/// Read-only projection served to the polling surface. Never carries credentials.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusView {
    pub session_id: String,
    pub status: SessionStatus,
    pub user: AccountIdentity,
    pub progress: Progress,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> TokenPair {
        TokenPair::new("req-token", "req-secret")
    }

    #[test]
    fn test_forward_transitions_only() {
        use SessionStatus::*;
        assert!(Pending.can_transition_to(Authenticated));
        assert!(Authenticated.can_transition_to(Processing));
        assert!(Processing.can_transition_to(Completed));
        assert!(Processing.can_transition_to(Error));

        assert!(!Pending.can_transition_to(Processing));
        assert!(!Authenticated.can_transition_to(Completed));
        assert!(!Processing.can_transition_to(Authenticated));
    }

    #[test]
    fn test_terminal_states_are_final() {
        use SessionStatus::*;
        for next in [Pending, Authenticated, Processing, Completed, Error] {
            assert!(!Completed.can_transition_to(next));
            assert!(!Error.can_transition_to(next));
        }
        assert!(Completed.is_terminal());
        assert!(Error.is_terminal());
        assert!(!Processing.is_terminal());
    }

    #[test]
    fn test_patch_rejects_illegal_transition() {
        let mut s = Session::pending(request());
        assert!(SessionPatch::total(3).check_transition(&s).is_ok());
        assert!(SessionPatch::status(SessionStatus::Authenticated)
            .check_transition(&s)
            .is_ok());

        s.status = SessionStatus::Error;
        let err = SessionPatch::status(SessionStatus::Processing)
            .check_transition(&s)
            .unwrap_err();
        assert!(matches!(
            err,
            PurgeError::IllegalTransition {
                from: SessionStatus::Error,
                to: SessionStatus::Processing,
                ..
            }
        ));
    }

    #[test]
    fn test_status_string_roundtrip() {
        for s in ["pending", "authenticated", "processing", "completed", "error"] {
            let status: SessionStatus = s.parse().unwrap();
            assert_eq!(status.as_str(), s);
        }
        assert!("done".parse::<SessionStatus>().is_err());
    }

    #[test]
    fn test_progress_percentage_rounds() {
        assert_eq!(Progress::new(0, 0).percentage, 0);
        assert_eq!(Progress::new(5, 0).percentage, 0);
        assert_eq!(Progress::new(1, 3).percentage, 33);
        assert_eq!(Progress::new(2, 3).percentage, 67);
        assert_eq!(Progress::new(23, 23).percentage, 100);
        // processed can pass a total that was truncated at the cap
        assert_eq!(Progress::new(5, 3).percentage, 100);
    }

    #[test]
    fn test_new_session_is_pending() {
        let s = Session::pending(request());
        assert_eq!(s.status, SessionStatus::Pending);
        assert!(s.access_token.is_none());
        assert_eq!(s.total_items, 0);
        assert_eq!(s.created_at, s.updated_at);
        assert!(Uuid::parse_str(&s.id).is_ok());
    }

    #[test]
    fn test_patch_merges_only_set_fields() {
        let mut s = Session::pending(request());
        s.total_items = 40;

        SessionPatch::processed(10).apply(&mut s);
        assert_eq!(s.processed_items, 10);
        assert_eq!(s.total_items, 40);
        assert_eq!(s.status, SessionStatus::Pending);

        SessionPatch::failed("boom").apply(&mut s);
        assert_eq!(s.status, SessionStatus::Error);
        assert_eq!(s.error_message.as_deref(), Some("boom"));
        assert_eq!(s.processed_items, 10);
    }

    #[test]
    fn test_status_view_hides_credentials() {
        let mut s = Session::pending(request());
        s.access_token = Some(TokenPair::new("acc", "very-secret"));
        s.account_id = Some("42".into());
        s.username = Some("someone".into());
        s.total_items = 4;
        s.processed_items = 1;

        let json = serde_json::to_string(&s.status_view()).unwrap();
        assert!(!json.contains("very-secret"));
        assert!(!json.contains("req-secret"));
        assert!(json.contains("\"sessionId\""));
        assert!(json.contains("\"percentage\":25"));
        assert!(!json.contains("errorMessage"));
    }
}
