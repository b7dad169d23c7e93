// src/store/sqlite.rs — SQLite session operations
//
// Synchronous; owned by the store server task, which serializes every call.
// Field merges read the row, apply the patch, and write it back inside one
// transaction.

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;

use super::schema;
use crate::core::session::{Session, SessionPatch, SessionStatus};
use crate::infra::errors::PurgeResult;
use crate::oauth::TokenPair;

const COLUMNS: &str = "id, request_token, request_secret, access_token, access_secret,
     account_id, username, profile_image_url, status, total_items, processed_items,
     error_message, created_at, updated_at";

pub struct SessionDb {
    conn: Connection,
}

impl SessionDb {
    /// Open (or create) the database at the given path.
    pub fn open(path: &Path) -> rusqlite::Result<Self> {
        if let Some(parent) = path.parent() {
            // Let Connection::open report the real failure if this doesn't work
            let _ = std::fs::create_dir_all(parent);
        }
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        schema::run_migrations(&conn)?;
        Ok(Self { conn })
    }

    /// Create an in-memory database (for testing).
    pub fn in_memory() -> rusqlite::Result<Self> {
        let conn = Connection::open_in_memory()?;
        schema::run_migrations(&conn)?;
        Ok(Self { conn })
    }

    pub fn insert(&self, session: &Session) -> rusqlite::Result<()> {
        self.conn.execute(
            &format!(
                "INSERT INTO sessions ({COLUMNS})
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)"
            ),
            params![
                session.id,
                session.request_token.token,
                session.request_token.secret,
                session.access_token.as_ref().map(|t| &t.token),
                session.access_token.as_ref().map(|t| &t.secret),
                session.account_id,
                session.username,
                session.profile_image_url,
                session.status.as_str(),
                session.total_items,
                session.processed_items,
                session.error_message,
                timestamp(&session.created_at),
                timestamp(&session.updated_at),
            ],
        )?;
        Ok(())
    }

    pub fn get(&self, id: &str) -> rusqlite::Result<Option<Session>> {
        self.conn
            .query_row(
                &format!("SELECT {COLUMNS} FROM sessions WHERE id = ?1"),
                [id],
                row_to_session,
            )
            .optional()
    }

    /// Merge `patch` into the row. `None` if the session does not exist.
    pub fn update(&self, id: &str, patch: &SessionPatch) -> PurgeResult<Option<Session>> {
        self.merge(id, None, patch)
    }

    /// Merge `patch` only while the row is still `expected`. `Ok(false)` when
    /// the session is missing or has moved on.
    pub fn update_if_status(
        &self,
        id: &str,
        expected: SessionStatus,
        patch: &SessionPatch,
    ) -> PurgeResult<bool> {
        Ok(self.merge(id, Some(expected), patch)?.is_some())
    }

    fn merge(
        &self,
        id: &str,
        expected: Option<SessionStatus>,
        patch: &SessionPatch,
    ) -> PurgeResult<Option<Session>> {
        let tx = self.conn.unchecked_transaction()?;

        let current = tx
            .query_row(
                &format!("SELECT {COLUMNS} FROM sessions WHERE id = ?1"),
                [id],
                row_to_session,
            )
            .optional()?;

        let Some(mut session) = current else {
            return Ok(None);
        };
        if expected.is_some_and(|status| status != session.status) {
            return Ok(None);
        }
        patch.check_transition(&session)?;

        patch.apply(&mut session);
        session.updated_at = Utc::now();

        tx.execute(
            "UPDATE sessions SET access_token = ?1, access_secret = ?2, account_id = ?3,
             username = ?4, profile_image_url = ?5, status = ?6, total_items = ?7,
             processed_items = ?8, error_message = ?9, updated_at = ?10
             WHERE id = ?11",
            params![
                session.access_token.as_ref().map(|t| &t.token),
                session.access_token.as_ref().map(|t| &t.secret),
                session.account_id,
                session.username,
                session.profile_image_url,
                session.status.as_str(),
                session.total_items,
                session.processed_items,
                session.error_message,
                timestamp(&session.updated_at),
                id,
            ],
        )?;
        tx.commit()?;

        Ok(Some(session))
    }

    /// Sessions in `status` whose last write is older than `cutoff`.
    pub fn list_stale(
        &self,
        status: SessionStatus,
        cutoff: DateTime<Utc>,
    ) -> rusqlite::Result<Vec<Session>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {COLUMNS} FROM sessions
             WHERE status = ?1 AND updated_at < ?2
             ORDER BY updated_at ASC"
        ))?;
        let rows = stmt.query_map(params![status.as_str(), timestamp(&cutoff)], row_to_session)?;
        rows.collect()
    }
}

/// Fixed-width UTC so lexical order in SQL matches time order.
fn timestamp(at: &DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_timestamp(idx: usize, raw: String) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(&raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn row_to_session(row: &Row<'_>) -> rusqlite::Result<Session> {
    let access_token: Option<String> = row.get(3)?;
    let access_secret: Option<String> = row.get(4)?;
    let status_raw: String = row.get(8)?;
    let status = status_raw.parse::<SessionStatus>().map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(8, Type::Text, e.into())
    })?;

    Ok(Session {
        id: row.get(0)?,
        request_token: TokenPair::new(row.get::<_, String>(1)?, row.get::<_, String>(2)?),
        access_token: match (access_token, access_secret) {
            (Some(token), Some(secret)) => Some(TokenPair::new(token, secret)),
            _ => None,
        },
        account_id: row.get(5)?,
        username: row.get(6)?,
        profile_image_url: row.get(7)?,
        status,
        total_items: row.get(9)?,
        processed_items: row.get(10)?,
        error_message: row.get(11)?,
        created_at: parse_timestamp(12, row.get(12)?)?,
        updated_at: parse_timestamp(13, row.get(13)?)?,
    })
}
