// src/cli/status.rs — Session status display

use crate::core::session::StatusView;
use crate::infra::config::Config;
use crate::infra::errors::PurgeError;
use crate::store::SessionDb;

/// Print one session's projection, read straight from the database.
pub async fn show_status(config: &Config, session_id: &str, json: bool) -> anyhow::Result<()> {
    let db_path = config.storage.resolved_db_path();
    if !db_path.exists() {
        println!("No database found at: {}", db_path.display());
        return Ok(());
    }

    let db = SessionDb::open(&db_path)?;
    let view = db
        .get(session_id)?
        .map(|s| s.status_view())
        .ok_or_else(|| PurgeError::SessionNotFound(session_id.to_string()))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&view)?);
    } else {
        print!("{}", render_status(&view));
    }
    Ok(())
}

pub fn render_status(view: &StatusView) -> String {
    let mut out = String::new();
    out.push_str(&format!("Session:    {}\n", view.session_id));
    out.push_str(&format!("  Status:   {}\n", view.status));

    match (&view.user.username, &view.user.id) {
        (Some(name), Some(id)) => out.push_str(&format!("  Account:  @{name} ({id})\n")),
        (None, Some(id)) => out.push_str(&format!("  Account:  {id}\n")),
        _ => out.push_str("  Account:  (not authorized yet)\n"),
    }

    out.push_str(&format!(
        "  Progress: {}/{} ({}%)\n",
        view.progress.processed, view.progress.total, view.progress.percentage
    ));
    if let Some(ref err) = view.error_message {
        out.push_str(&format!("  Error:    {err}\n"));
    }
    out.push_str(&format!(
        "  Created:  {}\n  Updated:  {}\n",
        view.created_at.format("%Y-%m-%d %H:%M:%S UTC"),
        view.updated_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    out
}
