//! Append-only email history.
//!
//! Entries are never updated or deleted; failures surface here and nowhere
//! else.

use sqlx::SqlitePool;

use crate::error::Result;
use crate::models::{EmailHistoryEntry, NewHistoryEntry};

/// Append a send attempt to the history log.
pub async fn append(pool: &SqlitePool, entry: &NewHistoryEntry) -> Result<i64> {
    let result = sqlx::query(
        r#"
        INSERT INTO email_history (lead_id, email_type, subject, recipient, success, error, metadata, sent_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&entry.lead_id)
    .bind(&entry.email_type)
    .bind(&entry.subject)
    .bind(&entry.recipient)
    .bind(entry.success)
    .bind(&entry.error)
    .bind(&entry.metadata)
    .bind(entry.sent_at)
    .execute(pool)
    .await?;

    Ok(result.last_insert_rowid())
}

/// Most recent history entries for a lead.
pub async fn for_lead(pool: &SqlitePool, lead_id: &str, limit: i64) -> Result<Vec<EmailHistoryEntry>> {
    let entries = sqlx::query_as::<_, EmailHistoryEntry>(
        r#"
        SELECT id, lead_id, email_type, subject, recipient, success, error, metadata, sent_at
        FROM email_history
        WHERE lead_id = ?
        ORDER BY sent_at DESC, id DESC
        LIMIT ?
        "#,
    )
    .bind(lead_id)
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(entries)
}

/// Most recent failed sends across all leads.
pub async fn recent_failures(pool: &SqlitePool, limit: i64) -> Result<Vec<EmailHistoryEntry>> {
    let entries = sqlx::query_as::<_, EmailHistoryEntry>(
        r#"
        SELECT id, lead_id, email_type, subject, recipient, success, error, metadata, sent_at
        FROM email_history
        WHERE success = 0
        ORDER BY sent_at DESC, id DESC
        LIMIT ?
        "#,
    )
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(entries)
}

/// Count sends recorded for a lead.
pub async fn count_for_lead(pool: &SqlitePool, lead_id: &str) -> Result<i64> {
    let count = sqlx::query_scalar::<_, i64>(
        r#"
        SELECT COUNT(*) FROM email_history WHERE lead_id = ?
        "#,
    )
    .bind(lead_id)
    .fetch_one(pool)
    .await?;

    Ok(count)
}
