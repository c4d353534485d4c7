//! Lead CRUD and aging queries.

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

use crate::error::{DatabaseError, Result};
use crate::models::{Lead, Stage};
use crate::validation;

const LEAD_COLUMNS: &str = "id, name, email, phone, stage, aging_days, aging_paused, \
     last_contact_date, is_active, is_archived, created_at, updated_at";

/// Create a new lead.
///
/// Contact fields are validated at this boundary; bad input never reaches
/// the table.
pub async fn create_lead(pool: &SqlitePool, lead: &Lead) -> Result<()> {
    validation::validate_name(&lead.name)?;
    validation::validate_email(&lead.email)?;

    sqlx::query(
        r#"
        INSERT INTO leads (id, name, email, phone, stage, aging_days, aging_paused,
                           last_contact_date, is_active, is_archived, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&lead.id)
    .bind(&lead.name)
    .bind(&lead.email)
    .bind(&lead.phone)
    .bind(lead.stage)
    .bind(lead.aging_days)
    .bind(lead.aging_paused)
    .bind(lead.last_contact_date)
    .bind(lead.is_active)
    .bind(lead.is_archived)
    .bind(lead.created_at)
    .bind(lead.updated_at)
    .execute(pool)
    .await
    .map_err(|e| {
        if let sqlx::Error::Database(ref db_err) = e {
            if db_err.is_unique_violation() {
                return DatabaseError::AlreadyExists {
                    entity: "Lead",
                    id: lead.id.clone(),
                };
            }
        }
        DatabaseError::Sqlx(e)
    })?;

    Ok(())
}

/// Get a lead by ID.
pub async fn get_lead(pool: &SqlitePool, id: &str) -> Result<Lead> {
    sqlx::query_as::<_, Lead>(&format!(
        "SELECT {LEAD_COLUMNS} FROM leads WHERE id = ?"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| DatabaseError::NotFound {
        entity: "Lead",
        id: id.to_string(),
    })
}

/// Get a lead by ID, tolerating absence.
pub async fn find_lead(pool: &SqlitePool, id: &str) -> Result<Option<Lead>> {
    let lead = sqlx::query_as::<_, Lead>(&format!(
        "SELECT {LEAD_COLUMNS} FROM leads WHERE id = ?"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(lead)
}

/// Move a lead to a new pipeline stage.
pub async fn update_stage(
    pool: &SqlitePool,
    id: &str,
    stage: Stage,
    now: DateTime<Utc>,
) -> Result<()> {
    let result = sqlx::query(
        r#"
        UPDATE leads
        SET stage = ?, updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(stage)
    .bind(now)
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DatabaseError::NotFound {
            entity: "Lead",
            id: id.to_string(),
        });
    }

    Ok(())
}

/// Pause or resume aging for a lead.
pub async fn set_aging_paused(
    pool: &SqlitePool,
    id: &str,
    paused: bool,
    now: DateTime<Utc>,
) -> Result<()> {
    let result = sqlx::query(
        r#"
        UPDATE leads
        SET aging_paused = ?, updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(paused)
    .bind(now)
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DatabaseError::NotFound {
            entity: "Lead",
            id: id.to_string(),
        });
    }

    Ok(())
}

/// Record a contact with the lead: resets `last_contact_date` and the
/// derived aging counter.
pub async fn touch_contact(pool: &SqlitePool, id: &str, now: DateTime<Utc>) -> Result<()> {
    let result = sqlx::query(
        r#"
        UPDATE leads
        SET last_contact_date = ?, aging_days = 0, updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(now)
    .bind(now)
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DatabaseError::NotFound {
            entity: "Lead",
            id: id.to_string(),
        });
    }

    Ok(())
}

/// Recompute `aging_days` from `last_contact_date` for every open lead.
///
/// Returns the number of leads touched. Terminal and archived leads are
/// left alone; their counter is meaningless.
pub async fn refresh_aging(pool: &SqlitePool, now: DateTime<Utc>) -> Result<u64> {
    let result = sqlx::query(
        r#"
        UPDATE leads
        SET aging_days = CAST(julianday(?) - julianday(last_contact_date) AS INTEGER)
        WHERE is_active = 1 AND is_archived = 0 AND stage NOT IN ('won', 'lost')
        "#,
    )
    .bind(now)
    .execute(pool)
    .await?;

    Ok(result.rows_affected())
}

/// Bulk aging filter. Must agree with the per-lead classifier: threshold
/// of 2 days, open stage, not paused (NULL counts as not paused), active,
/// not archived.
pub async fn list_aging(pool: &SqlitePool) -> Result<Vec<Lead>> {
    let leads = sqlx::query_as::<_, Lead>(&format!(
        r#"
        SELECT {LEAD_COLUMNS}
        FROM leads
        WHERE aging_days >= 2
          AND stage NOT IN ('won', 'lost')
          AND COALESCE(aging_paused, 0) = 0
          AND is_active = 1
          AND is_archived = 0
        ORDER BY aging_days DESC
        "#
    ))
    .fetch_all(pool)
    .await?;

    Ok(leads)
}

/// List all leads, newest first.
pub async fn list_leads(pool: &SqlitePool) -> Result<Vec<Lead>> {
    let leads = sqlx::query_as::<_, Lead>(&format!(
        "SELECT {LEAD_COLUMNS} FROM leads ORDER BY created_at DESC"
    ))
    .fetch_all(pool)
    .await?;

    Ok(leads)
}

/// Count leads grouped by stage.
pub async fn count_by_stage(pool: &SqlitePool) -> Result<Vec<(Stage, i64)>> {
    let rows = sqlx::query_as::<_, (Stage, i64)>(
        r#"
        SELECT stage, COUNT(*) as count
        FROM leads
        GROUP BY stage
        ORDER BY count DESC
        "#,
    )
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Archive a lead, removing it from all scheduling queries.
pub async fn archive_lead(pool: &SqlitePool, id: &str, now: DateTime<Utc>) -> Result<()> {
    let result = sqlx::query(
        r#"
        UPDATE leads
        SET is_archived = 1, updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(now)
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DatabaseError::NotFound {
            entity: "Lead",
            id: id.to_string(),
        });
    }

    Ok(())
}

/// Delete a lead by ID. Automation rows are left behind on purpose; the
/// cycle skips and reports orphans.
pub async fn delete_lead(pool: &SqlitePool, id: &str) -> Result<()> {
    let result = sqlx::query(
        r#"
        DELETE FROM leads
        WHERE id = ?
        "#,
    )
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DatabaseError::NotFound {
            entity: "Lead",
            id: id.to_string(),
        });
    }

    Ok(())
}
