//! Automation record and stage schedule operations.
//!
//! The claim step is the concurrency guard for the whole subsystem: a
//! conditional UPDATE keyed on the schedule's current `next_due_at` and
//! `sends` values. Two overlapping cycle runs can both select the same due
//! schedule, but only one claim succeeds; the loser skips the lead.

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

use crate::error::{DatabaseError, Result};
use crate::models::{AutomationRecord, ScheduleKind, Stage, StageSchedule};

/// Create an automation record for a lead.
pub async fn create_record(pool: &SqlitePool, record: &AutomationRecord) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO automation_records (lead_id, current_stage, is_active, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(&record.lead_id)
    .bind(record.current_stage)
    .bind(record.is_active)
    .bind(record.created_at)
    .bind(record.updated_at)
    .execute(pool)
    .await
    .map_err(|e| {
        if let sqlx::Error::Database(ref db_err) = e {
            if db_err.is_unique_violation() {
                return DatabaseError::AlreadyExists {
                    entity: "AutomationRecord",
                    id: record.lead_id.clone(),
                };
            }
        }
        DatabaseError::Sqlx(e)
    })?;

    Ok(())
}

/// Get the automation record for a lead.
pub async fn get_record(pool: &SqlitePool, lead_id: &str) -> Result<AutomationRecord> {
    sqlx::query_as::<_, AutomationRecord>(
        r#"
        SELECT lead_id, current_stage, is_active, created_at, updated_at
        FROM automation_records
        WHERE lead_id = ?
        "#,
    )
    .bind(lead_id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| DatabaseError::NotFound {
        entity: "AutomationRecord",
        id: lead_id.to_string(),
    })
}

/// Point the record at a new governing stage.
pub async fn set_current_stage(
    pool: &SqlitePool,
    lead_id: &str,
    stage: Stage,
    now: DateTime<Utc>,
) -> Result<()> {
    let result = sqlx::query(
        r#"
        UPDATE automation_records
        SET current_stage = ?, updated_at = ?
        WHERE lead_id = ?
        "#,
    )
    .bind(stage)
    .bind(now)
    .bind(lead_id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DatabaseError::NotFound {
            entity: "AutomationRecord",
            id: lead_id.to_string(),
        });
    }

    Ok(())
}

/// Deactivate automation for a lead. Idempotent.
pub async fn deactivate(pool: &SqlitePool, lead_id: &str, now: DateTime<Utc>) -> Result<()> {
    sqlx::query(
        r#"
        UPDATE automation_records
        SET is_active = 0, updated_at = ?
        WHERE lead_id = ?
        "#,
    )
    .bind(now)
    .bind(lead_id)
    .execute(pool)
    .await?;

    Ok(())
}

/// Create or replace the scheduling block for one (lead, stage) pair.
pub async fn upsert_schedule(pool: &SqlitePool, schedule: &StageSchedule) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO stage_schedules (lead_id, stage, kind, sends, max_sends, last_sent_at, next_due_at)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(lead_id, stage) DO UPDATE SET
            kind = excluded.kind,
            max_sends = excluded.max_sends,
            next_due_at = excluded.next_due_at
        "#,
    )
    .bind(&schedule.lead_id)
    .bind(schedule.stage)
    .bind(schedule.kind)
    .bind(schedule.sends)
    .bind(schedule.max_sends)
    .bind(schedule.last_sent_at)
    .bind(schedule.next_due_at)
    .execute(pool)
    .await?;

    Ok(())
}

/// Get one schedule by (lead, stage).
pub async fn get_schedule(
    pool: &SqlitePool,
    lead_id: &str,
    stage: Stage,
) -> Result<Option<StageSchedule>> {
    let schedule = sqlx::query_as::<_, StageSchedule>(
        r#"
        SELECT lead_id, stage, kind, sends, max_sends, last_sent_at, next_due_at
        FROM stage_schedules
        WHERE lead_id = ? AND stage = ?
        "#,
    )
    .bind(lead_id)
    .bind(stage)
    .fetch_optional(pool)
    .await?;

    Ok(schedule)
}

/// All schedules for a lead, in stage order of creation.
pub async fn schedules_for_lead(pool: &SqlitePool, lead_id: &str) -> Result<Vec<StageSchedule>> {
    let schedules = sqlx::query_as::<_, StageSchedule>(
        r#"
        SELECT lead_id, stage, kind, sends, max_sends, last_sent_at, next_due_at
        FROM stage_schedules
        WHERE lead_id = ?
        ORDER BY rowid
        "#,
    )
    .bind(lead_id)
    .fetch_all(pool)
    .await?;

    Ok(schedules)
}

/// Schedules eligible for a send this cycle, by record-side criteria:
/// the schedule governs the record's current stage, the record is active,
/// the due time has elapsed, and any cap has headroom.
///
/// Lead-side exclusions (terminal stage, paused, archived) are applied by
/// the caller after resolving the lead, so a dangling `lead_id` can be
/// observed and skipped instead of silently dropped by a join.
pub async fn due_schedules(pool: &SqlitePool, now: DateTime<Utc>) -> Result<Vec<StageSchedule>> {
    let schedules = sqlx::query_as::<_, StageSchedule>(
        r#"
        SELECT s.lead_id, s.stage, s.kind, s.sends, s.max_sends, s.last_sent_at, s.next_due_at
        FROM stage_schedules s
        INNER JOIN automation_records r
            ON r.lead_id = s.lead_id AND r.current_stage = s.stage
        WHERE r.is_active = 1
          AND s.next_due_at IS NOT NULL
          AND s.next_due_at <= ?
          AND (s.max_sends IS NULL OR s.sends < s.max_sends)
        ORDER BY s.next_due_at
        "#,
    )
    .bind(now)
    .fetch_all(pool)
    .await?;

    Ok(schedules)
}

/// Atomically claim a due schedule by advancing its due time.
///
/// Succeeds only if the stored `next_due_at` and `sends` still match what
/// the selector saw. Returns false when another cycle got there first.
pub async fn claim_schedule(
    pool: &SqlitePool,
    schedule: &StageSchedule,
    next_due_at: DateTime<Utc>,
) -> Result<bool> {
    let result = sqlx::query(
        r#"
        UPDATE stage_schedules
        SET next_due_at = ?
        WHERE lead_id = ?
          AND stage = ?
          AND next_due_at = ?
          AND sends = ?
          AND (max_sends IS NULL OR sends < max_sends)
        "#,
    )
    .bind(next_due_at)
    .bind(&schedule.lead_id)
    .bind(schedule.stage)
    .bind(schedule.next_due_at)
    .bind(schedule.sends)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() == 1)
}

/// Record a completed send: bump the counter and stamp `last_sent_at`.
/// The due time was already advanced by the claim.
pub async fn record_success(
    pool: &SqlitePool,
    lead_id: &str,
    stage: Stage,
    sent_at: DateTime<Utc>,
) -> Result<()> {
    let result = sqlx::query(
        r#"
        UPDATE stage_schedules
        SET sends = sends + 1, last_sent_at = ?
        WHERE lead_id = ? AND stage = ?
        "#,
    )
    .bind(sent_at)
    .bind(lead_id)
    .bind(stage)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DatabaseError::NotFound {
            entity: "StageSchedule",
            id: format!("{}/{}", lead_id, stage),
        });
    }

    Ok(())
}

/// Clear the due time for a schedule (stops further selection until a new
/// stage seeds it again).
pub async fn clear_due(pool: &SqlitePool, lead_id: &str, stage: Stage) -> Result<()> {
    sqlx::query(
        r#"
        UPDATE stage_schedules
        SET next_due_at = NULL
        WHERE lead_id = ? AND stage = ?
        "#,
    )
    .bind(lead_id)
    .bind(stage)
    .execute(pool)
    .await?;

    Ok(())
}

/// Count active automation records.
pub async fn count_active(pool: &SqlitePool) -> Result<i64> {
    let count = sqlx::query_scalar::<_, i64>(
        r#"
        SELECT COUNT(*) FROM automation_records WHERE is_active = 1
        "#,
    )
    .fetch_one(pool)
    .await?;

    Ok(count)
}

/// Convenience: the schedule kind that governs a stage. Terminal stages
/// have no schedule.
pub fn kind_for_stage(stage: Stage) -> Option<ScheduleKind> {
    match stage {
        Stage::Lead | Stage::ProposalSent => Some(ScheduleKind::FollowUpEmail),
        Stage::Qualified | Stage::Negotiations => Some(ScheduleKind::AdminNotification),
        Stage::Won | Stage::Lost => None,
    }
}
