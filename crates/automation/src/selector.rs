//! Due-work selection.
//!
//! Pulls schedule-side candidates from the store, resolves each owning
//! lead, and applies the lead-side exclusions. Selection is a pure
//! function of stored state and `now`: running it twice with nothing
//! changed yields the same set.

use chrono::{DateTime, Utc};
use database::models::{Lead, StageSchedule};
use database::{automation, lead};
use sqlx::SqlitePool;
use tracing::warn;

use crate::error::Result;

/// One schedule ready for dispatch, paired with its resolved lead.
#[derive(Debug, Clone, PartialEq)]
pub struct DueWorkItem {
    pub schedule: StageSchedule,
    pub lead: Lead,
}

/// The outcome of a selection pass.
#[derive(Debug, Default)]
pub struct Selection {
    /// Items eligible for a send this cycle.
    pub due: Vec<DueWorkItem>,
    /// Schedules whose owning lead no longer exists.
    pub missing_leads: Vec<String>,
    /// Leads found in a terminal stage; their automation should be
    /// deactivated by the caller.
    pub terminal_leads: Vec<String>,
}

/// Select all work due at `now`.
///
/// A dangling schedule (lead deleted out from under it) is logged and
/// reported, never fatal. Terminal, paused, inactive, and archived leads
/// are excluded no matter how overdue their schedules are.
pub async fn select_due(pool: &SqlitePool, now: DateTime<Utc>) -> Result<Selection> {
    let candidates = automation::due_schedules(pool, now).await?;
    let mut selection = Selection::default();

    for schedule in candidates {
        let Some(owner) = lead::find_lead(pool, &schedule.lead_id).await? else {
            warn!(
                lead_id = %schedule.lead_id,
                stage = %schedule.stage,
                "Automation record references a missing lead; skipping"
            );
            selection.missing_leads.push(schedule.lead_id.clone());
            continue;
        };

        if owner.stage.is_terminal() {
            selection.terminal_leads.push(owner.id.clone());
            continue;
        }

        if owner.is_aging_paused() || !owner.is_active || owner.is_archived {
            continue;
        }

        selection.due.push(DueWorkItem {
            schedule,
            lead: owner,
        });
    }

    Ok(selection)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use database::models::{AutomationRecord, ScheduleKind, Stage};
    use database::Database;

    async fn test_db() -> Database {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        db.migrate().await.unwrap();
        db
    }

    fn sample_lead(id: &str, stage: Stage) -> Lead {
        let now = Utc::now();
        Lead {
            id: id.to_string(),
            name: "Test".to_string(),
            email: format!("{}@example.com", id),
            phone: None,
            stage,
            aging_days: 0,
            aging_paused: None,
            last_contact_date: now,
            is_active: true,
            is_archived: false,
            created_at: now,
            updated_at: now,
        }
    }

    async fn seed(pool: &SqlitePool, lead_row: &Lead, sends: i64, max: Option<i64>, due: DateTime<Utc>) {
        let now = Utc::now();
        let record = AutomationRecord {
            lead_id: lead_row.id.clone(),
            current_stage: lead_row.stage,
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        automation::create_record(pool, &record).await.unwrap();
        let kind = automation::kind_for_stage(lead_row.stage).unwrap_or(ScheduleKind::FollowUpEmail);
        automation::upsert_schedule(
            pool,
            &StageSchedule {
                lead_id: lead_row.id.clone(),
                stage: lead_row.stage,
                kind,
                sends,
                max_sends: max,
                last_sent_at: None,
                next_due_at: Some(due),
            },
        )
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn overdue_open_lead_is_selected() {
        let db = test_db().await;
        let pool = db.pool();
        let now = Utc::now();

        let a = sample_lead("a", Stage::Lead);
        lead::create_lead(pool, &a).await.unwrap();
        seed(pool, &a, 0, Some(5), now - Duration::days(1)).await;

        let selection = select_due(pool, now).await.unwrap();
        assert_eq!(selection.due.len(), 1);
        assert_eq!(selection.due[0].lead.id, "a");
        assert!(selection.missing_leads.is_empty());
    }

    #[tokio::test]
    async fn selection_is_idempotent_at_fixed_now() {
        let db = test_db().await;
        let pool = db.pool();
        let now = Utc::now();

        let a = sample_lead("a", Stage::Lead);
        lead::create_lead(pool, &a).await.unwrap();
        seed(pool, &a, 0, Some(5), now - Duration::days(1)).await;

        let first = select_due(pool, now).await.unwrap();
        let second = select_due(pool, now).await.unwrap();
        assert_eq!(first.due, second.due);
    }

    #[tokio::test]
    async fn terminal_lead_is_reported_not_selected() {
        let db = test_db().await;
        let pool = db.pool();
        let now = Utc::now();

        // Record still points at negotiations, but the CRM marked the deal won
        let mut b = sample_lead("b", Stage::Negotiations);
        lead::create_lead(pool, &b).await.unwrap();
        seed(pool, &b, 0, None, now - Duration::days(2)).await;
        b.stage = Stage::Won;
        lead::update_stage(pool, "b", Stage::Won, now).await.unwrap();

        let selection = select_due(pool, now).await.unwrap();
        assert!(selection.due.is_empty());
        assert_eq!(selection.terminal_leads, vec!["b".to_string()]);
    }

    #[tokio::test]
    async fn paused_lead_is_excluded() {
        let db = test_db().await;
        let pool = db.pool();
        let now = Utc::now();

        let mut c = sample_lead("c", Stage::Qualified);
        c.aging_paused = Some(true);
        lead::create_lead(pool, &c).await.unwrap();
        seed(pool, &c, 0, None, now - Duration::days(2)).await;

        let selection = select_due(pool, now).await.unwrap();
        assert!(selection.due.is_empty());
        assert!(selection.terminal_leads.is_empty());
    }

    #[tokio::test]
    async fn missing_lead_is_skipped_with_report() {
        let db = test_db().await;
        let pool = db.pool();
        let now = Utc::now();

        // Schedule exists, lead never created
        let ghost = sample_lead("ghost", Stage::Lead);
        seed(pool, &ghost, 0, Some(5), now - Duration::days(1)).await;

        let selection = select_due(pool, now).await.unwrap();
        assert!(selection.due.is_empty());
        assert_eq!(selection.missing_leads, vec!["ghost".to_string()]);
    }

    #[tokio::test]
    async fn capped_out_schedule_is_not_selected() {
        let db = test_db().await;
        let pool = db.pool();
        let now = Utc::now();

        let d = sample_lead("d", Stage::Lead);
        lead::create_lead(pool, &d).await.unwrap();
        seed(pool, &d, 5, Some(5), now - Duration::days(1)).await;

        let selection = select_due(pool, now).await.unwrap();
        assert!(selection.due.is_empty());
    }
}
