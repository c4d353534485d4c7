//! SQLite persistence layer for the Renovo lead-automation service.
//!
//! This crate provides async database operations for leads, automation
//! records, stage schedules, and email history using SQLx with SQLite.
//!
//! # Example
//!
//! ```no_run
//! use database::{Database, lead};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Connect and run migrations
//!     let db = Database::connect("sqlite:renovo.db?mode=rwc").await?;
//!     db.migrate().await?;
//!
//!     let aging = lead::list_aging(db.pool()).await?;
//!     println!("{} leads need attention", aging.len());
//!
//!     Ok(())
//! }
//! ```

pub mod automation;
pub mod error;
pub mod history;
pub mod lead;
pub mod models;
pub mod validation;

pub use error::{DatabaseError, Result};
pub use models::{
    AutomationRecord, EmailHistoryEntry, Lead, NewHistoryEntry, ScheduleKind, Stage,
    StageSchedule,
};
pub use validation::ValidationError;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::str::FromStr;

/// Database connection wrapper.
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Default pool size for database connections.
    const DEFAULT_POOL_SIZE: u32 = 10;

    /// Connect to a SQLite database.
    ///
    /// The URL should be in the format `sqlite:path/to/db.sqlite?mode=rwc`.
    /// Use `?mode=rwc` to create the database file if it doesn't exist, or
    /// `sqlite::memory:` for tests.
    pub async fn connect(url: &str) -> Result<Self> {
        Self::connect_with_pool_size(url, Self::DEFAULT_POOL_SIZE).await
    }

    /// Connect to a SQLite database with a custom pool size.
    pub async fn connect_with_pool_size(url: &str, pool_size: u32) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(url)?
            .create_if_missing(true)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(pool_size)
            .acquire_timeout(std::time::Duration::from_secs(30))
            .connect_with(options)
            .await?;

        tracing::info!("Connected to database: {} (pool size: {})", url, pool_size);

        Ok(Self { pool })
    }

    /// Run database migrations.
    ///
    /// This should be called once after connecting to ensure the schema is up to date.
    pub async fn migrate(&self) -> Result<()> {
        tracing::info!("Running database migrations...");

        sqlx::migrate!("./migrations").run(&self.pool).await?;

        tracing::info!("Migrations complete");
        Ok(())
    }

    /// Get a reference to the connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Close the database connection pool.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use models::{AutomationRecord, Lead, ScheduleKind, Stage, StageSchedule};

    async fn test_db() -> Database {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        db.migrate().await.unwrap();
        db
    }

    fn sample_lead(id: &str, stage: Stage) -> Lead {
        let now = Utc::now();
        Lead {
            id: id.to_string(),
            name: "Dana Whitfield".to_string(),
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

    #[tokio::test]
    async fn test_lead_crud() {
        let db = test_db().await;
        let pool = db.pool();

        let lead = sample_lead("lead-1", Stage::Lead);
        lead::create_lead(pool, &lead).await.unwrap();

        let fetched = lead::get_lead(pool, "lead-1").await.unwrap();
        assert_eq!(fetched.name, "Dana Whitfield");
        assert_eq!(fetched.stage, Stage::Lead);
        assert!(!fetched.is_aging_paused());

        // Duplicate IDs are rejected
        let result = lead::create_lead(pool, &lead).await;
        assert!(matches!(result, Err(DatabaseError::AlreadyExists { .. })));

        lead::update_stage(pool, "lead-1", Stage::Qualified, Utc::now())
            .await
            .unwrap();
        let fetched = lead::get_lead(pool, "lead-1").await.unwrap();
        assert_eq!(fetched.stage, Stage::Qualified);

        lead::delete_lead(pool, "lead-1").await.unwrap();
        let result = lead::get_lead(pool, "lead-1").await;
        assert!(matches!(result, Err(DatabaseError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_create_lead_rejects_bad_email() {
        let db = test_db().await;

        let mut lead = sample_lead("lead-bad", Stage::Lead);
        lead.email = "not-an-email".to_string();

        let result = lead::create_lead(db.pool(), &lead).await;
        assert!(matches!(result, Err(DatabaseError::Validation(_))));
    }

    #[tokio::test]
    async fn test_list_aging_filters() {
        let db = test_db().await;
        let pool = db.pool();
        let now = Utc::now();

        // Aging: 5 days stale, open stage
        let mut a = sample_lead("a", Stage::Lead);
        a.aging_days = 5;
        lead::create_lead(pool, &a).await.unwrap();

        // Fresh: below the threshold
        let mut b = sample_lead("b", Stage::Lead);
        b.aging_days = 1;
        lead::create_lead(pool, &b).await.unwrap();

        // Won: excluded regardless of staleness
        let mut c = sample_lead("c", Stage::Won);
        c.aging_days = 10;
        lead::create_lead(pool, &c).await.unwrap();

        // Paused: excluded
        let mut d = sample_lead("d", Stage::Qualified);
        d.aging_days = 5;
        d.aging_paused = Some(true);
        lead::create_lead(pool, &d).await.unwrap();

        // Archived: excluded
        let mut e = sample_lead("e", Stage::Lead);
        e.aging_days = 5;
        e.is_archived = true;
        lead::create_lead(pool, &e).await.unwrap();

        let aging = lead::list_aging(pool).await.unwrap();
        assert_eq!(aging.len(), 1);
        assert_eq!(aging[0].id, "a");

        // touch_contact resets the counter
        lead::touch_contact(pool, "a", now).await.unwrap();
        let aging = lead::list_aging(pool).await.unwrap();
        assert!(aging.is_empty());
    }

    #[tokio::test]
    async fn test_refresh_aging_recomputes_from_last_contact() {
        let db = test_db().await;
        let pool = db.pool();
        let now = Utc::now();

        let mut lead_row = sample_lead("stale", Stage::Lead);
        lead_row.last_contact_date = now - Duration::days(4);
        lead::create_lead(pool, &lead_row).await.unwrap();

        let touched = lead::refresh_aging(pool, now).await.unwrap();
        assert_eq!(touched, 1);

        let fetched = lead::get_lead(pool, "stale").await.unwrap();
        assert_eq!(fetched.aging_days, 4);
    }

    #[tokio::test]
    async fn test_due_claim_and_record_flow() {
        let db = test_db().await;
        let pool = db.pool();
        let now = Utc::now();

        let lead_row = sample_lead("lead-2", Stage::Lead);
        lead::create_lead(pool, &lead_row).await.unwrap();

        let record = AutomationRecord {
            lead_id: "lead-2".to_string(),
            current_stage: Stage::Lead,
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        automation::create_record(pool, &record).await.unwrap();

        let schedule = StageSchedule {
            lead_id: "lead-2".to_string(),
            stage: Stage::Lead,
            kind: ScheduleKind::FollowUpEmail,
            sends: 0,
            max_sends: Some(5),
            last_sent_at: None,
            next_due_at: Some(now - Duration::days(1)),
        };
        automation::upsert_schedule(pool, &schedule).await.unwrap();

        // Due now
        let due = automation::due_schedules(pool, now).await.unwrap();
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].lead_id, "lead-2");

        // Selection is idempotent while state is unchanged
        let due_again = automation::due_schedules(pool, now).await.unwrap();
        assert_eq!(due, due_again);

        // First claim wins, second loses
        let next = now + Duration::days(3);
        assert!(automation::claim_schedule(pool, &due[0], next).await.unwrap());
        assert!(!automation::claim_schedule(pool, &due[0], next).await.unwrap());

        // No longer due this cycle
        assert!(automation::due_schedules(pool, now).await.unwrap().is_empty());

        automation::record_success(pool, "lead-2", Stage::Lead, now)
            .await
            .unwrap();
        let updated = automation::get_schedule(pool, "lead-2", Stage::Lead)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.sends, 1);
        assert_eq!(updated.last_sent_at, Some(now));
        assert!(updated.next_due_at.unwrap() > now);
    }

    #[tokio::test]
    async fn test_capped_out_schedule_is_never_due() {
        let db = test_db().await;
        let pool = db.pool();
        let now = Utc::now();

        let record = AutomationRecord {
            lead_id: "lead-3".to_string(),
            current_stage: Stage::Lead,
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        automation::create_record(pool, &record).await.unwrap();

        let schedule = StageSchedule {
            lead_id: "lead-3".to_string(),
            stage: Stage::Lead,
            kind: ScheduleKind::FollowUpEmail,
            sends: 5,
            max_sends: Some(5),
            last_sent_at: Some(now - Duration::days(3)),
            next_due_at: Some(now - Duration::days(1)),
        };
        automation::upsert_schedule(pool, &schedule).await.unwrap();

        assert!(automation::due_schedules(pool, now).await.unwrap().is_empty());
        // Claim refuses too, even with matching state
        assert!(!automation::claim_schedule(pool, &schedule, now).await.unwrap());
    }

    #[tokio::test]
    async fn test_inactive_record_excluded_from_due() {
        let db = test_db().await;
        let pool = db.pool();
        let now = Utc::now();

        let record = AutomationRecord {
            lead_id: "lead-4".to_string(),
            current_stage: Stage::Lead,
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        automation::create_record(pool, &record).await.unwrap();

        let schedule = StageSchedule {
            lead_id: "lead-4".to_string(),
            stage: Stage::Lead,
            kind: ScheduleKind::FollowUpEmail,
            sends: 0,
            max_sends: Some(5),
            last_sent_at: None,
            next_due_at: Some(now - Duration::days(1)),
        };
        automation::upsert_schedule(pool, &schedule).await.unwrap();

        automation::deactivate(pool, "lead-4", now).await.unwrap();
        assert!(automation::due_schedules(pool, now).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_archive_excludes_from_aging() {
        let db = test_db().await;
        let pool = db.pool();
        let now = Utc::now();

        let mut stale = sample_lead("old", Stage::Lead);
        stale.aging_days = 6;
        lead::create_lead(pool, &stale).await.unwrap();

        assert_eq!(lead::list_leads(pool).await.unwrap().len(), 1);
        assert_eq!(lead::list_aging(pool).await.unwrap().len(), 1);

        lead::archive_lead(pool, "old", now).await.unwrap();
        assert!(lead::list_aging(pool).await.unwrap().is_empty());

        // Still present, just out of the pipeline
        let fetched = lead::get_lead(pool, "old").await.unwrap();
        assert!(fetched.is_archived);
    }

    #[tokio::test]
    async fn test_history_append_only() {
        let db = test_db().await;
        let pool = db.pool();
        let now = Utc::now();

        let ok = NewHistoryEntry {
            lead_id: "lead-5".to_string(),
            email_type: "follow_up".to_string(),
            subject: "Checking in".to_string(),
            recipient: "lead-5@example.com".to_string(),
            success: true,
            error: None,
            metadata: None,
            sent_at: now,
        };
        history::append(pool, &ok).await.unwrap();

        let failed = NewHistoryEntry {
            success: false,
            error: Some("provider timeout".to_string()),
            sent_at: now + Duration::seconds(5),
            ..ok.clone()
        };
        history::append(pool, &failed).await.unwrap();

        let entries = history::for_lead(pool, "lead-5", 10).await.unwrap();
        assert_eq!(entries.len(), 2);
        // Newest first
        assert!(!entries[0].success);
        assert_eq!(entries[0].error.as_deref(), Some("provider timeout"));

        let failures = history::recent_failures(pool, 10).await.unwrap();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].lead_id, "lead-5");

        assert_eq!(history::count_for_lead(pool, "lead-5").await.unwrap(), 2);
    }
}
