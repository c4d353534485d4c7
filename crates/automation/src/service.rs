//! Lifecycle operations shared by every entry point.
//!
//! Intake, stage changes, event notifications, and the aging report all
//! live here so the HTTP surface and the CLI call the same functions
//! instead of carrying their own query logic.

use chrono::{DateTime, Utc};
use database::models::{AutomationRecord, Lead, NewHistoryEntry, Stage};
use database::{automation, history, lead};
use mailer::EmailSender;
use sqlx::SqlitePool;
use tracing::{info, warn};

use crate::error::{AutomationError, Result};
use crate::policy::StagePolicy;
use crate::template::{self, EmailKind};

/// Take in a new lead: persist it, enroll it in automation, and send the
/// welcome email. The welcome send is best-effort; a delivery failure is
/// recorded in history and does not fail intake.
pub async fn intake_lead(
    pool: &SqlitePool,
    sender: &dyn EmailSender,
    lead_row: &Lead,
    now: DateTime<Utc>,
) -> Result<()> {
    lead::create_lead(pool, lead_row).await?;
    enroll(pool, lead_row, now).await?;

    let message = template::compose_event(EmailKind::Welcome, lead_row, "")?;
    record_send(
        pool,
        sender,
        &lead_row.id,
        EmailKind::Welcome,
        &message,
        now,
    )
    .await?;

    info!(lead_id = %lead_row.id, "Lead intake complete");
    Ok(())
}

/// Enroll an existing lead in automation: one record, with the schedule
/// for its current stage seeded due-now.
pub async fn enroll(pool: &SqlitePool, lead_row: &Lead, now: DateTime<Utc>) -> Result<()> {
    automation::create_record(
        pool,
        &AutomationRecord {
            lead_id: lead_row.id.clone(),
            current_stage: lead_row.stage,
            is_active: !lead_row.stage.is_terminal(),
            created_at: now,
            updated_at: now,
        },
    )
    .await?;

    if let Some(schedule) = StagePolicy::initial_schedule(&lead_row.id, lead_row.stage, now) {
        automation::upsert_schedule(pool, &schedule).await?;
    }

    Ok(())
}

/// Apply a CRM-driven stage change and repoint automation at the new
/// stage. Reaching Won or Lost deactivates automation; any open stage
/// seeds (or re-arms) its schedule.
pub async fn change_stage(
    pool: &SqlitePool,
    lead_id: &str,
    to: Stage,
    now: DateTime<Utc>,
) -> Result<()> {
    let current = lead::get_lead(pool, lead_id).await?;
    if !current.stage.can_transition_to(to) {
        return Err(AutomationError::InvalidTransition {
            from: current.stage,
            to,
        });
    }

    lead::update_stage(pool, lead_id, to, now).await?;
    automation::set_current_stage(pool, lead_id, to, now).await?;

    if to.is_terminal() {
        info!(lead_id, stage = %to, "Lead closed; deactivating automation");
        automation::deactivate(pool, lead_id, now).await?;
        automation::clear_due(pool, lead_id, current.stage).await?;
        return Ok(());
    }

    // Seed the new stage's schedule; revisited stages keep their counters.
    if let Some(schedule) = StagePolicy::initial_schedule(lead_id, to, now) {
        automation::upsert_schedule(pool, &schedule).await?;
    }

    Ok(())
}

/// Send an event-driven notification (welcome, document added, payment
/// due, status update, ticket update) to a lead and record the outcome.
/// Returns whether delivery succeeded.
pub async fn notify_event(
    pool: &SqlitePool,
    sender: &dyn EmailSender,
    lead_id: &str,
    kind: EmailKind,
    detail: &str,
    now: DateTime<Utc>,
) -> Result<bool> {
    let lead_row = lead::get_lead(pool, lead_id).await?;
    let message = template::compose_event(kind, &lead_row, detail)?;
    record_send(pool, sender, lead_id, kind, &message, now).await
}

/// Compose and send the aging report to the admin inbox. Each included
/// lead gets a history entry so its timeline shows it was flagged.
/// Returns the number of aging leads (zero means no report was sent).
pub async fn send_aging_report(
    pool: &SqlitePool,
    sender: &dyn EmailSender,
    admin_email: &str,
    now: DateTime<Utc>,
) -> Result<usize> {
    lead::refresh_aging(pool, now).await?;
    let aging = lead::list_aging(pool).await?;
    if aging.is_empty() {
        return Ok(0);
    }

    let message = template::compose_aging_alert(&aging, admin_email)?;
    let error = match sender.send(&message).await {
        Ok(()) => None,
        Err(err) => {
            warn!(error = %err, "Aging report delivery failed");
            Some(err.to_string())
        }
    };

    for lead_row in &aging {
        history::append(
            pool,
            &NewHistoryEntry {
                lead_id: lead_row.id.clone(),
                email_type: EmailKind::AgingAlert.as_str().to_string(),
                subject: message.subject.clone(),
                recipient: message.recipient.clone(),
                success: error.is_none(),
                error: error.clone(),
                metadata: None,
                sent_at: now,
            },
        )
        .await?;
    }

    Ok(aging.len())
}

async fn record_send(
    pool: &SqlitePool,
    sender: &dyn EmailSender,
    lead_id: &str,
    kind: EmailKind,
    message: &mailer::EmailMessage,
    now: DateTime<Utc>,
) -> Result<bool> {
    let error = match sender.send(message).await {
        Ok(()) => None,
        Err(err) => {
            warn!(lead_id, kind = kind.as_str(), error = %err, "Event delivery failed");
            Some(err.to_string())
        }
    };
    let success = error.is_none();

    history::append(
        pool,
        &NewHistoryEntry {
            lead_id: lead_id.to_string(),
            email_type: kind.as_str().to_string(),
            subject: message.subject.clone(),
            recipient: message.recipient.clone(),
            success,
            error,
            metadata: None,
            sent_at: now,
        },
    )
    .await?;

    Ok(success)
}
