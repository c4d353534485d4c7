//! Notification dispatch.
//!
//! Takes a claimed work item, renders the template for its schedule kind,
//! hands the message to the delivery collaborator, and records the outcome
//! in email history. Delivery failure is an outcome, not an error: the
//! schedule stays advanced (the claim already moved `next_due_at`) and the
//! failure is only visible in history. There is no in-cycle retry and no
//! backoff.

use chrono::{DateTime, Utc};
use database::models::{NewHistoryEntry, ScheduleKind};
use database::{automation, history};
use mailer::{EmailMessage, EmailSender};
use sqlx::SqlitePool;
use tracing::{info, warn};

use crate::error::Result;
use crate::selector::DueWorkItem;
use crate::template::{self, EmailKind};

/// What happened to one dispatched item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Delivered; counters updated.
    Sent(ScheduleKind),
    /// Provider refused or transport failed; recorded in history.
    Failed,
}

/// Dispatch one claimed work item.
///
/// The caller must have claimed the schedule first; this function assumes
/// it holds the only claim for this cycle.
pub async fn dispatch(
    pool: &SqlitePool,
    sender: &dyn EmailSender,
    item: &DueWorkItem,
    admin_email: &str,
    now: DateTime<Utc>,
) -> Result<DispatchOutcome> {
    let (kind, message) = compose(item, admin_email)?;

    match sender.send(&message).await {
        Ok(()) => {
            automation::record_success(pool, &item.lead.id, item.schedule.stage, now).await?;
            append_history(pool, item, kind, &message, now, None).await?;

            // A send that uses up the cap ends automation for this lead.
            let exhausted = item
                .schedule
                .max_sends
                .is_some_and(|max| item.schedule.sends + 1 >= max);
            if exhausted {
                info!(
                    lead_id = %item.lead.id,
                    stage = %item.schedule.stage,
                    "Send cap reached; deactivating automation"
                );
                automation::deactivate(pool, &item.lead.id, now).await?;
            }

            info!(
                lead_id = %item.lead.id,
                stage = %item.schedule.stage,
                kind = kind.as_str(),
                "Dispatched"
            );
            Ok(DispatchOutcome::Sent(item.schedule.kind))
        }
        Err(err) => {
            warn!(
                lead_id = %item.lead.id,
                stage = %item.schedule.stage,
                error = %err,
                "Delivery failed; recorded in history"
            );
            append_history(pool, item, kind, &message, now, Some(err.to_string())).await?;
            Ok(DispatchOutcome::Failed)
        }
    }
}

fn compose(item: &DueWorkItem, admin_email: &str) -> Result<(EmailKind, EmailMessage)> {
    match item.schedule.kind {
        ScheduleKind::FollowUpEmail => {
            let message = template::compose_follow_up(&item.lead, item.schedule.sends + 1)?;
            Ok((EmailKind::FollowUp, message))
        }
        ScheduleKind::AdminNotification => {
            let message = template::compose_admin_alert(&item.lead, admin_email)?;
            Ok((EmailKind::AdminStageAlert, message))
        }
    }
}

async fn append_history(
    pool: &SqlitePool,
    item: &DueWorkItem,
    kind: EmailKind,
    message: &EmailMessage,
    now: DateTime<Utc>,
    error: Option<String>,
) -> Result<()> {
    let metadata = serde_json::json!({
        "stage": item.schedule.stage.as_str(),
        "send_number": item.schedule.sends + 1,
    });

    history::append(
        pool,
        &NewHistoryEntry {
            lead_id: item.lead.id.clone(),
            email_type: kind.as_str().to_string(),
            subject: message.subject.clone(),
            recipient: message.recipient.clone(),
            success: error.is_none(),
            error,
            metadata: Some(metadata.to_string()),
            sent_at: now,
        },
    )
    .await?;

    Ok(())
}
