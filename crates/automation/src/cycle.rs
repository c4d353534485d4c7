//! The automation cycle.
//!
//! One invocation per external trigger (scheduled job or admin action):
//! refresh aging counters, select due work, claim and dispatch each item
//! sequentially, and hand back an aggregate summary. Per-lead failures
//! never abort the cycle.

use chrono::{DateTime, Utc};
use mailer::EmailSender;
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use tracing::{debug, info};

use database::models::ScheduleKind;
use database::{automation, lead};

use crate::dispatcher::{self, DispatchOutcome};
use crate::error::Result;
use crate::policy::StagePolicy;
use crate::selector;

/// Aggregate result of one cycle, returned to the triggering caller.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CycleSummary {
    /// Leads with at least one send attempt this cycle.
    pub leads_processed: usize,
    /// Follow-up emails delivered.
    pub emails_sent: usize,
    /// Admin notifications delivered.
    pub admin_alerts_sent: usize,
    /// Delivery failures (recorded in history).
    pub failures: usize,
    /// Schedules skipped because the owning lead is gone.
    pub skipped_missing_lead: usize,
    /// Records deactivated after their lead reached Won/Lost.
    pub deactivated_terminal: usize,
    /// Due items lost to a concurrent cycle's claim.
    pub claim_conflicts: usize,
}

/// Run one automation cycle at `now`.
///
/// This is the single entry point shared by the HTTP trigger and the CLI;
/// neither carries its own query logic.
pub async fn run_cycle(
    pool: &SqlitePool,
    sender: &dyn EmailSender,
    admin_email: &str,
    now: DateTime<Utc>,
) -> Result<CycleSummary> {
    let refreshed = lead::refresh_aging(pool, now).await?;
    debug!(refreshed, "Aging counters recomputed");

    let selection = selector::select_due(pool, now).await?;
    let mut summary = CycleSummary {
        skipped_missing_lead: selection.missing_leads.len(),
        ..CycleSummary::default()
    };

    for lead_id in &selection.terminal_leads {
        automation::deactivate(pool, lead_id, now).await?;
        summary.deactivated_terminal += 1;
    }

    for item in &selection.due {
        let Some(policy) = StagePolicy::for_stage(item.schedule.stage) else {
            // Schedules only exist for open stages; a row for a terminal
            // stage means stale data, not work.
            continue;
        };

        // Claim before sending: the conditional update is what makes
        // overlapping cycle invocations safe.
        let next_due = policy.next_due_after(now);
        if !automation::claim_schedule(pool, &item.schedule, next_due).await? {
            debug!(lead_id = %item.lead.id, "Lost claim to a concurrent cycle");
            summary.claim_conflicts += 1;
            continue;
        }

        summary.leads_processed += 1;
        match dispatcher::dispatch(pool, sender, item, admin_email, now).await? {
            DispatchOutcome::Sent(ScheduleKind::FollowUpEmail) => summary.emails_sent += 1,
            DispatchOutcome::Sent(ScheduleKind::AdminNotification) => {
                summary.admin_alerts_sent += 1
            }
            DispatchOutcome::Failed => summary.failures += 1,
        }
    }

    info!(
        leads = summary.leads_processed,
        emails = summary.emails_sent,
        alerts = summary.admin_alerts_sent,
        failures = summary.failures,
        "Automation cycle complete"
    );

    Ok(summary)
}
