//! Per-stage cadence policy.
//!
//! Each open stage carries a fixed send cadence and, for follow-up email
//! stages, a hard cap. Admin-notification stages are tracked but uncapped.

use chrono::{DateTime, Duration, Utc};
use database::models::{ScheduleKind, Stage, StageSchedule};

/// Cadence and cap for one pipeline stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StagePolicy {
    /// What kind of send this stage schedules.
    pub kind: ScheduleKind,
    /// Hard send cap; `None` for admin-notification stages.
    pub max_sends: Option<i64>,
    /// Days between sends.
    pub cadence_days: i64,
}

impl StagePolicy {
    /// The policy governing a stage. Terminal stages have none.
    pub fn for_stage(stage: Stage) -> Option<StagePolicy> {
        match stage {
            Stage::Lead => Some(StagePolicy {
                kind: ScheduleKind::FollowUpEmail,
                max_sends: Some(5),
                cadence_days: 3,
            }),
            Stage::ProposalSent => Some(StagePolicy {
                kind: ScheduleKind::FollowUpEmail,
                max_sends: Some(4),
                cadence_days: 4,
            }),
            Stage::Qualified | Stage::Negotiations => Some(StagePolicy {
                kind: ScheduleKind::AdminNotification,
                max_sends: None,
                cadence_days: 2,
            }),
            Stage::Won | Stage::Lost => None,
        }
    }

    /// The due time following a send attempt at `now`.
    pub fn next_due_after(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now + Duration::days(self.cadence_days)
    }

    /// A fresh schedule for `stage`, due immediately so the first send
    /// fires on the next cycle.
    pub fn initial_schedule(
        lead_id: &str,
        stage: Stage,
        now: DateTime<Utc>,
    ) -> Option<StageSchedule> {
        let policy = Self::for_stage(stage)?;
        Some(StageSchedule {
            lead_id: lead_id.to_string(),
            stage,
            kind: policy.kind,
            sends: 0,
            max_sends: policy.max_sends,
            last_sent_at: None,
            next_due_at: Some(now),
        })
    }
}
