//! Database models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use std::str::FromStr;

/// Pipeline stage of a lead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum Stage {
    Lead,
    Qualified,
    ProposalSent,
    Negotiations,
    Won,
    Lost,
}

impl Stage {
    /// Whether the stage ends the pipeline (no further automation).
    pub fn is_terminal(self) -> bool {
        matches!(self, Stage::Won | Stage::Lost)
    }

    /// Whether a CRM-driven transition to `next` is allowed.
    ///
    /// Stages advance one step at a time; a deal can be marked Lost from
    /// any open stage, and Won only out of Negotiations.
    pub fn can_transition_to(self, next: Stage) -> bool {
        if self.is_terminal() {
            return false;
        }
        match (self, next) {
            (Stage::Lead, Stage::Qualified) => true,
            (Stage::Qualified, Stage::ProposalSent) => true,
            (Stage::ProposalSent, Stage::Negotiations) => true,
            (Stage::Negotiations, Stage::Won) => true,
            (_, Stage::Lost) => true,
            _ => false,
        }
    }

    /// Stable string form, matching the database encoding.
    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Lead => "lead",
            Stage::Qualified => "qualified",
            Stage::ProposalSent => "proposal_sent",
            Stage::Negotiations => "negotiations",
            Stage::Won => "won",
            Stage::Lost => "lost",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Stage {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "lead" => Ok(Stage::Lead),
            "qualified" => Ok(Stage::Qualified),
            "proposal_sent" => Ok(Stage::ProposalSent),
            "negotiations" => Ok(Stage::Negotiations),
            "won" => Ok(Stage::Won),
            "lost" => Ok(Stage::Lost),
            other => Err(format!("unknown stage: {}", other)),
        }
    }
}

/// What a stage schedule counts: follow-up emails to the lead, or
/// notifications to the admin inbox.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum ScheduleKind {
    FollowUpEmail,
    AdminNotification,
}

/// A prospective customer tracked through the sales pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Lead {
    /// UUID string.
    pub id: String,
    /// Contact name.
    pub name: String,
    /// Contact email (delivery recipient for follow-ups).
    pub email: String,
    /// Contact phone, if known.
    pub phone: Option<String>,
    /// Current pipeline stage.
    pub stage: Stage,
    /// Days since last contact, recomputed periodically.
    pub aging_days: i64,
    /// NULL means not paused; read through [`Lead::is_aging_paused`].
    pub aging_paused: Option<bool>,
    /// When the lead was last contacted.
    pub last_contact_date: DateTime<Utc>,
    /// Whether the lead is live in the pipeline.
    pub is_active: bool,
    /// Archived leads are excluded from all scheduling.
    pub is_archived: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Lead {
    /// Defaulting accessor: a missing `aging_paused` value means not paused.
    pub fn is_aging_paused(&self) -> bool {
        self.aging_paused.unwrap_or(false)
    }
}

/// Per-lead automation bookkeeping (one-to-one with a lead).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct AutomationRecord {
    /// Owning lead.
    pub lead_id: String,
    /// Stage whose schedule currently governs sends.
    pub current_stage: Stage,
    /// Cleared when the lead reaches a terminal stage or exhausts its cap.
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Scheduling state for one (record, stage) pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct StageSchedule {
    pub lead_id: String,
    pub stage: Stage,
    pub kind: ScheduleKind,
    /// Sends completed for this stage.
    pub sends: i64,
    /// Hard cap; NULL for admin-notification stages (tracked, not capped).
    pub max_sends: Option<i64>,
    pub last_sent_at: Option<DateTime<Utc>>,
    /// Cleared or advanced on every send attempt.
    pub next_due_at: Option<DateTime<Utc>>,
}

impl StageSchedule {
    /// Whether the capped stage has used up its allowance.
    pub fn is_exhausted(&self) -> bool {
        matches!(self.max_sends, Some(max) if self.sends >= max)
    }
}

/// One append-only record of a send attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct EmailHistoryEntry {
    /// Auto-incrementing ID.
    pub id: i64,
    pub lead_id: String,
    /// Template key, e.g. "follow_up" or "aging_alert".
    pub email_type: String,
    pub subject: String,
    pub recipient: String,
    pub success: bool,
    /// Delivery error, present when `success` is false.
    pub error: Option<String>,
    /// Optional JSON blob with send context.
    pub metadata: Option<String>,
    pub sent_at: DateTime<Utc>,
}

/// A history entry before it has been assigned an ID.
#[derive(Debug, Clone)]
pub struct NewHistoryEntry {
    pub lead_id: String,
    pub email_type: String,
    pub subject: String,
    pub recipient: String,
    pub success: bool,
    pub error: Option<String>,
    pub metadata: Option<String>,
    pub sent_at: DateTime<Utc>,
}
