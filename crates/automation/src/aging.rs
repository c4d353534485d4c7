//! Aging classifier.
//!
//! A lead counts as aging when it has sat without contact past the
//! threshold while still open in the pipeline. The SQL bulk filter in
//! `database::lead::list_aging` must agree with this predicate; tests in
//! both crates pin the shared policy.

use database::models::Lead;

/// Days without contact before an open lead counts as aging.
pub const AGING_THRESHOLD_DAYS: i64 = 2;

/// Pure predicate: is this lead aging?
///
/// True iff the lead is at least [`AGING_THRESHOLD_DAYS`] stale, still in
/// an open stage, not paused (a missing pause flag means not paused), and
/// live in the pipeline.
pub fn is_aging(lead: &Lead) -> bool {
    lead.aging_days >= AGING_THRESHOLD_DAYS
        && !lead.stage.is_terminal()
        && !lead.is_aging_paused()
        && lead.is_active
        && !lead.is_archived
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use database::models::Stage;

    fn lead_with(stage: Stage, aging_days: i64) -> Lead {
        let now = Utc::now();
        Lead {
            id: "l1".into(),
            name: "Test".into(),
            email: "t@example.com".into(),
            phone: None,
            stage,
            aging_days,
            aging_paused: None,
            last_contact_date: now,
            is_active: true,
            is_archived: false,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn fresh_leads_are_not_aging() {
        assert!(!is_aging(&lead_with(Stage::Lead, 0)));
        assert!(!is_aging(&lead_with(Stage::Lead, 1)));
    }

    #[test]
    fn stale_open_leads_are_aging() {
        assert!(is_aging(&lead_with(Stage::Lead, 2)));
        assert!(is_aging(&lead_with(Stage::Negotiations, 30)));
    }

    #[test]
    fn terminal_stages_never_age() {
        assert!(!is_aging(&lead_with(Stage::Won, 10)));
        assert!(!is_aging(&lead_with(Stage::Lost, 10)));
    }

    #[test]
    fn paused_leads_never_age() {
        let mut lead = lead_with(Stage::Qualified, 5);
        lead.aging_paused = Some(true);
        assert!(!is_aging(&lead));
    }

    #[test]
    fn missing_pause_flag_means_not_paused() {
        let mut lead = lead_with(Stage::Qualified, 5);
        lead.aging_paused = None;
        assert!(is_aging(&lead));

        lead.aging_paused = Some(false);
        assert!(is_aging(&lead));
    }

    #[test]
    fn inactive_or_archived_leads_never_age() {
        let mut lead = lead_with(Stage::Lead, 5);
        lead.is_active = false;
        assert!(!is_aging(&lead));

        let mut lead = lead_with(Stage::Lead, 5);
        lead.is_archived = true;
        assert!(!is_aging(&lead));
    }
}
