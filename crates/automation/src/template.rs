//! Email composition.
//!
//! One fixed template per event type, rendered to an [`EmailMessage`] with
//! HTML (askama) and plain-text bodies. The dispatcher uses the follow-up
//! and admin-alert templates; the rest back CRM event notifications.

use askama::Template;
use chrono::{DateTime, Utc};
use database::models::{Lead, Stage};
use mailer::EmailMessage;

use crate::error::Result;

/// Event type keying the template to render.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmailKind {
    Welcome,
    DocumentAdded,
    PaymentDue,
    StatusUpdate,
    TicketUpdate,
    FollowUp,
    AgingAlert,
    AdminStageAlert,
}

impl EmailKind {
    /// Stable key stored in email history.
    pub fn as_str(self) -> &'static str {
        match self {
            EmailKind::Welcome => "welcome",
            EmailKind::DocumentAdded => "document_added",
            EmailKind::PaymentDue => "payment_due",
            EmailKind::StatusUpdate => "status_update",
            EmailKind::TicketUpdate => "ticket_update",
            EmailKind::FollowUp => "follow_up",
            EmailKind::AgingAlert => "aging_alert",
            EmailKind::AdminStageAlert => "admin_stage_alert",
        }
    }
}

impl std::str::FromStr for EmailKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "welcome" => Ok(EmailKind::Welcome),
            "document_added" => Ok(EmailKind::DocumentAdded),
            "payment_due" => Ok(EmailKind::PaymentDue),
            "status_update" => Ok(EmailKind::StatusUpdate),
            "ticket_update" => Ok(EmailKind::TicketUpdate),
            "follow_up" => Ok(EmailKind::FollowUp),
            "aging_alert" => Ok(EmailKind::AgingAlert),
            "admin_stage_alert" => Ok(EmailKind::AdminStageAlert),
            other => Err(format!("unknown email kind: {}", other)),
        }
    }
}

#[derive(Template)]
#[template(path = "welcome.html")]
struct WelcomeTemplate<'a> {
    name: &'a str,
}

#[derive(Template)]
#[template(path = "document_added.html")]
struct DocumentAddedTemplate<'a> {
    name: &'a str,
    detail: &'a str,
}

#[derive(Template)]
#[template(path = "payment_due.html")]
struct PaymentDueTemplate<'a> {
    name: &'a str,
    detail: &'a str,
}

#[derive(Template)]
#[template(path = "status_update.html")]
struct StatusUpdateTemplate<'a> {
    name: &'a str,
    stage: &'a str,
    detail: &'a str,
}

#[derive(Template)]
#[template(path = "ticket_update.html")]
struct TicketUpdateTemplate<'a> {
    name: &'a str,
    detail: &'a str,
}

#[derive(Template)]
#[template(path = "follow_up.html")]
struct FollowUpTemplate<'a> {
    name: &'a str,
    proposal: bool,
    send_number: i64,
}

#[derive(Template)]
#[template(path = "admin_stage_alert.html")]
struct AdminStageAlertTemplate<'a> {
    name: &'a str,
    email: &'a str,
    stage: &'a str,
    aging_days: i64,
    last_contact: &'a str,
}

#[derive(Template)]
#[template(path = "aging_alert.html")]
struct AgingAlertTemplate<'a> {
    leads: &'a [Lead],
}

/// Follow-up email to the lead, with copy keyed by stage and send number.
pub fn compose_follow_up(lead: &Lead, send_number: i64) -> Result<EmailMessage> {
    let subject = match lead.stage {
        Stage::ProposalSent => format!("Your renovation proposal — any questions, {}?", lead.name),
        _ => format!("Checking in on your renovation plans, {}", lead.name),
    };

    let html = FollowUpTemplate {
        name: &lead.name,
        proposal: lead.stage == Stage::ProposalSent,
        send_number,
    }
    .render()?;

    let text = match lead.stage {
        Stage::ProposalSent => format!(
            "Hi {},\n\nJust following up on the proposal we sent over. \
             We're happy to walk through any line item or adjust the scope.\n\n\
             — The Renovo team",
            lead.name
        ),
        _ => format!(
            "Hi {},\n\nWe wanted to check in on your renovation plans. \
             If you have questions about scope, budget, or timing, just reply \
             to this email.\n\n— The Renovo team",
            lead.name
        ),
    };

    Ok(EmailMessage {
        recipient: lead.email.clone(),
        subject,
        html,
        text,
    })
}

/// Stage-cadence notification to the admin inbox about one lead.
pub fn compose_admin_alert(lead: &Lead, admin_email: &str) -> Result<EmailMessage> {
    let subject = format!("[Renovo] {} needs attention ({})", lead.name, lead.stage);
    let last_contact = format_date(lead.last_contact_date);

    let html = AdminStageAlertTemplate {
        name: &lead.name,
        email: &lead.email,
        stage: lead.stage.as_str(),
        aging_days: lead.aging_days,
        last_contact: &last_contact,
    }
    .render()?;

    let text = format!(
        "Lead {} <{}> is sitting in stage '{}' ({} days since last contact, \
         last touched {}). Time to reach out.",
        lead.name, lead.email, lead.stage, lead.aging_days, last_contact
    );

    Ok(EmailMessage {
        recipient: admin_email.to_string(),
        subject,
        html,
        text,
    })
}

/// Aging report to the admin inbox covering every aging lead.
pub fn compose_aging_alert(leads: &[Lead], admin_email: &str) -> Result<EmailMessage> {
    let subject = format!("[Renovo] {} aging lead(s) need follow-up", leads.len());

    let html = AgingAlertTemplate { leads }.render()?;

    let mut text = format!("{} lead(s) have gone stale:\n\n", leads.len());
    for lead in leads {
        text.push_str(&format!(
            "  - {} <{}> — {} days, stage {}\n",
            lead.name, lead.email, lead.aging_days, lead.stage
        ));
    }

    Ok(EmailMessage {
        recipient: admin_email.to_string(),
        subject,
        html,
        text,
    })
}

/// Event notification to the lead (welcome, document added, payment due,
/// status update, ticket update). `detail` carries the event-specific
/// line: a document name, an amount, a ticket reference.
pub fn compose_event(kind: EmailKind, lead: &Lead, detail: &str) -> Result<EmailMessage> {
    let (subject, html) = match kind {
        EmailKind::Welcome => (
            format!("Welcome to Renovo, {}", lead.name),
            WelcomeTemplate { name: &lead.name }.render()?,
        ),
        EmailKind::DocumentAdded => (
            "A new document was added to your project".to_string(),
            DocumentAddedTemplate {
                name: &lead.name,
                detail,
            }
            .render()?,
        ),
        EmailKind::PaymentDue => (
            "Payment reminder for your renovation project".to_string(),
            PaymentDueTemplate {
                name: &lead.name,
                detail,
            }
            .render()?,
        ),
        EmailKind::StatusUpdate => (
            "An update on your renovation project".to_string(),
            StatusUpdateTemplate {
                name: &lead.name,
                stage: lead.stage.as_str(),
                detail,
            }
            .render()?,
        ),
        EmailKind::TicketUpdate => (
            "Your support ticket was updated".to_string(),
            TicketUpdateTemplate {
                name: &lead.name,
                detail,
            }
            .render()?,
        ),
        // Scheduled kinds have dedicated compose functions
        EmailKind::FollowUp => return compose_follow_up(lead, 1),
        EmailKind::AgingAlert | EmailKind::AdminStageAlert => {
            return compose_admin_alert(lead, detail)
        }
    };

    let text = format!("Hi {},\n\n{}\n\n— The Renovo team", lead.name, detail);

    Ok(EmailMessage {
        recipient: lead.email.clone(),
        subject,
        html,
        text,
    })
}

fn format_date(ts: DateTime<Utc>) -> String {
    ts.format("%Y-%m-%d").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn lead(stage: Stage) -> Lead {
        let now = Utc::now();
        Lead {
            id: "l1".into(),
            name: "Dana".into(),
            email: "dana@example.com".into(),
            phone: None,
            stage,
            aging_days: 3,
            aging_paused: None,
            last_contact_date: now,
            is_active: true,
            is_archived: false,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn follow_up_targets_the_lead() {
        let message = compose_follow_up(&lead(Stage::Lead), 1).unwrap();
        assert_eq!(message.recipient, "dana@example.com");
        assert!(message.subject.contains("Dana"));
        assert!(message.html.contains("Dana"));
        assert!(!message.text.is_empty());
    }

    #[test]
    fn follow_up_copy_changes_after_proposal() {
        let early = compose_follow_up(&lead(Stage::Lead), 1).unwrap();
        let proposal = compose_follow_up(&lead(Stage::ProposalSent), 1).unwrap();
        assert_ne!(early.subject, proposal.subject);
        assert!(proposal.subject.to_lowercase().contains("proposal"));
    }

    #[test]
    fn admin_alert_targets_the_admin() {
        let message = compose_admin_alert(&lead(Stage::Qualified), "ops@renovo.example").unwrap();
        assert_eq!(message.recipient, "ops@renovo.example");
        assert!(message.subject.contains("Dana"));
        assert!(message.html.contains("qualified"));
    }

    #[test]
    fn aging_alert_lists_every_lead() {
        let leads = vec![lead(Stage::Lead), lead(Stage::Qualified)];
        let message = compose_aging_alert(&leads, "ops@renovo.example").unwrap();
        assert_eq!(message.recipient, "ops@renovo.example");
        assert!(message.subject.contains('2'));
        assert_eq!(message.text.matches("dana@example.com").count(), 2);
    }

    #[test]
    fn event_kinds_render() {
        let lead = lead(Stage::Lead);
        for (kind, detail) in [
            (EmailKind::Welcome, ""),
            (EmailKind::DocumentAdded, "floor-plan-v2.pdf"),
            (EmailKind::PaymentDue, "$4,200 due March 1"),
            (EmailKind::StatusUpdate, "Demolition complete"),
            (EmailKind::TicketUpdate, "ticket #118"),
        ] {
            let message = compose_event(kind, &lead, detail).unwrap();
            assert_eq!(message.recipient, "dana@example.com");
            assert!(!message.subject.is_empty());
            assert!(!message.html.is_empty());
        }
    }

    #[test]
    fn kind_round_trips_through_str() {
        for kind in [
            EmailKind::Welcome,
            EmailKind::DocumentAdded,
            EmailKind::PaymentDue,
            EmailKind::StatusUpdate,
            EmailKind::TicketUpdate,
            EmailKind::FollowUp,
            EmailKind::AgingAlert,
            EmailKind::AdminStageAlert,
        ] {
            assert_eq!(kind.as_str().parse::<EmailKind>().unwrap(), kind);
        }
    }
}
