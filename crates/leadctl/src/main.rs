//! Diagnostic CLI for Renovo lead automation.
//!
//! Every subcommand goes through the same library functions as the HTTP
//! trigger; this binary adds no query logic of its own.

use std::env;
use std::sync::Arc;

use chrono::Utc;
use clap::{Parser, Subcommand};
use tracing::info;

use database::{automation as automation_db, history, lead, Database};
use mailer::{EmailSender, LoggingSender, WebhookSender};

#[derive(Debug, Parser)]
#[command(name = "leadctl")]
#[command(about = "Inspect and drive the lead-automation scheduler")]
struct Args {
    /// SQLite database URL. Falls back to SQLITE_PATH env.
    #[arg(long)]
    database_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run one automation cycle and print the summary
    Run {
        /// Recipient for admin notifications. Falls back to ADMIN_EMAIL env.
        #[arg(long)]
        admin_email: Option<String>,

        /// Delivery provider endpoint; sends are dry-run when unset
        #[arg(long)]
        webhook_url: Option<String>,
    },
    /// Send the aging report to the admin inbox
    AgingReport {
        #[arg(long)]
        admin_email: Option<String>,

        #[arg(long)]
        webhook_url: Option<String>,
    },
    /// List aging leads
    Aging,
    /// Show a lead's automation record, schedules, and recent history
    Status {
        /// Lead ID
        lead_id: String,
    },
    /// Summary counts: leads by stage, active automation, recent failures
    Stats,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt::init();
    let args = Args::parse();

    let database_url = args
        .database_url
        .or_else(|| env::var("SQLITE_PATH").ok())
        .unwrap_or_else(|| "sqlite:renovo.db?mode=rwc".to_string());

    let db = Database::connect(&database_url).await?;
    db.migrate().await?;
    let pool = db.pool();

    match args.command {
        Command::Run {
            admin_email,
            webhook_url,
        } => {
            let admin_email = require_admin_email(admin_email)?;
            let sender = make_sender(webhook_url);
            let summary =
                automation::run_cycle(pool, sender.as_ref(), &admin_email, Utc::now()).await?;
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
        Command::AgingReport {
            admin_email,
            webhook_url,
        } => {
            let admin_email = require_admin_email(admin_email)?;
            let sender = make_sender(webhook_url);
            let count = automation::service::send_aging_report(
                pool,
                sender.as_ref(),
                &admin_email,
                Utc::now(),
            )
            .await?;
            if count == 0 {
                println!("No aging leads; report skipped");
            } else {
                println!("Aging report sent covering {} lead(s)", count);
            }
        }
        Command::Aging => {
            lead::refresh_aging(pool, Utc::now()).await?;
            let leads = lead::list_aging(pool).await?;
            if leads.is_empty() {
                println!("No aging leads");
            } else {
                for l in &leads {
                    println!(
                        "{}  {} <{}>  stage={}  {} day(s) stale",
                        l.id, l.name, l.email, l.stage, l.aging_days
                    );
                }
                println!("{} aging lead(s)", leads.len());
            }
        }
        Command::Status { lead_id } => {
            let record = automation_db::get_record(pool, &lead_id).await?;
            println!(
                "record: stage={} active={}",
                record.current_stage, record.is_active
            );

            for s in automation_db::schedules_for_lead(pool, &lead_id).await? {
                let cap = s
                    .max_sends
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| "-".to_string());
                let due = s
                    .next_due_at
                    .map(|d| d.to_rfc3339())
                    .unwrap_or_else(|| "-".to_string());
                println!(
                    "schedule: stage={} kind={:?} sends={}/{} next_due={}",
                    s.stage, s.kind, s.sends, cap, due
                );
            }

            for e in history::for_lead(pool, &lead_id, 10).await? {
                let outcome = if e.success {
                    "ok".to_string()
                } else {
                    format!("FAILED ({})", e.error.as_deref().unwrap_or("unknown"))
                };
                println!(
                    "history: {} {} -> {} [{}]",
                    e.sent_at.to_rfc3339(),
                    e.email_type,
                    e.recipient,
                    outcome
                );
            }
        }
        Command::Stats => {
            for (stage, count) in lead::count_by_stage(pool).await? {
                println!("{:>14}: {}", stage.to_string(), count);
            }
            let active = automation_db::count_active(pool).await?;
            println!("active automation records: {}", active);

            let failures = history::recent_failures(pool, 10).await?;
            println!("recent delivery failures: {}", failures.len());
            for e in failures {
                println!(
                    "  {} {} -> {}: {}",
                    e.sent_at.to_rfc3339(),
                    e.email_type,
                    e.recipient,
                    e.error.as_deref().unwrap_or("unknown")
                );
            }
        }
    }

    info!("Done");
    Ok(())
}

fn require_admin_email(
    flag: Option<String>,
) -> Result<String, Box<dyn std::error::Error>> {
    flag.or_else(|| env::var("ADMIN_EMAIL").ok())
        .ok_or_else(|| "Missing admin email (--admin-email or ADMIN_EMAIL)".into())
}

fn make_sender(webhook_url: Option<String>) -> Arc<dyn EmailSender> {
    match webhook_url.or_else(|| env::var("MAIL_WEBHOOK_URL").ok()) {
        Some(url) => Arc::new(WebhookSender::new(url)),
        None => Arc::new(LoggingSender),
    }
}
