//! Automation trigger and status routes.

use axum::extract::{Path, State};
use axum::Json;
use chrono::Utc;
use serde::Serialize;
use tracing::info;

use automation::CycleSummary;
use database::models::{AutomationRecord, EmailHistoryEntry, StageSchedule};
use database::{automation as automation_db, history};

use crate::error::Result;
use crate::state::AppState;

/// Response for the cycle trigger: a human-readable message plus the
/// summary the scheduled job logs.
#[derive(Serialize)]
pub struct RunResponse {
    pub message: String,
    pub details: CycleSummary,
}

/// Response for the aging-report trigger.
#[derive(Serialize)]
pub struct AgingReportResponse {
    pub message: String,
    pub aging_leads: usize,
}

/// Automation state for one lead.
#[derive(Serialize)]
pub struct StatusResponse {
    pub record: AutomationRecord,
    pub schedules: Vec<StageSchedule>,
    pub history: Vec<EmailHistoryEntry>,
}

/// Run one automation cycle now.
pub async fn run_api(State(state): State<AppState>) -> Result<Json<RunResponse>> {
    let now = Utc::now();
    info!("Automation cycle triggered via API");

    let details = automation::run_cycle(
        state.db.pool(),
        state.sender.as_ref(),
        &state.admin_email,
        now,
    )
    .await?;

    let message = format!(
        "Processed {} lead(s): {} email(s), {} admin alert(s), {} failure(s)",
        details.leads_processed,
        details.emails_sent,
        details.admin_alerts_sent,
        details.failures
    );

    Ok(Json(RunResponse { message, details }))
}

/// Send the aging report to the admin inbox.
pub async fn aging_report_api(State(state): State<AppState>) -> Result<Json<AgingReportResponse>> {
    let now = Utc::now();

    let aging_leads = automation::service::send_aging_report(
        state.db.pool(),
        state.sender.as_ref(),
        &state.admin_email,
        now,
    )
    .await?;

    let message = if aging_leads == 0 {
        "No aging leads; report skipped".to_string()
    } else {
        format!("Aging report sent covering {} lead(s)", aging_leads)
    };

    Ok(Json(AgingReportResponse {
        message,
        aging_leads,
    }))
}

/// Inspect a lead's automation record, schedules, and recent history.
pub async fn status_api(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<StatusResponse>> {
    let pool = state.db.pool();

    let record = automation_db::get_record(pool, &id).await?;
    let schedules = automation_db::schedules_for_lead(pool, &id).await?;
    let history = history::for_lead(pool, &id, 20).await?;

    Ok(Json(StatusResponse {
        record,
        schedules,
        history,
    }))
}
