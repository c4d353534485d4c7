//! Lead routes: aging list, stage changes, event notifications.

use axum::extract::{Path, State};
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::info;

use automation::EmailKind;
use database::lead;
use database::models::{Lead, Stage};

use crate::error::{ApiError, Result};
use crate::state::AppState;

/// Request to take in a new lead.
#[derive(Deserialize)]
pub struct IntakeRequest {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
}

/// Result of lead intake.
#[derive(Serialize)]
pub struct IntakeResponse {
    pub lead_id: String,
}

/// Take in a new lead: persist it, enroll it in automation, send the
/// welcome email.
pub async fn intake_api(
    State(state): State<AppState>,
    Json(req): Json<IntakeRequest>,
) -> Result<Json<IntakeResponse>> {
    let now = Utc::now();
    let lead_row = Lead {
        id: uuid::Uuid::new_v4().to_string(),
        name: req.name,
        email: req.email,
        phone: req.phone,
        stage: Stage::Lead,
        aging_days: 0,
        aging_paused: None,
        last_contact_date: now,
        is_active: true,
        is_archived: false,
        created_at: now,
        updated_at: now,
    };

    automation::service::intake_lead(state.db.pool(), state.sender.as_ref(), &lead_row, now)
        .await?;

    info!(lead_id = %lead_row.id, "Lead intake complete");
    Ok(Json(IntakeResponse {
        lead_id: lead_row.id,
    }))
}

/// Aging leads as JSON.
pub async fn aging_api(State(state): State<AppState>) -> Result<Json<Vec<Lead>>> {
    let pool = state.db.pool();
    lead::refresh_aging(pool, Utc::now()).await?;
    let leads = lead::list_aging(pool).await?;
    Ok(Json(leads))
}

/// Request to move a lead to a new stage.
#[derive(Deserialize)]
pub struct StageRequest {
    pub stage: Stage,
}

/// Result of a stage change.
#[derive(Serialize)]
pub struct StageResponse {
    pub lead_id: String,
    pub stage: Stage,
}

/// Apply a CRM stage change; automation follows the new stage.
pub async fn stage_api(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<StageRequest>,
) -> Result<Json<StageResponse>> {
    let now = Utc::now();
    automation::service::change_stage(state.db.pool(), &id, req.stage, now).await?;

    info!(lead_id = %id, stage = %req.stage, "Stage changed");
    Ok(Json(StageResponse {
        lead_id: id,
        stage: req.stage,
    }))
}

/// Request to pause or resume aging for a lead.
#[derive(Deserialize)]
pub struct PauseRequest {
    pub paused: bool,
}

/// Pause or resume aging; paused leads drop out of all scheduling.
pub async fn pause_api(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<PauseRequest>,
) -> Result<Json<serde_json::Value>> {
    lead::set_aging_paused(state.db.pool(), &id, req.paused, Utc::now()).await?;
    Ok(Json(serde_json::json!({
        "lead_id": id,
        "paused": req.paused,
    })))
}

/// Record a contact with the lead, resetting its aging counter.
pub async fn contact_api(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>> {
    lead::touch_contact(state.db.pool(), &id, Utc::now()).await?;
    Ok(Json(serde_json::json!({
        "lead_id": id,
        "aging_days": 0,
    })))
}

/// Request to send an event notification to a lead.
#[derive(Deserialize)]
pub struct NotifyRequest {
    /// Template key: welcome, document_added, payment_due, status_update,
    /// ticket_update.
    pub kind: String,
    /// Event-specific line (document name, amount, ticket reference).
    #[serde(default)]
    pub detail: String,
}

/// Result of an event notification.
#[derive(Serialize)]
pub struct NotifyResponse {
    pub lead_id: String,
    pub kind: String,
    pub sent: bool,
}

/// Send an event-driven notification email to a lead.
pub async fn notify_api(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<NotifyRequest>,
) -> Result<Json<NotifyResponse>> {
    let kind: EmailKind = req
        .kind
        .parse()
        .map_err(ApiError::BadRequest)?;

    // Scheduled kinds are owned by the cycle, not this endpoint
    if matches!(
        kind,
        EmailKind::FollowUp | EmailKind::AgingAlert | EmailKind::AdminStageAlert
    ) {
        return Err(ApiError::BadRequest(format!(
            "'{}' is sent by the automation cycle",
            req.kind
        )));
    }

    let sent = automation::service::notify_event(
        state.db.pool(),
        state.sender.as_ref(),
        &id,
        kind,
        &req.detail,
        Utc::now(),
    )
    .await?;

    Ok(Json(NotifyResponse {
        lead_id: id,
        kind: req.kind,
        sent,
    }))
}
