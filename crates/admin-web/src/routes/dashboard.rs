//! Dashboard routes.

use askama::Template;
use axum::extract::State;
use axum::Json;
use chrono::Utc;
use serde::Serialize;

use database::models::Lead;
use database::{automation as automation_db, history, lead};

use crate::error::Result;
use crate::state::AppState;

/// Dashboard page template.
#[derive(Template)]
#[template(path = "dashboard.html")]
pub struct DashboardTemplate {
    pub stats: Stats,
    pub aging: Vec<Lead>,
}

/// Dashboard statistics.
#[derive(Clone, Serialize)]
pub struct Stats {
    pub lead_count: i64,
    pub active_automation_count: i64,
    pub aging_count: i64,
    pub recent_failure_count: i64,
    pub stages: Vec<StageStats>,
}

/// Lead count for a single pipeline stage.
#[derive(Clone, Serialize)]
pub struct StageStats {
    pub stage: String,
    pub lead_count: i64,
}

/// Render the dashboard page.
pub async fn dashboard_page(State(state): State<AppState>) -> Result<DashboardTemplate> {
    let pool = state.db.pool();
    lead::refresh_aging(pool, Utc::now()).await?;

    let stats = get_stats(&state).await?;
    let aging = lead::list_aging(pool).await?;
    Ok(DashboardTemplate { stats, aging })
}

/// Get dashboard statistics as JSON.
pub async fn stats_api(State(state): State<AppState>) -> Result<Json<Stats>> {
    let stats = get_stats(&state).await?;
    Ok(Json(stats))
}

/// Fetch statistics from the database.
async fn get_stats(state: &AppState) -> Result<Stats> {
    let pool = state.db.pool();

    let by_stage = lead::count_by_stage(pool).await?;
    let active_automation_count = automation_db::count_active(pool).await?;
    let aging_count = lead::list_aging(pool).await?.len() as i64;
    let recent_failure_count = history::recent_failures(pool, 20).await?.len() as i64;

    let lead_count: i64 = by_stage.iter().map(|(_, c)| *c).sum();
    let stages = by_stage
        .into_iter()
        .map(|(stage, count)| StageStats {
            stage: stage.to_string(),
            lead_count: count,
        })
        .collect();

    Ok(Stats {
        lead_count,
        active_automation_count,
        aging_count,
        recent_failure_count,
        stages,
    })
}
