//! Route handlers for the admin web surface.

pub mod automation_routes;
pub mod dashboard;
pub mod health;
pub mod leads;

use axum::routing::{get, post};
use axum::Router;

use crate::state::AppState;

/// Build the router with all routes.
pub fn router() -> Router<AppState> {
    Router::new()
        // HTML pages
        .route("/", get(dashboard::dashboard_page))
        // Health check
        .route("/health", get(health::health))
        // API endpoints
        .route("/api/stats", get(dashboard::stats_api))
        .route("/api/leads", post(leads::intake_api))
        .route("/api/leads/aging", get(leads::aging_api))
        .route("/api/leads/:id/stage", post(leads::stage_api))
        .route("/api/leads/:id/pause", post(leads::pause_api))
        .route("/api/leads/:id/contact", post(leads::contact_api))
        .route("/api/leads/:id/notify", post(leads::notify_api))
        .route("/api/automation/run", post(automation_routes::run_api))
        .route(
            "/api/automation/aging-report",
            post(automation_routes::aging_report_api),
        )
        .route("/api/automation/:id", get(automation_routes::status_api))
}
