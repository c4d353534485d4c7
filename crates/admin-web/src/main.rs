//! Admin web surface for Renovo lead automation.
//!
//! Exposes the cycle trigger, aging queries, and a small dashboard.

mod config;
mod error;
mod routes;
mod state;

use std::sync::Arc;

use database::Database;
use mailer::{EmailSender, LoggingSender, WebhookSender};
use tower_http::services::ServeDir;
use tracing::info;

use crate::config::Config;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt::init();

    // Load configuration; missing required settings abort the run here
    let config = Config::from_env()?;
    info!(addr = %config.addr, "Starting admin web server");

    // Connect to database
    let db = Database::connect(&config.database_url).await?;
    db.migrate().await?;

    // Pick the delivery collaborator
    let sender: Arc<dyn EmailSender> = match &config.mail_webhook_url {
        Some(url) => {
            info!(endpoint = %url, "Using webhook delivery provider");
            Arc::new(WebhookSender::new(url.clone()))
        }
        None => {
            info!("No delivery provider configured; sends are dry-run");
            Arc::new(LoggingSender)
        }
    };

    // Build application state
    let state = AppState::new(db, sender, config.admin_email.clone());

    // Build router
    let app = routes::router()
        .nest_service("/static", ServeDir::new("static"))
        .with_state(state);

    // Start server
    info!(addr = %config.addr, "Admin web server listening");
    let listener = tokio::net::TcpListener::bind(config.addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
