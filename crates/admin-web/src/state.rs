//! Application state shared across handlers.

use std::sync::Arc;

use database::Database;
use mailer::EmailSender;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Database connection.
    pub db: Database,
    /// Email delivery collaborator.
    pub sender: Arc<dyn EmailSender>,
    /// Recipient for admin notifications.
    pub admin_email: String,
}

impl AppState {
    /// Create new application state.
    pub fn new(db: Database, sender: Arc<dyn EmailSender>, admin_email: String) -> Self {
        Self {
            db,
            sender,
            admin_email,
        }
    }
}
