//! Application state shared across handlers.

use crate::auth::AuthService;
use crate::config::Config;
use crate::db::Database;
use crate::library::LibraryService;
use std::sync::Arc;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration.
    pub config: Arc<Config>,
    /// Authentication service.
    pub auth: Arc<AuthService>,
    /// Library queries and mutations.
    pub library: Arc<LibraryService>,
}

impl AppState {
    /// Create new application state.
    pub fn new(config: Config, db: Database, auth: AuthService) -> Self {
        Self {
            config: Arc::new(config),
            auth: Arc::new(auth),
            library: Arc::new(LibraryService::new(db)),
        }
    }
}
