//! Shared application state handed to every handler.

use crate::{config::Config, db::DbPool};
use axum::extract::FromRef;

/// Database pool plus the loaded configuration.
///
/// Most handlers only need the pool; `FromRef` lets them extract
/// `State<DbPool>` directly while auth handlers pull the full state
/// for session lifetime settings.
#[derive(Clone)]
pub struct AppState {
    pub pool: DbPool,
    pub config: Config,
}

impl FromRef<AppState> for DbPool {
    fn from_ref(state: &AppState) -> Self {
        state.pool.clone()
    }
}

impl FromRef<AppState> for Config {
    fn from_ref(state: &AppState) -> Self {
        state.config.clone()
    }
}
