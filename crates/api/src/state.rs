use std::sync::Arc;

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// Cheaply cloneable: the pool is reference-counted and the config is behind `Arc`.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub pool: tessera_db::DbPool,
    /// Server configuration (JWT secret, import limits, containment policy).
    pub config: Arc<ServerConfig>,
}
