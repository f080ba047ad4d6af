//! Per-user meal history: saved analyses plus an optional photo each.

mod dto;
pub mod handlers;
mod repo;
mod services;

use axum::Router;

use crate::state::AppState;

/// All `/api/meals` routes. `upload_body_limit` caps photo upload bodies.
pub fn router(upload_body_limit: usize) -> Router<AppState> {
    handlers::read_routes().merge(handlers::write_routes(upload_body_limit))
}
