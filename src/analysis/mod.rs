//! The AI endpoints: photo → foods, foods → nutrient totals, foods → meal name.

mod dto;
pub mod handlers;
mod services;
mod spool;

use crate::state::AppState;
use axum::Router;

pub fn router(upload_body_limit: usize) -> Router<AppState> {
    handlers::routes(upload_body_limit)
}
