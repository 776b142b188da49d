use crate::state::AppState;
use axum::Router;

mod dto;
pub mod handlers;
mod repo_types;
pub mod services;

pub fn router() -> Router<AppState> {
    handlers::sensor_routes()
}
