use crate::state::AppState;
use axum::Router;

mod dto;
pub mod handlers;
mod password;
mod repo_types;
pub mod services;

pub fn router() -> Router<AppState> {
    handlers::user_routes()
}
