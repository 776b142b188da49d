use axum::{
    extract::{Path, State},
    routing::get,
    Router,
};
use bytes::Bytes;
use tracing::instrument;

use crate::{
    common::{response::method_not_allowed, ApiError, Reply},
    state::AppState,
    users::services,
};

pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/users",
            get(list_users)
                .post(create_user)
                .put(update_without_id)
                .delete(delete_without_id)
                .fallback(method_not_allowed),
        )
        .route(
            "/users/:id",
            get(get_user)
                .put(update_user)
                .delete(delete_user)
                .fallback(method_not_allowed),
        )
}

#[instrument(skip(state))]
pub async fn list_users(State(state): State<AppState>) -> Result<Reply, ApiError> {
    services::get_users(state.users.as_ref(), None).await
}

#[instrument(skip(state))]
pub async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Reply, ApiError> {
    services::get_users(state.users.as_ref(), Some(id.as_str())).await
}

#[instrument(skip(state, body))]
pub async fn create_user(State(state): State<AppState>, body: Bytes) -> Result<Reply, ApiError> {
    services::create_user(state.users.as_ref(), Some(&body[..])).await
}

#[instrument(skip(state, body))]
pub async fn update_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Bytes,
) -> Result<Reply, ApiError> {
    services::update_user(state.users.as_ref(), Some(id.as_str()), Some(&body[..])).await
}

#[instrument(skip(state, body))]
pub async fn update_without_id(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Reply, ApiError> {
    services::update_user(state.users.as_ref(), None, Some(&body[..])).await
}

#[instrument(skip(state))]
pub async fn delete_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Reply, ApiError> {
    services::delete_user(state.users.as_ref(), Some(id.as_str())).await
}

#[instrument(skip(state))]
pub async fn delete_without_id(State(state): State<AppState>) -> Result<Reply, ApiError> {
    services::delete_user(state.users.as_ref(), None).await
}
