use axum::{
    extract::{Path, State},
    routing::get,
    Router,
};
use bytes::Bytes;
use tracing::instrument;

use crate::{
    common::{response::method_not_allowed, ApiError, Reply},
    sensors::services,
    state::AppState,
};

pub fn sensor_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/sensor-data",
            get(list_sensor_data)
                .post(create_sensor_data)
                .put(update_without_id)
                .delete(delete_without_id)
                .fallback(method_not_allowed),
        )
        .route(
            "/sensor-data/:id",
            get(get_sensor_data)
                .put(update_sensor_data)
                .delete(delete_sensor_data)
                .fallback(method_not_allowed),
        )
}

#[instrument(skip(state))]
pub async fn list_sensor_data(State(state): State<AppState>) -> Result<Reply, ApiError> {
    services::get_sensor_data(state.sensors.as_ref(), None).await
}

#[instrument(skip(state))]
pub async fn get_sensor_data(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Reply, ApiError> {
    services::get_sensor_data(state.sensors.as_ref(), Some(id.as_str())).await
}

#[instrument(skip(state, body))]
pub async fn create_sensor_data(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Reply, ApiError> {
    services::create_sensor_data(state.sensors.as_ref(), Some(&body[..])).await
}

#[instrument(skip(state, body))]
pub async fn update_sensor_data(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Bytes,
) -> Result<Reply, ApiError> {
    services::update_sensor_data(state.sensors.as_ref(), Some(id.as_str()), Some(&body[..])).await
}

#[instrument(skip(state, body))]
pub async fn update_without_id(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Reply, ApiError> {
    services::update_sensor_data(state.sensors.as_ref(), None, Some(&body[..])).await
}

#[instrument(skip(state))]
pub async fn delete_sensor_data(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Reply, ApiError> {
    services::delete_sensor_data(state.sensors.as_ref(), Some(id.as_str())).await
}

#[instrument(skip(state))]
pub async fn delete_without_id(State(state): State<AppState>) -> Result<Reply, ApiError> {
    services::delete_sensor_data(state.sensors.as_ref(), None).await
}
