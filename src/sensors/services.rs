use axum::http::StatusCode;
use serde_json::Value;
use time::OffsetDateTime;
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    common::{parse_body, validate::supplied, ApiError, Reply, WithData},
    sensors::{
        dto::{SensorInput, SensorOutput},
        repo_types::SensorRecord,
    },
    storage::{from_item, to_item, KeyValueStore, UpdateExpression},
};

const RESOURCE: &str = "Sensor data";

fn now_millis() -> i64 {
    i64::try_from(OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000).unwrap_or(i64::MAX)
}

pub async fn create_sensor_data(
    store: &dyn KeyValueStore,
    body: Option<&[u8]>,
) -> Result<Reply, ApiError> {
    let input: SensorInput =
        parse_body(body).ok_or(ApiError::Validation("Invalid or missing body"))?;

    let (Some(sensor_name), Some(sensor_value)) = (supplied(input.sensor_name), input.sensor_value)
    else {
        warn!("create sensor data: missing required fields");
        return Err(ApiError::Validation("Missing required fields"));
    };

    let record = SensorRecord {
        id: Uuid::new_v4().to_string(),
        sensor_name: Some(sensor_name),
        sensor_value: Some(Value::Number(sensor_value)),
        timestamp: Some(now_millis()),
    };
    let item = to_item(&record).map_err(ApiError::storage("Error creating sensor data"))?;
    store
        .put(item)
        .await
        .map_err(ApiError::storage("Error creating sensor data"))?;

    info!(sensor_id = %record.id, "sensor data created");
    Reply::ok(&WithData {
        message: "Sensor data created successfully",
        data: SensorOutput::from(record),
    })
}

/// Returns one reading when `id` is given, otherwise every reading in scan order.
pub async fn get_sensor_data(
    store: &dyn KeyValueStore,
    id: Option<&str>,
) -> Result<Reply, ApiError> {
    if let Some(id) = id.filter(|id| !id.is_empty()) {
        let item = store
            .get(id)
            .await
            .map_err(ApiError::storage("Error getting sensor data"))?
            .ok_or(ApiError::NotFound(RESOURCE))?;
        let record: SensorRecord =
            from_item(item).map_err(ApiError::storage("Error getting sensor data"))?;
        return Reply::ok(&SensorOutput::from(record));
    }

    let readings = store
        .scan()
        .await
        .map_err(ApiError::storage("Error getting sensor data"))?
        .into_iter()
        .map(|item| from_item::<SensorRecord>(item).map(SensorOutput::from))
        .collect::<anyhow::Result<Vec<_>>>()
        .map_err(ApiError::storage("Error getting sensor data"))?;
    Reply::ok(&readings)
}

/// Partial patch of name and value; the creation timestamp is left as stored.
pub async fn update_sensor_data(
    store: &dyn KeyValueStore,
    id: Option<&str>,
    body: Option<&[u8]>,
) -> Result<Reply, ApiError> {
    let id = id
        .filter(|id| !id.is_empty())
        .ok_or(ApiError::Validation("Missing id"))?;
    let input: SensorInput =
        parse_body(body).ok_or(ApiError::Validation("Invalid or missing body"))?;

    let update = UpdateExpression::new()
        .set("sensorName", supplied(input.sensor_name))
        .set("sensorValue", input.sensor_value);
    if update.is_empty() {
        warn!(sensor_id = %id, "update sensor data: nothing to update");
        return Err(ApiError::Validation("No fields to update"));
    }

    let item = store
        .update(id, &update)
        .await
        .map_err(ApiError::storage("Error updating sensor data"))?;
    let record: SensorRecord =
        from_item(item).map_err(ApiError::storage("Error updating sensor data"))?;

    info!(sensor_id = %id, "sensor data updated");
    Reply::ok(&WithData {
        message: "Sensor data updated successfully",
        data: SensorOutput::from(record),
    })
}

pub async fn delete_sensor_data(
    store: &dyn KeyValueStore,
    id: Option<&str>,
) -> Result<Reply, ApiError> {
    let id = id
        .filter(|id| !id.is_empty())
        .ok_or(ApiError::Validation("Missing id"))?;
    store
        .delete(id)
        .await
        .map_err(ApiError::storage("Error deleting sensor data"))?;

    info!(sensor_id = %id, "sensor data deleted");
    Ok(Reply::message(StatusCode::OK, "Sensor data deleted successfully"))
}
