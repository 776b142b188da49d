use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::storage::lenient;

/// Sensor reading as stored in the sensor table. Reads tolerate older items,
/// e.g. a `sensorValue` stored as a string or a float `timestamp`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SensorRecord {
    pub id: String,
    #[serde(default, deserialize_with = "lenient::string", skip_serializing_if = "Option::is_none")]
    pub sensor_name: Option<String>,
    #[serde(default, deserialize_with = "lenient::value", skip_serializing_if = "Option::is_none")]
    pub sensor_value: Option<Value>,
    #[serde(default, deserialize_with = "lenient::millis", skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<i64>, // epoch millis, set once at creation
}
