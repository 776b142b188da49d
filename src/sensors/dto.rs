use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};
use time::{macros::format_description, OffsetDateTime};

use crate::sensors::repo_types::SensorRecord;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SensorInput {
    pub sensor_name: Option<String>,
    pub sensor_value: Option<Number>,
}

/// A reading as returned to callers: `timestamp` replaced by `receiveAt`.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SensorOutput {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sensor_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sensor_value: Option<Value>,
    pub receive_at: Option<String>,
}

impl From<SensorRecord> for SensorOutput {
    fn from(r: SensorRecord) -> Self {
        Self {
            id: r.id,
            sensor_name: r.sensor_name,
            sensor_value: r.sensor_value,
            receive_at: r.timestamp.and_then(receive_at),
        }
    }
}

/// Epoch milliseconds as `YYYY-MM-DDTHH:MM:SS.mmmZ`, or `None` when out of range.
pub fn receive_at(timestamp_ms: i64) -> Option<String> {
    let nanos = i128::from(timestamp_ms) * 1_000_000;
    let at = OffsetDateTime::from_unix_timestamp_nanos(nanos).ok()?;
    at.format(format_description!(
        "[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond digits:3]Z"
    ))
    .ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn formats_epoch_millis_like_iso_strings() {
        assert_eq!(receive_at(0).as_deref(), Some("1970-01-01T00:00:00.000Z"));
        assert_eq!(
            receive_at(1_714_564_800_123).as_deref(),
            Some("2024-05-01T12:00:00.123Z")
        );
    }

    #[test]
    fn out_of_range_timestamp_is_none() {
        assert_eq!(receive_at(i64::MAX), None);
    }

    #[test]
    fn output_drops_timestamp_and_derives_receive_at() {
        let record = SensorRecord {
            id: "r1".into(),
            sensor_name: Some("temp1".into()),
            sensor_value: Some(json!(0)),
            timestamp: Some(0),
        };
        let out = serde_json::to_value(SensorOutput::from(record)).unwrap();
        assert_eq!(
            out,
            json!({
                "id": "r1",
                "sensorName": "temp1",
                "sensorValue": 0,
                "receiveAt": "1970-01-01T00:00:00.000Z"
            })
        );
    }

    #[test]
    fn missing_timestamp_renders_null() {
        let record = SensorRecord {
            id: "r2".into(),
            sensor_name: None,
            sensor_value: None,
            timestamp: None,
        };
        let out = serde_json::to_value(SensorOutput::from(record)).unwrap();
        assert_eq!(out, json!({"id": "r2", "receiveAt": null}));
    }
}
