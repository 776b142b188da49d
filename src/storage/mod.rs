use anyhow::Context;
use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::{Map, Value};

mod dynamo;
mod memory;

pub use dynamo::DynamoStore;
pub use memory::MemoryStore;

/// A stored record: a flat JSON object keyed by attribute name.
pub type Item = Map<String, Value>;

/// Name of the partition key attribute in every table.
pub const ID_FIELD: &str = "id";

/// One logical table in a key-value store.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, id: &str) -> anyhow::Result<Option<Item>>;
    async fn scan(&self) -> anyhow::Result<Vec<Item>>;
    /// Insert or replace the item under its `id` attribute.
    async fn put(&self, item: Item) -> anyhow::Result<()>;
    /// Apply the assignments and return the item as it is after the update.
    async fn update(&self, id: &str, update: &UpdateExpression) -> anyhow::Result<Item>;
    async fn delete(&self, id: &str) -> anyhow::Result<()>;
}

/// Converts a record into the attribute map the store persists.
pub fn to_item<T: Serialize>(record: &T) -> anyhow::Result<Item> {
    match serde_json::to_value(record).context("serialize record")? {
        Value::Object(item) => Ok(item),
        other => anyhow::bail!("record serialized to a non-object: {other}"),
    }
}

pub fn from_item<T: DeserializeOwned>(item: Item) -> anyhow::Result<T> {
    serde_json::from_value(Value::Object(item)).context("decode stored item")
}

/// Field deserializers for stored records that were written with an unexpected
/// type. A bad field reads as absent instead of failing the whole record.
pub mod lenient {
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;

    pub fn string<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
        Ok(match Value::deserialize(d)? {
            Value::String(s) => Some(s),
            _ => None,
        })
    }

    /// Epoch millis stored as an integer or a float (truncated).
    pub fn millis<'de, D: Deserializer<'de>>(d: D) -> Result<Option<i64>, D::Error> {
        let value = Value::deserialize(d)?;
        Ok(value.as_i64().or_else(|| {
            value
                .as_f64()
                .filter(|f| f.is_finite())
                .map(|f| f.trunc() as i64)
        }))
    }

    /// Any non-null value, kept as stored.
    pub fn value<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Value>, D::Error> {
        Ok(Some(Value::deserialize(d)?).filter(|v| !v.is_null()))
    }
}

/// A list of `SET field = value` assignments for a partial update.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpdateExpression {
    assignments: Vec<(String, Value)>,
}

impl UpdateExpression {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `SET field = value` when a value was supplied.
    pub fn set<V: Into<Value>>(mut self, field: &str, value: Option<V>) -> Self {
        if let Some(v) = value {
            self.assignments.push((field.to_string(), v.into()));
        }
        self
    }

    pub fn is_empty(&self) -> bool {
        self.assignments.is_empty()
    }

    pub fn assignments(&self) -> &[(String, Value)] {
        &self.assignments
    }

    /// Renders `SET #a = :a, #b = :b` with every attribute name aliased.
    pub fn expression(&self) -> String {
        let clauses: Vec<String> = self
            .assignments
            .iter()
            .map(|(field, _)| format!("#{field} = :{field}"))
            .collect();
        format!("SET {}", clauses.join(", "))
    }
}
