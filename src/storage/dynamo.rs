use std::collections::HashMap;

use anyhow::Context;
use async_trait::async_trait;
use aws_config::{defaults, BehaviorVersion};
use aws_credential_types::Credentials;
use aws_sdk_dynamodb::{
    config::{Builder as DynamoConfigBuilder, Region},
    types::{AttributeValue, ReturnValue},
    Client,
};
use serde_json::{Number, Value};
use tracing::{debug, warn};

use super::{Item, KeyValueStore, UpdateExpression, ID_FIELD};
use crate::config::DynamoConfig;

/// One DynamoDB table whose partition key is the string attribute `id`.
#[derive(Clone)]
pub struct DynamoStore {
    client: Client,
    table: String,
}

impl DynamoStore {
    /// Builds the SDK client once; share it between tables with [`DynamoStore::new`].
    pub async fn client(cfg: &DynamoConfig) -> Client {
        let mut loader = defaults(BehaviorVersion::latest()).region(Region::new(cfg.region.clone()));
        if let (Some(access_key), Some(secret_key)) = (&cfg.access_key, &cfg.secret_key) {
            loader = loader.credentials_provider(Credentials::new(
                access_key, secret_key, None, None, "static",
            ));
        }
        let shared = loader.load().await;

        let mut conf = DynamoConfigBuilder::from(&shared);
        if let Some(endpoint) = &cfg.endpoint {
            conf = conf.endpoint_url(endpoint);
        }
        Client::from_conf(conf.build())
    }

    pub fn new(client: Client, table: impl Into<String>) -> Self {
        Self {
            client,
            table: table.into(),
        }
    }

    fn key(id: &str) -> AttributeValue {
        AttributeValue::S(id.to_string())
    }
}

#[async_trait]
impl KeyValueStore for DynamoStore {
    async fn get(&self, id: &str) -> anyhow::Result<Option<Item>> {
        let out = self
            .client
            .get_item()
            .table_name(&self.table)
            .key(ID_FIELD, Self::key(id))
            .send()
            .await
            .with_context(|| format!("dynamodb get_item {}", self.table))?;
        Ok(out.item.as_ref().map(from_attributes))
    }

    async fn scan(&self) -> anyhow::Result<Vec<Item>> {
        let mut items = Vec::new();
        let mut start_key = None;
        loop {
            let out = self
                .client
                .scan()
                .table_name(&self.table)
                .set_exclusive_start_key(start_key.take())
                .send()
                .await
                .with_context(|| format!("dynamodb scan {}", self.table))?;

            items.extend(out.items.unwrap_or_default().iter().map(from_attributes));
            match out.last_evaluated_key {
                Some(key) if !key.is_empty() => start_key = Some(key),
                _ => break,
            }
        }
        debug!(table = %self.table, count = items.len(), "scan complete");
        Ok(items)
    }

    async fn put(&self, item: Item) -> anyhow::Result<()> {
        anyhow::ensure!(
            item.get(ID_FIELD).is_some_and(Value::is_string),
            "item is missing a string {ID_FIELD}"
        );
        self.client
            .put_item()
            .table_name(&self.table)
            .set_item(Some(to_attributes(&item)))
            .send()
            .await
            .with_context(|| format!("dynamodb put_item {}", self.table))?;
        Ok(())
    }

    async fn update(&self, id: &str, update: &UpdateExpression) -> anyhow::Result<Item> {
        anyhow::ensure!(!update.is_empty(), "update has no assignments");

        let mut names = HashMap::new();
        let mut values = HashMap::new();
        for (field, value) in update.assignments() {
            names.insert(format!("#{field}"), field.clone());
            values.insert(format!(":{field}"), to_attribute(value));
        }

        let out = self
            .client
            .update_item()
            .table_name(&self.table)
            .key(ID_FIELD, Self::key(id))
            .update_expression(update.expression())
            .set_expression_attribute_names(Some(names))
            .set_expression_attribute_values(Some(values))
            .return_values(ReturnValue::AllNew)
            .send()
            .await
            .with_context(|| format!("dynamodb update_item {}", self.table))?;
        Ok(out.attributes.as_ref().map(from_attributes).unwrap_or_default())
    }

    async fn delete(&self, id: &str) -> anyhow::Result<()> {
        self.client
            .delete_item()
            .table_name(&self.table)
            .key(ID_FIELD, Self::key(id))
            .send()
            .await
            .with_context(|| format!("dynamodb delete_item {}", self.table))?;
        Ok(())
    }
}

fn to_attributes(item: &Item) -> HashMap<String, AttributeValue> {
    item.iter()
        .map(|(k, v)| (k.clone(), to_attribute(v)))
        .collect()
}

fn to_attribute(value: &Value) -> AttributeValue {
    match value {
        Value::Null => AttributeValue::Null(true),
        Value::Bool(b) => AttributeValue::Bool(*b),
        Value::Number(n) => AttributeValue::N(n.to_string()),
        Value::String(s) => AttributeValue::S(s.clone()),
        Value::Array(values) => AttributeValue::L(values.iter().map(to_attribute).collect()),
        Value::Object(map) => AttributeValue::M(to_attributes(map)),
    }
}

fn from_attributes(attrs: &HashMap<String, AttributeValue>) -> Item {
    attrs
        .iter()
        .map(|(k, v)| (k.clone(), from_attribute(v)))
        .collect()
}

fn from_attribute(attr: &AttributeValue) -> Value {
    match attr {
        AttributeValue::S(s) => Value::String(s.clone()),
        AttributeValue::N(n) => number(n),
        AttributeValue::Bool(b) => Value::Bool(*b),
        AttributeValue::Null(_) => Value::Null,
        AttributeValue::L(values) => Value::Array(values.iter().map(from_attribute).collect()),
        AttributeValue::M(map) => Value::Object(from_attributes(map)),
        AttributeValue::Ss(values) => values.iter().cloned().map(Value::String).collect(),
        AttributeValue::Ns(values) => values.iter().map(|n| number(n)).collect(),
        other => {
            warn!(attribute = ?other, "unsupported attribute type, reading as null");
            Value::Null
        }
    }
}

// DynamoDB numbers travel as decimal strings.
fn number(n: &str) -> Value {
    serde_json::from_str::<Number>(n)
        .map(Value::Number)
        .unwrap_or_else(|_| Value::String(n.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn numbers_keep_their_representation() {
        assert_eq!(to_attribute(&json!(0)), AttributeValue::N("0".into()));
        assert_eq!(to_attribute(&json!(21.5)), AttributeValue::N("21.5".into()));
        assert_eq!(from_attribute(&AttributeValue::N("1700000000000".into())), json!(1_700_000_000_000_i64));
        assert_eq!(from_attribute(&AttributeValue::N("-3.25".into())), json!(-3.25));
    }

    #[test]
    fn item_marshals_to_attribute_map_and_back() {
        let item = json!({
            "id": "abc",
            "sensorName": "temp1",
            "sensorValue": 22,
            "tags": ["a", "b"],
            "meta": {"ok": true, "note": null}
        })
        .as_object()
        .cloned()
        .unwrap();

        let attrs = to_attributes(&item);
        assert_eq!(attrs["id"], AttributeValue::S("abc".into()));
        assert_eq!(attrs["sensorValue"], AttributeValue::N("22".into()));
        assert_eq!(from_attributes(&attrs), item);
    }

    #[test]
    fn string_sets_read_as_arrays() {
        let attr = AttributeValue::Ss(vec!["x".into(), "y".into()]);
        assert_eq!(from_attribute(&attr), json!(["x", "y"]));
    }
}
