use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;

use super::{Item, KeyValueStore, UpdateExpression, ID_FIELD};

/// In-process table with DynamoDB-like semantics: `update` upserts and
/// `delete` of a missing key succeeds.
#[derive(Default)]
pub struct MemoryStore {
    items: RwLock<HashMap<String, Item>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, id: &str) -> anyhow::Result<Option<Item>> {
        Ok(self.items.read().await.get(id).cloned())
    }

    async fn scan(&self) -> anyhow::Result<Vec<Item>> {
        Ok(self.items.read().await.values().cloned().collect())
    }

    async fn put(&self, item: Item) -> anyhow::Result<()> {
        let id = item
            .get(ID_FIELD)
            .and_then(Value::as_str)
            .ok_or_else(|| anyhow::anyhow!("item is missing a string {ID_FIELD}"))?
            .to_string();
        self.items.write().await.insert(id, item);
        Ok(())
    }

    async fn update(&self, id: &str, update: &UpdateExpression) -> anyhow::Result<Item> {
        let mut items = self.items.write().await;
        let item = items.entry(id.to_string()).or_insert_with(|| {
            let mut fresh = Item::new();
            fresh.insert(ID_FIELD.to_string(), Value::String(id.to_string()));
            fresh
        });
        for (field, value) in update.assignments() {
            item.insert(field.clone(), value.clone());
        }
        Ok(item.clone())
    }

    async fn delete(&self, id: &str) -> anyhow::Result<()> {
        self.items.write().await.remove(id);
        Ok(())
    }
}
