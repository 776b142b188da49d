use crate::config::{AppConfig, StorageBackend};
use crate::storage::{DynamoStore, KeyValueStore, MemoryStore};
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Clone)]
pub struct AppState {
    pub users: Arc<dyn KeyValueStore>,
    pub sensors: Arc<dyn KeyValueStore>,
}

impl AppState {
    pub async fn init() -> anyhow::Result<Self> {
        let config = AppConfig::from_env()?;

        let state = match config.backend {
            StorageBackend::DynamoDb => {
                // One SDK client shared by both tables
                let client = DynamoStore::client(&config.dynamo).await;
                Self::from_parts(
                    Arc::new(DynamoStore::new(client.clone(), &config.user_table)),
                    Arc::new(DynamoStore::new(client, &config.sensor_table)),
                )
            }
            StorageBackend::Memory => {
                warn!("using in-memory storage; data is lost on restart");
                Self::memory()
            }
        };

        info!(
            backend = ?config.backend,
            user_table = %config.user_table,
            sensor_table = %config.sensor_table,
            endpoint = ?config.dynamo.endpoint,
            "storage ready"
        );
        Ok(state)
    }

    pub fn from_parts(users: Arc<dyn KeyValueStore>, sensors: Arc<dyn KeyValueStore>) -> Self {
        Self { users, sensors }
    }

    pub fn memory() -> Self {
        Self::from_parts(Arc::new(MemoryStore::new()), Arc::new(MemoryStore::new()))
    }
}
