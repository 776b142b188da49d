#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    DynamoDb,
    Memory,
}

impl std::str::FromStr for StorageBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "dynamodb" => Ok(Self::DynamoDb),
            "memory" => Ok(Self::Memory),
            other => anyhow::bail!("unknown STORAGE_BACKEND {:?}", other),
        }
    }
}

#[derive(Debug, Clone)]
pub struct DynamoConfig {
    pub region: String,
    pub endpoint: Option<String>,
    pub access_key: Option<String>,
    pub secret_key: Option<String>,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub user_table: String,
    pub sensor_table: String,
    pub backend: StorageBackend,
    pub dynamo: DynamoConfig,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let backend = std::env::var("STORAGE_BACKEND")
            .ok()
            .map(|v| v.parse::<StorageBackend>())
            .transpose()?
            .unwrap_or(StorageBackend::DynamoDb);

        let dynamo = DynamoConfig {
            region: std::env::var("AWS_REGION").unwrap_or_else(|_| "us-east-1".into()),
            endpoint: non_empty_var("DYNAMODB_ENDPOINT"),
            access_key: non_empty_var("AWS_ACCESS_KEY_ID"),
            secret_key: non_empty_var("AWS_SECRET_ACCESS_KEY"),
        };

        Ok(Self {
            user_table: non_empty_var("USER_TABLE_NAME").unwrap_or_else(|| "UserTable".into()),
            sensor_table: non_empty_var("SENSOR_TABLE_NAME")
                .unwrap_or_else(|| "SensorDataTable".into()),
            backend,
            dynamo,
        })
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_backend_names() {
        assert_eq!("dynamodb".parse::<StorageBackend>().unwrap(), StorageBackend::DynamoDb);
        assert_eq!(" Memory ".parse::<StorageBackend>().unwrap(), StorageBackend::Memory);
        assert!("postgres".parse::<StorageBackend>().is_err());
    }
}
