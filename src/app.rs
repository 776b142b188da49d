use std::{any::Any, net::SocketAddr};

use axum::{
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use tower_http::{catch_panic::CatchPanicLayer, cors::CorsLayer, trace::TraceLayer};

use crate::common::ApiError;
use crate::state::AppState;
use crate::{sensors, users};

pub fn build_app(state: AppState) -> Router {
    Router::new()
        .merge(users::router())
        .merge(sensors::router())
        .route("/health", get(|| async { "ok" }))
        .with_state(state)
        .layer(CatchPanicLayer::custom(handle_panic))
        .layer(CorsLayer::permissive())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &axum::http::Request<_>| {
                    let method = req.method().clone();
                    let uri = req.uri().clone();
                    tracing::info_span!(
                        "http_request",
                        %method,
                        uri = %uri,
                        status = tracing::field::Empty
                    )
                })
                .on_response(
                    |res: &axum::http::Response<_>,
                     _latency: std::time::Duration,
                     span: &tracing::Span| {
                        let status = res.status();
                        span.record("status", tracing::field::display(status));
                        if status.is_server_error() {
                            tracing::error!(%status, "response");
                        } else {
                            tracing::info!(%status, "response");
                        }
                    },
                ),
        )
}

// Last resort: a panic while serving a request still answers 500 with its message.
fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response {
    let message = if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "Internal Server Error".to_string()
    };
    ApiError::Unexpected(message).into_response()
}

pub async fn serve(app: Router) -> anyhow::Result<()> {
    let addr: SocketAddr = format!(
        "{}:{}",
        std::env::var("APP_HOST").unwrap_or_else(|_| "0.0.0.0".into()),
        std::env::var("APP_PORT").unwrap_or_else(|_| "8080".into())
    )
    .parse()?;

    tracing::info!("listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{Item, KeyValueStore, MemoryStore, UpdateExpression};
    use async_trait::async_trait;
    use axum::{
        body::Body,
        http::{Method, Request, StatusCode},
    };
    use http_body_util::BodyExt;
    use serde_json::{json, Value};
    use std::sync::Arc;
    use tower::ServiceExt;

    struct FailingStore;

    #[async_trait]
    impl KeyValueStore for FailingStore {
        async fn get(&self, _id: &str) -> anyhow::Result<Option<Item>> {
            anyhow::bail!("ResourceNotFoundException: table UserTable does not exist")
        }
        async fn scan(&self) -> anyhow::Result<Vec<Item>> {
            anyhow::bail!("ResourceNotFoundException: table UserTable does not exist")
        }
        async fn put(&self, _item: Item) -> anyhow::Result<()> {
            anyhow::bail!("ProvisionedThroughputExceededException")
        }
        async fn update(&self, _id: &str, _u: &UpdateExpression) -> anyhow::Result<Item> {
            anyhow::bail!("ProvisionedThroughputExceededException")
        }
        async fn delete(&self, _id: &str) -> anyhow::Result<()> {
            anyhow::bail!("ProvisionedThroughputExceededException")
        }
    }

    struct PanickingStore;

    #[async_trait]
    impl KeyValueStore for PanickingStore {
        async fn get(&self, _id: &str) -> anyhow::Result<Option<Item>> {
            panic!("store exploded")
        }
        async fn scan(&self) -> anyhow::Result<Vec<Item>> {
            panic!("store exploded")
        }
        async fn put(&self, _item: Item) -> anyhow::Result<()> {
            panic!("store exploded")
        }
        async fn update(&self, _id: &str, _u: &UpdateExpression) -> anyhow::Result<Item> {
            panic!("store exploded")
        }
        async fn delete(&self, _id: &str) -> anyhow::Result<()> {
            panic!("store exploded")
        }
    }

    fn app() -> Router {
        build_app(AppState::memory())
    }

    async fn call(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let body = body.map(|b| Body::from(b.to_string())).unwrap_or_else(Body::empty);
        let resp = app
            .clone()
            .oneshot(
                Request::builder()
                    .method(method)
                    .uri(uri)
                    .header("content-type", "application/json")
                    .body(body)
                    .unwrap(),
            )
            .await
            .unwrap();
        let status = resp.status();
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, json)
    }

    async fn create_user(app: &Router, username: &str, email: &str) -> String {
        let (status, body) = call(
            app,
            Method::POST,
            "/users",
            Some(json!({"username": username, "email": email, "password": "s3cret-pass"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        body["data"]["id"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn health_is_ok() {
        let resp = app()
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn identical_creates_get_distinct_ids() {
        let app = app();
        let a = create_user(&app, "alice", "alice@example.com").await;
        let b = create_user(&app, "alice", "alice@example.com").await;
        assert!(!a.is_empty());
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn created_user_reads_back_without_password() {
        let app = app();
        let id = create_user(&app, "alice", "alice@example.com").await;

        let (status, body) = call(&app, Method::GET, &format!("/users/{id}"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"id": id, "username": "alice", "email": "alice@example.com"}));
    }

    #[tokio::test]
    async fn password_never_leaves_the_service() {
        let app = app();
        let (_, created) = call(
            &app,
            Method::POST,
            "/users",
            Some(json!({"username": "eve", "email": "eve@example.com", "password": "leak-me"})),
        )
        .await;
        let id = created["data"]["id"].as_str().unwrap().to_string();
        let (_, one) = call(&app, Method::GET, &format!("/users/{id}"), None).await;
        let (_, all) = call(&app, Method::GET, "/users", None).await;
        let (_, updated) = call(
            &app,
            Method::PUT,
            &format!("/users/{id}"),
            Some(json!({"password": "leak-me-too"})),
        )
        .await;

        for body in [created, one, all, updated] {
            let text = body.to_string();
            assert!(!text.contains("password"), "{text}");
            assert!(!text.contains("leak-me"), "{text}");
            assert!(!text.contains("$argon2"), "{text}");
        }
    }

    #[tokio::test]
    async fn partial_update_leaves_other_fields() {
        let app = app();
        let id = create_user(&app, "alice", "alice@example.com").await;

        let (status, body) = call(
            &app,
            Method::PUT,
            &format!("/users/{id}"),
            Some(json!({"email": "alice@new.example.org"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "User updated successfully");

        let (_, fetched) = call(&app, Method::GET, &format!("/users/{id}"), None).await;
        assert_eq!(fetched["username"], "alice");
        assert_eq!(fetched["email"], "alice@new.example.org");
    }

    #[tokio::test]
    async fn unknown_ids_are_404() {
        let app = app();
        let (status, body) = call(&app, Method::GET, "/users/does-not-exist", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body, json!({"message": "User not found"}));

        let (status, body) = call(&app, Method::GET, "/sensor-data/does-not-exist", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body, json!({"message": "Sensor data not found"}));
    }

    #[tokio::test]
    async fn deleted_records_are_gone() {
        let app = app();
        let id = create_user(&app, "bob", "bob@example.com").await;

        let (status, body) = call(&app, Method::DELETE, &format!("/users/{id}"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"message": "User deleted successfully"}));

        let (status, _) = call(&app, Method::GET, &format!("/users/{id}"), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn invalid_email_is_400() {
        let (status, body) = call(
            &app(),
            Method::POST,
            "/users",
            Some(json!({"username": "a", "email": "not-an-email", "password": "pw"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({"message": "Invalid email"}));
    }

    #[tokio::test]
    async fn missing_or_garbled_body_is_400() {
        let app = app();
        let (status, body) = call(&app, Method::POST, "/users", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({"message": "Invalid or missing body"}));

        let resp = app
            .clone()
            .oneshot(
                Request::builder()
                    .method(Method::POST)
                    .uri("/sensor-data")
                    .body(Body::from("{not json"))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn sensor_without_value_is_missing_fields() {
        let (status, body) = call(
            &app(),
            Method::POST,
            "/sensor-data",
            Some(json!({"sensorName": "temp1"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({"message": "Missing required fields"}));
    }

    #[tokio::test]
    async fn sensor_lifecycle() {
        let app = app();
        let (status, created) = call(
            &app,
            Method::POST,
            "/sensor-data",
            Some(json!({"sensorName": "temp1", "sensorValue": 0})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(created["message"], "Sensor data created successfully");
        let id = created["data"]["id"].as_str().unwrap().to_string();

        let (_, list) = call(&app, Method::GET, "/sensor-data", None).await;
        assert_eq!(list.as_array().unwrap().len(), 1);
        assert_eq!(list[0]["sensorValue"], json!(0));
        assert!(list[0].get("timestamp").is_none());
        assert!(list[0]["receiveAt"].is_string());

        let (status, _) = call(
            &app,
            Method::PUT,
            &format!("/sensor-data/{id}"),
            Some(json!({"sensorValue": 12.75})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (_, one) = call(&app, Method::GET, &format!("/sensor-data/{id}"), None).await;
        assert_eq!(one["sensorName"], "temp1");
        assert_eq!(one["sensorValue"], json!(12.75));

        let (status, body) = call(&app, Method::DELETE, &format!("/sensor-data/{id}"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"message": "Sensor data deleted successfully"}));
        let (status, _) = call(&app, Method::GET, &format!("/sensor-data/{id}"), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn empty_collections_are_200() {
        let app = app();
        for uri in ["/users", "/sensor-data"] {
            let (status, body) = call(&app, Method::GET, uri, None).await;
            assert_eq!(status, StatusCode::OK);
            assert_eq!(body, json!([]));
        }
    }

    #[tokio::test]
    async fn update_of_unknown_user_upserts_a_partial_record() {
        let app = app();
        let (status, body) = call(
            &app,
            Method::PUT,
            "/users/never-created",
            Some(json!({"email": "ghost@example.com"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"], json!({"id": "never-created", "email": "ghost@example.com"}));

        let (status, fetched) = call(&app, Method::GET, "/users/never-created", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(fetched, json!({"id": "never-created", "email": "ghost@example.com"}));
    }

    #[tokio::test]
    async fn unsupported_methods_are_405() {
        let app = app();
        for (method, uri) in [
            (Method::PATCH, "/users"),
            (Method::PATCH, "/users/abc"),
            (Method::POST, "/users/abc"),
            (Method::PATCH, "/sensor-data/abc"),
        ] {
            let (status, body) = call(&app, method, uri, None).await;
            assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
            assert_eq!(body, json!({"message": "Method Not Allowed"}));
        }
    }

    #[tokio::test]
    async fn writes_without_id_are_400() {
        let app = app();
        let (status, body) = call(&app, Method::PUT, "/users", Some(json!({"username": "x"}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({"message": "Missing id"}));

        let (status, body) = call(&app, Method::DELETE, "/sensor-data", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({"message": "Missing id"}));
    }

    #[tokio::test]
    async fn storage_failures_are_generic_500s() {
        let store: Arc<dyn KeyValueStore> = Arc::new(FailingStore);
        let app = build_app(AppState::from_parts(store.clone(), store));

        let (status, body) = call(&app, Method::GET, "/users", None).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, json!({"message": "Error getting users"}));

        let (status, body) = call(
            &app,
            Method::POST,
            "/sensor-data",
            Some(json!({"sensorName": "t", "sensorValue": 1})),
        )
        .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, json!({"message": "Error creating sensor data"}));

        let (status, body) = call(&app, Method::DELETE, "/users/abc", None).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, json!({"message": "Error deleting user"}));
    }

    #[tokio::test]
    async fn validation_runs_before_a_broken_store() {
        let store: Arc<dyn KeyValueStore> = Arc::new(FailingStore);
        let app = build_app(AppState::from_parts(store.clone(), store));
        let (status, _) = call(&app, Method::PUT, "/users/abc", Some(json!({}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn panics_become_500_with_their_message() {
        let store: Arc<dyn KeyValueStore> = Arc::new(PanickingStore);
        let app = build_app(AppState::from_parts(store.clone(), store));
        let (status, body) = call(&app, Method::GET, "/sensor-data", None).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, json!({"message": "store exploded"}));
    }

    #[tokio::test]
    async fn memory_store_is_shared_per_resource_only() {
        let users = Arc::new(MemoryStore::new());
        let sensors = Arc::new(MemoryStore::new());
        let app = build_app(AppState::from_parts(users.clone(), sensors.clone()));
        create_user(&app, "carol", "carol@example.com").await;
        assert_eq!(users.scan().await.unwrap().len(), 1);
        assert!(sensors.scan().await.unwrap().is_empty());
    }
}
