use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::{json, Value};
use tracing::error;

/// A finished response: a status plus either `{"message": ...}` or a JSON value.
#[derive(Debug)]
pub struct Reply {
    pub status: StatusCode,
    pub body: Value,
}

impl Reply {
    pub fn message(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            body: json!({ "message": message.into() }),
        }
    }

    pub fn data<T: Serialize>(status: StatusCode, data: &T) -> Result<Self, ApiError> {
        let body = serde_json::to_value(data).map_err(|e| ApiError::Unexpected(e.to_string()))?;
        Ok(Self { status, body })
    }

    pub fn ok<T: Serialize>(data: &T) -> Result<Self, ApiError> {
        Self::data(StatusCode::OK, data)
    }
}

impl IntoResponse for Reply {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

/// `{"message": ..., "data": ...}` used by create and update.
#[derive(Debug, Serialize)]
pub struct WithData<T> {
    pub message: &'static str,
    pub data: T,
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(&'static str),
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("{message}")]
    Storage {
        message: &'static str,
        #[source]
        source: anyhow::Error,
    },
    #[error("Method Not Allowed")]
    MethodNotAllowed,
    #[error("{0}")]
    Unexpected(String),
}

impl ApiError {
    /// Wraps a store failure under a generic, caller-safe message.
    pub fn storage(message: &'static str) -> impl FnOnce(anyhow::Error) -> Self {
        move |source| Self::Storage { message, source }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            Self::Storage { .. } | Self::Unexpected(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match &self {
            Self::Storage { message, source } => {
                error!(error = ?source, "{}", message);
            }
            Self::Unexpected(message) => {
                error!(error = %message, "unexpected error");
            }
            _ => {}
        }
        Reply::message(self.status(), self.to_string()).into_response()
    }
}

/// Fallback for methods a resource path does not serve.
pub async fn method_not_allowed() -> ApiError {
    ApiError::MethodNotAllowed
}
