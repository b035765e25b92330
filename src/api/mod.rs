//! REST API module.
//!
//! Contains all API routes and handlers following the client contract.

mod groups;
mod health;
mod options;
mod sessions;

pub use groups::*;
pub use health::*;
pub use options::*;
pub use sessions::*;

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::{Map, Value};

use crate::errors::{AppError, AppErrorWithRevision};

/// Success response envelope.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    pub data: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub revision_id: i64,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn new(data: T, revision_id: i64) -> Self {
        Self {
            success: true,
            data,
            total: None,
            message: None,
            revision_id,
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

impl<T: Serialize> ApiResponse<Vec<T>> {
    /// A list envelope carrying `total`.
    pub fn list(data: Vec<T>, revision_id: i64) -> Self {
        let total = data.len();
        Self {
            total: Some(total),
            ..Self::new(data, revision_id)
        }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        (StatusCode::OK, Json(self)).into_response()
    }
}

/// Envelope that names its entity: `{success, <key>: entity, message}`.
///
/// Used by create and lock endpoints.
pub struct Keyed<T: Serialize> {
    status: StatusCode,
    key: &'static str,
    entity: T,
    message: Option<&'static str>,
    revision_id: i64,
}

impl<T: Serialize> Keyed<T> {
    pub fn created(key: &'static str, entity: T, revision_id: i64) -> Self {
        Self {
            status: StatusCode::CREATED,
            key,
            entity,
            message: None,
            revision_id,
        }
    }

    pub fn ok(key: &'static str, entity: T, revision_id: i64) -> Self {
        Self {
            status: StatusCode::OK,
            ..Self::created(key, entity, revision_id)
        }
    }

    pub fn with_message(mut self, message: &'static str) -> Self {
        self.message = Some(message);
        self
    }
}

impl<T: Serialize> IntoResponse for Keyed<T> {
    fn into_response(self) -> Response {
        let entity = match serde_json::to_value(&self.entity) {
            Ok(value) => value,
            Err(e) => return AppError::from(e).with_revision(self.revision_id).into_response(),
        };

        let mut body = Map::new();
        body.insert("success".to_string(), Value::Bool(true));
        body.insert(self.key.to_string(), entity);
        if let Some(message) = self.message {
            body.insert("message".to_string(), Value::from(message));
        }
        body.insert("revisionId".to_string(), Value::from(self.revision_id));

        (self.status, Json(Value::Object(body))).into_response()
    }
}

/// Response type that can be either success or error.
pub type ApiResult<T> = Result<ApiResponse<T>, AppErrorWithRevision>;

/// Create a successful API response.
pub fn success<T: Serialize>(data: T, revision_id: i64) -> ApiResult<T> {
    Ok(ApiResponse::new(data, revision_id))
}

/// Create an error API response.
pub fn error<T: Serialize>(err: AppError, revision_id: i64) -> ApiResult<T> {
    Err(err.with_revision(revision_id))
}

/// Unwrap a JSON body, reporting malformed input in the error envelope.
pub fn json_body<T>(
    payload: Result<Json<T>, JsonRejection>,
    revision_id: i64,
) -> Result<T, AppErrorWithRevision> {
    payload
        .map(|Json(body)| body)
        .map_err(|rejection| AppError::BadRequest(rejection.body_text()).with_revision(revision_id))
}
