use actor_core::Error;
use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

// Fields are optional so that missing ones become a 400 with our own error
// body instead of axum's rejection text.

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActorsRequest {
    pub api_key: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaRequest {
    pub api_key: Option<String>,
    pub actor_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunRequest {
    pub api_key: Option<String>,
    pub actor_id: Option<String>,
    #[serde(default)]
    pub input: Option<Value>,
}

// Output: dataset items of the finished run
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunResponse {
    pub run_id: String,
    pub result: Vec<Value>,
}

/// Boundary error rendered as `{ error, kind, details? }`.
#[derive(Debug)]
pub enum ApiError {
    Core(Error),
    // Body missing, not JSON, or not the expected object.
    BadRequest(JsonRejection),
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        Self::Core(err)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadRequest(rejection)
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        let err = match self {
            ApiError::Core(err) => err,
            ApiError::BadRequest(_) => return StatusCode::BAD_REQUEST,
        };
        match err {
            Error::MissingCredential | Error::MissingField(_) => StatusCode::BAD_REQUEST,
            Error::Remote { status: 401, .. } => StatusCode::UNAUTHORIZED,
            Error::Remote { status: 403, .. } => StatusCode::FORBIDDEN,
            Error::Remote { .. } | Error::Transport(_) | Error::GenerationParseFailed(_) => {
                StatusCode::BAD_GATEWAY
            }
            Error::SchemaResolutionFailed { .. } => StatusCode::NOT_FOUND,
            Error::RunFailed { .. } => StatusCode::BAD_REQUEST,
            Error::PollTimeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            Error::Cancelled { .. } => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    fn body(&self) -> Value {
        match self {
            ApiError::Core(err) => {
                let mut body = json!({
                    "error": err.to_string(),
                    "kind": err.kind(),
                });
                if let Some(details) = err.details() {
                    body["details"] = details;
                }
                body
            }
            ApiError::BadRequest(rejection) => json!({
                "error": "Request body must be a JSON object",
                "kind": "bad_request",
                "details": rejection.body_text(),
            }),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status(), Json(self.body())).into_response()
    }
}
