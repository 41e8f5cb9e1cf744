//! Response encoding and error mapping.
//!
//! # Responsibilities
//! - Encode fetched bodies as `{"data": [{url, body}]}` in input order
//! - Encode every failure as `{"error": true, "errorText": ..., "data": null}`
//! - Map batch errors to HTTP status codes
//!
//! # Design Decisions
//! - Caller mistakes are 4xx, origin failures 502
//! - Request deadline results in 504 Gateway Timeout
//! - Overload and draining are 503

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::fanout::{BatchError, FetchedUrl};

/// One fetched URL on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UrlData {
    pub url: String,
    pub body: String,
}

impl From<FetchedUrl> for UrlData {
    fn from(fetched: FetchedUrl) -> Self {
        Self {
            url: fetched.url,
            body: String::from_utf8_lossy(&fetched.body).into_owned(),
        }
    }
}

/// Successful batch response.
#[derive(Debug, Serialize, Deserialize)]
pub struct HandleUrlsResponse {
    pub data: Vec<UrlData>,
}

/// Failure response body.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: bool,
    #[serde(rename = "errorText")]
    pub error_text: String,
    pub data: Option<Vec<UrlData>>,
}

impl ErrorResponse {
    pub fn new(error_text: impl Into<String>) -> Self {
        Self {
            error: true,
            error_text: error_text.into(),
            data: None,
        }
    }
}

/// Anything the batch endpoint can fail with.
#[derive(Debug)]
pub enum ApiError {
    /// The body was not a JSON array of strings.
    Decode(JsonRejection),
    Batch(BatchError),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Decode(JsonRejection::JsonSyntaxError(_) | JsonRejection::JsonDataError(_)) => {
                StatusCode::BAD_REQUEST
            }
            ApiError::Decode(rejection) => rejection.status(),
            ApiError::Batch(err) => status_for(err),
        }
    }

    fn error_text(&self) -> String {
        match self {
            ApiError::Decode(rejection) => {
                format!("failed to decode request: {}", rejection.body_text())
            }
            ApiError::Batch(err) => err.to_string(),
        }
    }
}

/// HTTP status for a terminal batch failure.
pub fn status_for(err: &BatchError) -> StatusCode {
    match err {
        BatchError::EmptyBatch | BatchError::BatchTooLarge { .. } | BatchError::MalformedUrl { .. } => {
            StatusCode::BAD_REQUEST
        }
        BatchError::Fetch { .. } => StatusCode::BAD_GATEWAY,
        BatchError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
        BatchError::AdmissionTimeout | BatchError::ShuttingDown | BatchError::Cancelled => {
            StatusCode::SERVICE_UNAVAILABLE
        }
        BatchError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl From<BatchError> for ApiError {
    fn from(err: BatchError) -> Self {
        ApiError::Batch(err)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::Decode(rejection)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status(), Json(ErrorResponse::new(self.error_text()))).into_response()
    }
}
