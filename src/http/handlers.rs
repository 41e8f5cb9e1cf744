//! Route handlers.

use axum::{
    extract::{rejection::JsonRejection, State},
    http::HeaderMap,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::Instrument;

use crate::http::request::RequestIdExt;
use crate::http::response::{ApiError, HandleUrlsResponse, UrlData};
use crate::http::server::AppState;
use crate::observability::metrics;

/// `POST /api/v1/handle`
pub async fn handle_urls(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<Vec<String>>, JsonRejection>,
) -> Response {
    let start_time = Instant::now();
    let span = tracing::info_span!("handle_urls", request_id = %headers.request_id());

    let response = async move {
        let Json(urls) = payload.map_err(ApiError::from)?;
        let fetched = state.pipeline.run(urls).await?;
        Ok::<_, ApiError>(Json(HandleUrlsResponse {
            data: fetched.into_iter().map(UrlData::from).collect(),
        }))
    }
    .instrument(span)
    .await
    .into_response();

    metrics::record_request(response.status().as_u16(), start_time);
    response
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AdmissionStatus {
    pub capacity: usize,
    pub available: usize,
    pub in_flight: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SystemStatus {
    pub version: String,
    /// `operational`, or `draining` once shutdown has begun.
    pub status: String,
    pub max_urls: usize,
    pub admission: AdmissionStatus,
}

/// `GET /status`
pub async fn get_status(State(state): State<AppState>) -> Json<SystemStatus> {
    let admission = state.pipeline.admission();
    let status = if admission.is_closed() {
        "draining"
    } else {
        "operational"
    };

    Json(SystemStatus {
        version: env!("CARGO_PKG_VERSION").to_string(),
        status: status.to_string(),
        max_urls: state.max_urls,
        admission: AdmissionStatus {
            capacity: admission.capacity(),
            available: admission.available(),
            in_flight: admission.in_flight(),
        },
    })
}
