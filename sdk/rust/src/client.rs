//! Client for the fan-out fetch service.

use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::fmt;

/// One fetched URL as returned by the service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UrlData {
    pub url: String,
    pub body: String,
}

#[derive(Debug, Deserialize)]
struct HandleUrlsResponse {
    data: Vec<UrlData>,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    #[serde(rename = "errorText")]
    error_text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdmissionStatus {
    pub capacity: usize,
    pub available: usize,
    pub in_flight: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemStatus {
    pub version: String,
    pub status: String,
    pub max_urls: usize,
    pub admission: AdmissionStatus,
}

#[derive(Debug)]
pub enum ClientError {
    /// The service answered with its structured error object.
    Service { status: StatusCode, error_text: String },
    Http(reqwest::Error),
}

impl ClientError {
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ClientError::Service { status, .. } => Some(*status),
            ClientError::Http(e) => e.status(),
        }
    }
}

impl fmt::Display for ClientError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClientError::Service { status, error_text } => {
                write!(f, "service returned {}: {}", status, error_text)
            }
            ClientError::Http(e) => write!(f, "request failed: {}", e),
        }
    }
}

impl std::error::Error for ClientError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ClientError::Http(e) => Some(e),
            ClientError::Service { .. } => None,
        }
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(e: reqwest::Error) -> Self {
        ClientError::Http(e)
    }
}

pub struct FanoutClient {
    client: Client,
    base_url: String,
}

impl FanoutClient {
    pub fn new(base_url: &str) -> Self {
        Self::with_client(Client::new(), base_url)
    }

    pub fn with_client(client: Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Fetch every URL through the service. Bodies come back in input order.
    pub async fn handle_urls<S: AsRef<str>>(&self, urls: &[S]) -> Result<Vec<UrlData>, ClientError> {
        let urls: Vec<&str> = urls.iter().map(AsRef::as_ref).collect();
        let resp = self
            .client
            .post(format!("{}/api/v1/handle", self.base_url))
            .json(&urls)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(service_error(status, resp).await);
        }

        let body: HandleUrlsResponse = resp.json().await?;
        Ok(body.data)
    }

    /// Read the service's status report.
    pub async fn status(&self) -> Result<SystemStatus, ClientError> {
        let resp = self
            .client
            .get(format!("{}/status", self.base_url))
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(service_error(status, resp).await);
        }
        Ok(resp.json().await?)
    }
}

async fn service_error(status: StatusCode, resp: reqwest::Response) -> ClientError {
    let text = match resp.text().await {
        Ok(text) => text,
        Err(e) => return ClientError::Http(e),
    };
    let error_text = match serde_json::from_str::<ErrorResponse>(&text) {
        Ok(err) => err.error_text,
        Err(_) => text,
    };
    ClientError::Service { status, error_text }
}
