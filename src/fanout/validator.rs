//! Batch validation.
//!
//! Pure function of its inputs: size limits first, then each URL in input
//! order. The first malformed URL rejects the whole batch.

use url::Url;

use crate::fanout::error::BatchError;

/// Default upper bound on URLs per batch.
pub const DEFAULT_MAX_URLS: usize = 20;

/// A URL that passed validation, with the caller's original spelling kept
/// for the response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedUrl {
    raw: String,
    parsed: Url,
}

impl ValidatedUrl {
    /// The string exactly as submitted.
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// The parsed absolute URL used for fetching.
    pub fn url(&self) -> &Url {
        &self.parsed
    }
}

/// An ordered, non-empty, size-bounded batch of well-formed URLs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedBatch {
    urls: Vec<ValidatedUrl>,
}

impl ValidatedBatch {
    pub fn len(&self) -> usize {
        self.urls.len()
    }

    /// Always false; kept for clippy's `len_without_is_empty`.
    pub fn is_empty(&self) -> bool {
        self.urls.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ValidatedUrl> {
        self.urls.iter()
    }

    pub fn into_urls(self) -> Vec<ValidatedUrl> {
        self.urls
    }
}

/// Validate a raw batch against the configured size limit.
pub fn validate(urls: Vec<String>, max_urls: usize) -> Result<ValidatedBatch, BatchError> {
    if urls.is_empty() {
        return Err(BatchError::EmptyBatch);
    }
    if urls.len() > max_urls {
        return Err(BatchError::BatchTooLarge {
            len: urls.len(),
            max: max_urls,
        });
    }

    let mut validated = Vec::with_capacity(urls.len());
    for (index, raw) in urls.into_iter().enumerate() {
        let parsed = parse_request_url(&raw).map_err(|reason| BatchError::MalformedUrl {
            index,
            url: raw.clone(),
            reason,
        })?;
        validated.push(ValidatedUrl { raw, parsed });
    }

    Ok(ValidatedBatch { urls: validated })
}

/// Parse an absolute http(s) URL with a host.
fn parse_request_url(raw: &str) -> Result<Url, String> {
    let parsed = Url::parse(raw).map_err(|e| e.to_string())?;

    match parsed.scheme() {
        "http" | "https" => {}
        other => return Err(format!("unsupported scheme '{}'", other)),
    }

    match parsed.host_str() {
        Some(host) if !host.is_empty() => Ok(parsed),
        _ => Err("missing host".to_string()),
    }
}
