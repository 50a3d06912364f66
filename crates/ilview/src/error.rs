//! Error types for dataset metadata and view resolution

use thiserror::Error;

pub type Result<T> = std::result::Result<T, ViewError>;

/// Failure modes of the metadata/resolution layer.
///
/// The pattern-mismatch variants (`NotAStrippedUrl`, `NotAPredictionsUrl`)
/// double as negative probe results inside the view-resolution chain: the
/// resolver treats them as "try the next state", not as user-facing
/// failures. Network and contract violations are terminal for the attempt
/// that hit them; nothing at this layer retries.
#[derive(Debug, Error)]
pub enum ViewError {
    #[error("addressing error: {0}")]
    Url(#[from] ilurl::UrlError),

    #[error("unsupported transport '{transport}' for data fetch at {url}")]
    UnsupportedTransport { transport: String, url: String },

    #[error("metadata fetch failed for {url}: {reason}")]
    MetadataFetchFailed { url: String, reason: String },

    #[error("malformed dataset metadata at {url}: {reason}")]
    MalformedMetadata { url: String, reason: String },

    #[error("not a stripped-dataset url: {0}")]
    NotAStrippedUrl(String),

    #[error("not a predictions url: {0}")]
    NotAPredictionsUrl(String),

    #[error("stripped dataset at {url} violates the single-scale contract: {reason}")]
    StripResultInvalid { url: String, reason: String },

    #[error("session was not ready within {budget_ms}ms")]
    SessionTimeout { budget_ms: u64 },

    #[error("session request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("no ilastik view found at {0}")]
    NoViewForUrl(String),
}

impl ViewError {
    pub fn fetch_failed(url: &ilurl::Url, reason: impl Into<String>) -> Self {
        ViewError::MetadataFetchFailed {
            url: url.double_protocol(),
            reason: reason.into(),
        }
    }

    pub fn malformed_metadata(url: &ilurl::Url, reason: impl Into<String>) -> Self {
        ViewError::MalformedMetadata {
            url: url.double_protocol(),
            reason: reason.into(),
        }
    }

    pub fn strip_invalid(url: &ilurl::Url, reason: impl Into<String>) -> Self {
        ViewError::StripResultInvalid {
            url: url.double_protocol(),
            reason: reason.into(),
        }
    }
}
