//! Error types for the addressing layer

use thiserror::Error;

use crate::url::VirtualTag;

pub type Result<T> = std::result::Result<T, UrlError>;

/// Errors raised while parsing or composing urls and tokens.
///
/// All of these are local, synchronous syntax errors: none of them is ever
/// retried, and none of them involves the network.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum UrlError {
    #[error("invalid url '{raw}': {reason}")]
    InvalidUrl { raw: String, reason: String },

    #[error("malformed opaque token: {0}")]
    MalformedToken(String),

    #[error("virtual tag conflict: url already carries '{existing}', cannot apply '{requested}'")]
    TagConflict {
        existing: VirtualTag,
        requested: VirtualTag,
    },
}

impl UrlError {
    pub fn invalid_url<R: Into<String>, S: Into<String>>(raw: R, reason: S) -> Self {
        UrlError::InvalidUrl {
            raw: raw.into(),
            reason: reason.into(),
        }
    }

    pub fn malformed_token<S: Into<String>>(reason: S) -> Self {
        UrlError::MalformedToken(reason.into())
    }
}
