//! Opaque token codec.
//!
//! Makes arbitrary byte strings (urls, JSON blobs) safe to place inside a
//! single url path segment while remaining reversible. This is the only
//! mechanism by which compound urls embed nested urls or descriptors, so
//! the round-trip contract here is load-bearing for every derived-dataset
//! address grammar.

use base64::Engine;
use base64::alphabet;
use base64::engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig, URL_SAFE_NO_PAD};
use base64::engine::DecodePaddingMode;

use crate::error::{Result, UrlError};

// Decoding tolerates both padded and unpadded input; encoding never pads.
const DECODER: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Encode bytes into a path-safe token.
///
/// The output uses the url-safe base64 alphabet (`-` and `_` in place of
/// `+` and `/`) without padding, so it never contains `/`, `+`, `=` or
/// whitespace and can sit inside a path segment verbatim.
pub fn encode(bytes: &[u8]) -> String {
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Decode a token produced by [`encode`].
///
/// Fails with [`UrlError::MalformedToken`] on invalid alphabet or padding.
pub fn decode(token: &str) -> Result<Vec<u8>> {
    DECODER
        .decode(token)
        .map_err(|e| UrlError::malformed_token(e.to_string()))
}

/// Decode a token that is expected to hold UTF-8 text (a url or JSON).
pub fn decode_str(token: &str) -> Result<String> {
    String::from_utf8(decode(token)?)
        .map_err(|e| UrlError::malformed_token(format!("token is not utf-8: {}", e)))
}
