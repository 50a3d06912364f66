//! Resolution-stripped derived datasets.
//!
//! A stripped dataset is "this dataset reduced to a single resolution", as
//! materialized server-side by the compute session. The client only
//! composes and parses the compound address; its whole identity is
//! recoverable from the url alone:
//!
//! `stripped_precomputed/url=<token(original_url)>/resolution=<rx>_<ry>_<rz>`

use diagnostics::log_info;
use ilurl::{Url, token};

use crate::dataset::{MultiscaleDataset, Scale, fmt_resolution, parse_resolution};
use crate::error::{Result, ViewError};
use crate::session::Session;

const STRIPPED_MARKER: &str = "stripped_precomputed";

/// Identity recovered from a stripped-dataset url.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StrippedUrlParts {
    pub original_url: Url,
    pub resolution: [u64; 3],
}

/// A multiscale dataset stripped to a single scale of another dataset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StrippedDataset {
    dataset: MultiscaleDataset,
    original: MultiscaleDataset,
    scale: Scale,
}

/// Build the compound url for a stripped view of `original_url` under
/// `base` (normally the session's own base url).
pub fn compose_url(base: &Url, original_url: &Url, resolution: [u64; 3]) -> Url {
    base.join_path(&format!(
        "{}/url={}/resolution={}",
        STRIPPED_MARKER,
        token::encode(original_url.double_protocol().as_bytes()),
        fmt_resolution(resolution),
    ))
}

impl StrippedDataset {
    /// Recover the original url and resolution from a stripped-dataset
    /// url, or fail with [`ViewError::NotAStrippedUrl`].
    pub fn parse_url(url: &Url) -> Result<StrippedUrlParts> {
        let mismatch = || ViewError::NotAStrippedUrl(url.double_protocol());
        let segments = url.path().segments();
        if segments.len() < 3 {
            return Err(mismatch());
        }
        let [marker, url_seg, resolution_seg] = &segments[segments.len() - 3..] else {
            return Err(mismatch());
        };
        if marker.as_str() != STRIPPED_MARKER {
            return Err(mismatch());
        }
        let encoded = url_seg.strip_prefix("url=").ok_or_else(mismatch)?;
        let resolution = resolution_seg
            .strip_prefix("resolution=")
            .and_then(parse_resolution)
            .ok_or_else(mismatch)?;

        // The pattern matched; from here on a bad token is a real error
        let original_url = Url::parse(&token::decode_str(encoded)?)?;
        Ok(StrippedUrlParts {
            original_url,
            resolution,
        })
    }

    /// Ask the session to materialize `original` stripped to `resolution`
    /// and fetch the result's metadata.
    pub async fn materialize(
        original: &MultiscaleDataset,
        resolution: [u64; 3],
        session: &Session,
    ) -> Result<StrippedDataset> {
        let compound = compose_url(session.base_url(), original.url(), resolution);
        log_info!("Materializing stripped view at {url}", url: compound.schemeless());
        let dataset = MultiscaleDataset::fetch(session.http(), &compound).await?;
        let scale = Self::single_scale(&dataset, resolution)?;
        Ok(StrippedDataset {
            dataset,
            original: original.clone(),
            scale,
        })
    }

    /// Rebuild a stripped dataset purely from its url.
    ///
    /// Two independent network round trips: the stripped view's own
    /// metadata and the original dataset's metadata. Either can fail on
    /// its own.
    pub async fn from_url(http: &reqwest::Client, url: &Url) -> Result<StrippedDataset> {
        let parts = Self::parse_url(url)?;
        let dataset = MultiscaleDataset::fetch(http, url).await?;
        let original = MultiscaleDataset::fetch(http, &parts.original_url).await?;
        let scale = Self::single_scale(&dataset, parts.resolution)?;
        Ok(StrippedDataset {
            dataset,
            original,
            scale,
        })
    }

    // A stripped dataset has exactly one scale, at exactly the resolution
    // its url names.
    fn single_scale(dataset: &MultiscaleDataset, resolution: [u64; 3]) -> Result<Scale> {
        let [scale] = dataset.scales() else {
            return Err(ViewError::strip_invalid(
                dataset.url(),
                format!("expected 1 scale, got {}", dataset.scales().len()),
            ));
        };
        if scale.resolution != resolution {
            return Err(ViewError::strip_invalid(
                dataset.url(),
                format!(
                    "scale resolution {} does not match url resolution {}",
                    fmt_resolution(scale.resolution),
                    fmt_resolution(resolution),
                ),
            ));
        }
        Ok(scale.clone())
    }

    pub fn url(&self) -> &Url {
        self.dataset.url()
    }

    pub fn dataset(&self) -> &MultiscaleDataset {
        &self.dataset
    }

    pub fn original(&self) -> &MultiscaleDataset {
        &self.original
    }

    pub fn scale(&self) -> &Scale {
        &self.scale
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Url {
        Url::parse("https://app.ilastik.org/session/abc123").unwrap()
    }

    fn original_url() -> Url {
        Url::parse("precomputed://https://example.com/datasets/cortex").unwrap()
    }

    #[test]
    fn test_compose_then_parse_round_trips() {
        let compound = compose_url(&base(), &original_url(), [50, 50, 50]);
        let parts = StrippedDataset::parse_url(&compound).unwrap();
        assert_eq!(parts.original_url, original_url());
        assert_eq!(parts.resolution, [50, 50, 50]);
    }

    #[test]
    fn test_compound_path_grammar_is_bit_exact() {
        let compound = compose_url(&base(), &original_url(), [10, 20, 30]);
        let expected_token = token::encode(original_url().double_protocol().as_bytes());
        assert_eq!(
            compound.path().raw(),
            format!(
                "/session/abc123/stripped_precomputed/url={}/resolution=10_20_30",
                expected_token
            )
        );
    }

    #[test]
    fn test_parse_rejects_non_stripped_urls() {
        for raw in [
            "https://example.com/datasets/cortex",
            "https://example.com/stripped_precomputed",
            "https://example.com/stripped_precomputed/url=YWI",
            "https://example.com/stripped_precomputed/url=YWI/resolution=bad",
            "https://example.com/stripped_precomputed/resolution=1_1_1/url=YWI",
        ] {
            let url = Url::parse(raw).unwrap();
            assert!(
                matches!(StrippedDataset::parse_url(&url), Err(ViewError::NotAStrippedUrl(_))),
                "accepted '{}'",
                raw
            );
        }
    }

    #[test]
    fn test_parse_surfaces_bad_token_as_malformed() {
        let url = Url::parse(
            "https://example.com/stripped_precomputed/url=a+b/resolution=1_1_1",
        )
        .unwrap();
        assert!(matches!(
            StrippedDataset::parse_url(&url),
            Err(ViewError::Url(ilurl::UrlError::MalformedToken(_)))
        ));
    }
}
