//! Live-predictions derived datasets.
//!
//! Predictions over a raw dataset are served by the compute session under
//! a compound url. Two address shapes exist and are deliberately kept
//! distinct rather than unified:
//!
//! - materialized (server-side run): `predictions/raw_data=<token(raw_data_url)>/run_id=<random-id>`
//! - displayed (training-style): `predictions/raw_data=<token(json descriptor)>/generation=<integer>`
//!
//! The `run_id` suffix is optional on the materialized shape. Because run
//! ids are random per call, two `create_for` calls over the same raw data
//! are distinct addresses; uniqueness is statistical, not enforced.

use diagnostics::log_info;
use ilurl::{Url, token};
use rand::{Rng, distributions::Alphanumeric};

use crate::dataset::MultiscaleDataset;
use crate::error::{Result, ViewError};
use crate::session::{DataSourceDescriptor, Session};

const PREDICTIONS_MARKER: &str = "predictions";
const RUN_ID_LEN: usize = 16;

/// Identity recovered from a predictions url.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PredictionsUrlParts {
    /// Server-materialized run over a raw dataset url
    Materialized {
        raw_data_url: Url,
        run_id: Option<String>,
    },
    /// Viewer-displayed shape: a full raw-data descriptor plus the
    /// classifier generation it was predicted with
    Displayed {
        raw_data: DataSourceDescriptor,
        generation: u64,
    },
}

impl PredictionsUrlParts {
    /// The raw-data url, whichever shape carried it.
    pub fn raw_data_url(&self) -> Result<Url> {
        match self {
            PredictionsUrlParts::Materialized { raw_data_url, .. } => Ok(raw_data_url.clone()),
            PredictionsUrlParts::Displayed { raw_data, .. } => raw_data.parsed_url(),
        }
    }
}

/// A multiscale dataset of live predictions over another dataset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PredictionsDataset {
    dataset: MultiscaleDataset,
    raw_data_url: Url,
}

fn fresh_run_id() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(RUN_ID_LEN)
        .map(char::from)
        .collect()
}

/// Build the materialized compound url for predictions over
/// `raw_data_url` under `base`.
pub fn compose_url(base: &Url, raw_data_url: &Url, run_id: &str) -> Url {
    base.join_path(&format!(
        "{}/raw_data={}/run_id={}",
        PREDICTIONS_MARKER,
        token::encode(raw_data_url.double_protocol().as_bytes()),
        run_id,
    ))
}

impl PredictionsDataset {
    /// Recover a predictions identity from a url, or fail with
    /// [`ViewError::NotAPredictionsUrl`].
    pub fn parse_url(url: &Url) -> Result<PredictionsUrlParts> {
        let mismatch = || ViewError::NotAPredictionsUrl(url.double_protocol());
        let segments = url.path().segments();

        // The raw_data segment is either last or second to last, with the
        // marker segment right before it.
        let (marker, raw_data_seg, suffix) = match segments {
            [.., marker, raw_data] if raw_data.starts_with("raw_data=") => {
                (marker, raw_data, None)
            }
            [.., marker, raw_data, suffix] if raw_data.starts_with("raw_data=") => {
                (marker, raw_data, Some(suffix))
            }
            _ => return Err(mismatch()),
        };
        if marker.as_str() != PREDICTIONS_MARKER {
            return Err(mismatch());
        }
        let encoded = raw_data_seg.strip_prefix("raw_data=").ok_or_else(mismatch)?;

        match suffix {
            Some(suffix) => {
                if let Some(run_id) = suffix.strip_prefix("run_id=") {
                    let raw_data_url = Url::parse(&token::decode_str(encoded)?)?;
                    Ok(PredictionsUrlParts::Materialized {
                        raw_data_url,
                        run_id: Some(run_id.to_string()),
                    })
                } else if let Some(generation_str) = suffix.strip_prefix("generation=") {
                    let generation = generation_str.parse().map_err(|_| mismatch())?;
                    let raw_data: DataSourceDescriptor =
                        serde_json::from_str(&token::decode_str(encoded)?)?;
                    Ok(PredictionsUrlParts::Displayed {
                        raw_data,
                        generation,
                    })
                } else {
                    Err(mismatch())
                }
            }
            None => {
                let raw_data_url = Url::parse(&token::decode_str(encoded)?)?;
                Ok(PredictionsUrlParts::Materialized {
                    raw_data_url,
                    run_id: None,
                })
            }
        }
    }

    /// Ask the session for a fresh predictions run over `raw_data` and
    /// fetch the result's metadata.
    ///
    /// Every call composes a new random run id; identical requests are not
    /// deduplicated at this layer.
    pub async fn create_for(
        raw_data: &MultiscaleDataset,
        session: &Session,
    ) -> Result<PredictionsDataset> {
        let compound = compose_url(session.base_url(), raw_data.url(), &fresh_run_id());
        log_info!("Creating predictions run at {url}", url: compound.schemeless());
        let dataset = MultiscaleDataset::fetch(session.http(), &compound).await?;
        Ok(PredictionsDataset {
            dataset,
            raw_data_url: raw_data.url().clone(),
        })
    }

    /// Rebuild a predictions dataset purely from its url.
    pub async fn from_url(http: &reqwest::Client, url: &Url) -> Result<PredictionsDataset> {
        let parts = Self::parse_url(url)?;
        let raw_data_url = parts.raw_data_url()?;
        let dataset = MultiscaleDataset::fetch(http, url).await?;
        Ok(PredictionsDataset {
            dataset,
            raw_data_url,
        })
    }

    pub fn url(&self) -> &Url {
        self.dataset.url()
    }

    pub fn dataset(&self) -> &MultiscaleDataset {
        &self.dataset
    }

    pub fn raw_data_url(&self) -> &Url {
        &self.raw_data_url
    }
}
