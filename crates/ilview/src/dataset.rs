//! Multiscale dataset metadata model.
//!
//! A remote chunked volumetric dataset is described by a JSON "info"
//! document fetched once at construction time; the resulting
//! [`MultiscaleDataset`] is immutable and freely shareable afterwards.

use diagnostics::log_debug;
use ilurl::{Url, VirtualTag};
use serde::{Deserialize, Serialize};

use crate::error::{Result, ViewError};

/// What the voxel values mean.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SemanticKind {
    Image,
    Segmentation,
}

/// Element type of a single channel value.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ElementType {
    Uint8,
    Uint16,
    Uint32,
    Uint64,
    Float32,
}

/// On-the-wire encoding of a chunk.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ChunkEncoding {
    Raw,
    Jpeg,
    CompressedSegmentation,
}

/// Wire shape of the remote "info" document.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct InfoDocument {
    #[serde(rename = "type")]
    pub kind: SemanticKind,
    pub data_type: ElementType,
    pub num_channels: u32,
    pub scales: Vec<ScaleInfo>,
}

/// Wire shape of one scale entry inside the info document.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ScaleInfo {
    pub key: String,
    pub size: [u64; 3],
    pub resolution: [u64; 3],
    pub voxel_offset: [i64; 3],
    pub chunk_sizes: Vec<[u64; 3]>,
    pub encoding: ChunkEncoding,
}

/// Render a resolution vector the way the wire grammars expect it:
/// `<rx>_<ry>_<rz>`.
pub fn fmt_resolution(resolution: [u64; 3]) -> String {
    format!("{}_{}_{}", resolution[0], resolution[1], resolution[2])
}

/// Inverse of [`fmt_resolution`]; `None` on any malformed component.
pub fn parse_resolution(raw: &str) -> Option<[u64; 3]> {
    let mut parts = raw.split('_');
    let x = parts.next()?.parse().ok()?;
    let y = parts.next()?.parse().ok()?;
    let z = parts.next()?.parse().ok()?;
    if parts.next().is_some() {
        return None;
    }
    Some([x, y, z])
}

/// One resolution level of a multiscale dataset, independently addressable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scale {
    base_url: Url,
    key: String,
    pub size: [u64; 3],
    pub resolution: [u64; 3],
    pub voxel_offset: [i64; 3],
    pub chunk_sizes: Vec<[u64; 3]>,
    pub encoding: ChunkEncoding,
}

impl Scale {
    fn from_info(base_url: &Url, info: ScaleInfo) -> Self {
        Scale {
            base_url: base_url.clone(),
            // Scale keys are relative paths; a leading slash is noise
            key: info.key.trim_start_matches('/').to_string(),
            size: info.size,
            resolution: info.resolution,
            voxel_offset: info.voxel_offset,
            chunk_sizes: info.chunk_sizes,
            encoding: info.encoding,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// The scale's own url: the dataset url extended by the scale key and
    /// carrying `?resolution=<rx>_<ry>_<rz>`.
    pub fn url(&self) -> Url {
        self.base_url
            .join_path(&self.key)
            .with_query_param("resolution", fmt_resolution(self.resolution))
    }

    /// Chunk name for the axis-aligned half-open voxel interval
    /// `[x0,x1) x [y0,y1) x [z0,z1)`: `x0-x1_y0-y1_z0-z1`.
    pub fn chunk_name(&self, x: (u64, u64), y: (u64, u64), z: (u64, u64)) -> String {
        format!("{}-{}_{}-{}_{}-{}", x.0, x.1, y.0, y.1, z.0, z.1)
    }

    /// Url of one chunk, relative to the scale's own url.
    pub fn chunk_url(&self, x: (u64, u64), y: (u64, u64), z: (u64, u64)) -> Url {
        self.url().join_path(&self.chunk_name(x, y, z))
    }
}

/// Immutable metadata for a remote multiscale dataset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MultiscaleDataset {
    url: Url,
    pub kind: SemanticKind,
    pub element_type: ElementType,
    pub num_channels: u32,
    scales: Vec<Scale>,
}

impl MultiscaleDataset {
    /// Fetch the info document at `<url>/info` and build the dataset.
    ///
    /// The url is normalized to the `precomputed` virtual tag first; a url
    /// already carrying a different tag is rejected. Only http(s)
    /// transports can serve dataset data.
    pub async fn fetch(http: &reqwest::Client, url: &Url) -> Result<Self> {
        let url = url.ensure_virtual_tag(VirtualTag::Precomputed)?;
        if !url.transport().is_http() {
            return Err(ViewError::UnsupportedTransport {
                transport: url.transport().to_string(),
                url: url.double_protocol(),
            });
        }

        let info_url = url.join_path("info");
        log_debug!("Fetching dataset info from {url}", url: info_url.schemeless());
        let response = http
            .get(info_url.schemeless())
            .send()
            .await
            .map_err(|e| ViewError::fetch_failed(&url, e.to_string()))?;
        if !response.status().is_success() {
            return Err(ViewError::fetch_failed(
                &url,
                format!("HTTP {}", response.status()),
            ));
        }
        let body = response
            .text()
            .await
            .map_err(|e| ViewError::fetch_failed(&url, e.to_string()))?;

        let info: InfoDocument = serde_json::from_str(&body)
            .map_err(|e| ViewError::malformed_metadata(&url, e.to_string()))?;
        Self::from_info(url, info)
    }

    /// Build the dataset from an already-parsed info document.
    pub fn from_info(url: Url, info: InfoDocument) -> Result<Self> {
        if info.scales.is_empty() {
            return Err(ViewError::malformed_metadata(&url, "no scales"));
        }
        let scales: Vec<Scale> = info
            .scales
            .into_iter()
            .map(|s| Scale::from_info(&url, s))
            .collect();

        // Resolution uniquely identifies a scale within its dataset
        for (i, scale) in scales.iter().enumerate() {
            if scales[..i].iter().any(|s| s.resolution == scale.resolution) {
                return Err(ViewError::malformed_metadata(
                    &url,
                    format!("duplicate scale resolution {}", fmt_resolution(scale.resolution)),
                ));
            }
        }

        Ok(MultiscaleDataset {
            url,
            kind: info.kind,
            element_type: info.data_type,
            num_channels: info.num_channels,
            scales,
        })
    }

    /// The canonical "info" location of this dataset.
    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn scales(&self) -> &[Scale] {
        &self.scales
    }

    /// Exact 3-vector match; no nearest-match fallback.
    pub fn find_scale(&self, resolution: [u64; 3]) -> Option<&Scale> {
        self.scales.iter().find(|s| s.resolution == resolution)
    }
}
