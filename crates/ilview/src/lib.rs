//! Dataset metadata and view resolution for the ilastik viewer client.
//!
//! Builds on the `ilurl` addressing layer: fetches multiscale dataset
//! metadata, composes and parses the compound urls of server-derived
//! datasets (stripped views, live predictions), talks to the remote compute
//! session, and classifies whatever url the host viewer currently shows
//! into a typed view. Overlapping resolutions are raced through the
//! stale-guard generation counter so only the most recently started one is
//! allowed to win.

pub mod config;
pub mod dataset;
pub mod error;
pub mod predictions;
pub mod resolver;
pub mod session;
pub mod stale;
pub mod stripped;

pub use config::SessionConfig;
pub use dataset::{ChunkEncoding, ElementType, MultiscaleDataset, Scale, SemanticKind};
pub use error::{Result, ViewError};
pub use predictions::{PredictionsDataset, PredictionsUrlParts};
pub use resolver::{NativeViewHandle, ViewResolver, ViewState};
pub use session::{DataSourceDescriptor, Session};
pub use stale::{Outcome, StaleGuard};
pub use stripped::{StrippedDataset, StrippedUrlParts};
