//! Classification of the url a host viewer currently displays.
//!
//! Every valid ilastik-addressable url falls into one of three view
//! categories; deciding which one requires racing typed probes against
//! the remote session. Probe order is a deliberate precedence, not an
//! accident: the predictions pattern strictly dominates the datasource
//! probe, so a predictions url resolves to `Predictions` even when the
//! session would also report a datasource at it.

use std::sync::{Arc, Mutex, PoisonError};

use diagnostics::{log_debug, log_error, log_info};
use ilurl::Url;

use crate::error::ViewError;
use crate::predictions::{PredictionsDataset, PredictionsUrlParts};
use crate::session::{DataSourceDescriptor, Session};
use crate::stale::{Outcome, StaleGuard};

/// Name and url of a view as the host viewer reports it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NativeViewHandle {
    pub name: String,
    pub url: Url,
}

/// A url resolving to several datasources, one per resolution.
#[derive(Debug, Clone)]
pub struct RawDataView {
    pub handle: NativeViewHandle,
    pub datasources: Vec<DataSourceDescriptor>,
}

/// A url resolving to exactly one datasource, suitable for training.
#[derive(Debug, Clone)]
pub struct TrainingView {
    pub handle: NativeViewHandle,
    pub datasource: DataSourceDescriptor,
}

/// A url carrying the predictions compound pattern.
#[derive(Debug, Clone)]
pub struct PredictionsView {
    pub handle: NativeViewHandle,
    pub raw_data: DataSourceDescriptor,
    /// Classifier generation from the displayed url shape; absent for
    /// server-materialized run urls, which carry a run id instead.
    pub classifier_generation: Option<u64>,
}

/// Three-way view classification, plus the transient and failed states.
///
/// Views are recomputed, not mutated: every url change restarts from
/// `Unresolved` and runs the probe chain again.
#[derive(Debug, Clone)]
pub enum ViewState {
    Unresolved,
    RawData(RawDataView),
    Training(TrainingView),
    Predictions(PredictionsView),
    /// A url that is neither a known derived pattern nor resolvable by
    /// the session. This must surface as a visible error, never as an
    /// empty view.
    Failed(Arc<ViewError>),
}

impl ViewState {
    pub fn kind(&self) -> &'static str {
        match self {
            ViewState::Unresolved => "unresolved",
            ViewState::RawData(_) => "raw_data",
            ViewState::Training(_) => "training",
            ViewState::Predictions(_) => "predictions",
            ViewState::Failed(_) => "failed",
        }
    }
}

/// Resolves displayed urls into typed views against one session.
///
/// Overlapping resolutions on the same resolver are raced through a
/// stale-guard channel: only the most recently started resolution is
/// allowed to update the current state.
pub struct ViewResolver {
    session: Arc<Session>,
    channel: String,
    state: Mutex<ViewState>,
}

impl ViewResolver {
    pub fn new(session: Arc<Session>, channel: impl Into<String>) -> Self {
        ViewResolver {
            session,
            channel: channel.into(),
            state: Mutex::new(ViewState::Unresolved),
        }
    }

    /// Snapshot of the current state.
    pub fn current(&self) -> ViewState {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// React to the host viewer showing a new url.
    ///
    /// Resets to `Unresolved`, runs the probe chain, and applies the
    /// result only if no newer `url_changed` call started in the
    /// meantime. Returns the applied state, or `Stale` when this call
    /// was superseded.
    pub async fn url_changed(&self, handle: NativeViewHandle) -> Outcome<ViewState> {
        let guard = StaleGuard::begin(&self.channel);
        self.set_state(ViewState::Unresolved);

        let resolved = self.resolve(handle).await;
        match guard.settle(resolved) {
            Outcome::Fresh(state) => {
                log_info!("Resolved view as {kind}", kind: state.kind());
                self.set_state(state.clone());
                Outcome::Fresh(state)
            }
            Outcome::Stale => {
                log_debug!("Discarding stale resolution on {channel}", channel: self.channel.clone());
                Outcome::Stale
            }
        }
    }

    fn set_state(&self, state: ViewState) {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner) = state;
    }

    /// The ordered, short-circuiting probe chain. First success wins; no
    /// probe is retried.
    async fn resolve(&self, handle: NativeViewHandle) -> ViewState {
        // Probe 1: the predictions compound pattern. A pattern mismatch
        // means "try the next probe"; a matching pattern whose metadata
        // fetch fails is a real failure.
        match PredictionsDataset::parse_url(&handle.url) {
            Ok(parts) => return self.resolve_predictions(handle, parts).await,
            Err(ViewError::NotAPredictionsUrl(_)) => {
                log_debug!("Predictions probe missed for {url}", url: handle.url.double_protocol());
            }
            Err(error) => return Self::failed(error),
        }

        // Probe 2: ask the session what exists at this url.
        match self.session.resolve_datasources(&handle.url).await {
            Ok(datasources) => match datasources.len() {
                0 => {}
                1 => {
                    let mut datasources = datasources;
                    return ViewState::Training(TrainingView {
                        handle,
                        datasource: datasources.remove(0),
                    });
                }
                _ => {
                    return ViewState::RawData(RawDataView {
                        handle,
                        datasources,
                    });
                }
            },
            Err(error) => {
                log_debug!("Datasource probe failed for {url}: {error}",
                    url: handle.url.double_protocol(), error: error.to_string());
            }
        }

        // Probe 3: nothing claimed the url. That is a genuine error.
        Self::failed(ViewError::NoViewForUrl(handle.url.double_protocol()))
    }

    async fn resolve_predictions(
        &self,
        handle: NativeViewHandle,
        parts: PredictionsUrlParts,
    ) -> ViewState {
        let dataset = match PredictionsDataset::from_url(self.session.http(), &handle.url).await {
            Ok(dataset) => dataset,
            Err(error) => return Self::failed(error),
        };
        match parts {
            PredictionsUrlParts::Displayed {
                raw_data,
                generation,
            } => ViewState::Predictions(PredictionsView {
                handle,
                raw_data,
                classifier_generation: Some(generation),
            }),
            PredictionsUrlParts::Materialized { raw_data_url, .. } => {
                // Materialized runs carry no descriptor in their url;
                // reconstruct one from the fetched metadata.
                let spatial_resolution = dataset
                    .dataset()
                    .scales()
                    .first()
                    .map_or([1, 1, 1], |scale| scale.resolution);
                ViewState::Predictions(PredictionsView {
                    handle,
                    raw_data: DataSourceDescriptor {
                        url: raw_data_url.double_protocol(),
                        spatial_resolution,
                    },
                    classifier_generation: None,
                })
            }
        }
    }

    fn failed(error: ViewError) -> ViewState {
        log_error!("View resolution failed: {error}", error: error.to_string());
        ViewState::Failed(Arc::new(error))
    }
}
