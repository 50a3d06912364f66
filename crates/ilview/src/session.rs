//! Client for the remote compute session.
//!
//! The session service materializes derived datasets (it recognizes its
//! own compound url patterns) and answers datasource probes. This client
//! covers session creation with readiness polling and the probe endpoint;
//! the per-channel streaming socket used by higher layers is out of scope
//! here.

use std::time::Duration;

use diagnostics::{log_debug, log_info};
use ilurl::Url;
use serde::{Deserialize, Serialize};

use crate::config::SessionConfig;
use crate::error::{Result, ViewError};

const HTTP_TIMEOUT_SECONDS: u64 = 60;

/// Descriptor for a single datasource as the session reports it.
///
/// This is also the JSON blob that the displayed (training-style)
/// predictions url embeds through an opaque token.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct DataSourceDescriptor {
    /// Double-protocol rendering of the datasource url
    pub url: String,
    /// Resolution of this datasource in nm per voxel
    pub spatial_resolution: [u64; 3],
}

impl DataSourceDescriptor {
    pub fn parsed_url(&self) -> Result<Url> {
        Ok(Url::parse(&self.url)?)
    }
}

#[derive(Deserialize, Debug)]
struct CreateSessionResponse {
    id: String,
    url: String,
    token: String,
}

#[derive(Deserialize, Debug)]
struct SessionStatus {
    ready: bool,
}

#[derive(Deserialize, Debug)]
struct DataSourcesResponse {
    datasources: Vec<DataSourceDescriptor>,
}

/// A running remote compute session.
pub struct Session {
    http: reqwest::Client,
    id: String,
    base: Url,
    token: String,
}

impl Session {
    /// Create a session and poll until it is ready.
    ///
    /// Polls at the configured fixed interval, decrementing the remaining
    /// time budget, and gives up with [`ViewError::SessionTimeout`] once
    /// the budget is exhausted.
    pub async fn create(config: &SessionConfig) -> Result<Session> {
        let server = Url::parse(&config.server_url)?;
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(HTTP_TIMEOUT_SECONDS))
            .build()?;

        let create_url = server.join_path("api/session");
        let created: CreateSessionResponse = http
            .post(create_url.schemeless())
            .json(&serde_json::json!({
                "session_duration_minutes": config.session_duration_minutes,
            }))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        log_info!("Session {id} allocated, waiting for readiness", id: created.id.clone());

        let status_url = server.join_path(&format!("api/session/{}", created.id));
        let interval = Duration::from_millis(config.poll_interval_ms);
        let mut remaining_ms = config.timeout_budget_ms;
        loop {
            let status: SessionStatus = http
                .get(status_url.schemeless())
                .bearer_auth(&created.token)
                .send()
                .await?
                .error_for_status()?
                .json()
                .await?;
            if status.ready {
                break;
            }
            if remaining_ms < config.poll_interval_ms {
                return Err(ViewError::SessionTimeout {
                    budget_ms: config.timeout_budget_ms,
                });
            }
            remaining_ms -= config.poll_interval_ms;
            tokio::time::sleep(interval).await;
        }

        let base = Url::parse(&created.url)?;
        log_info!("Session {id} ready at {url}", id: created.id.clone(), url: base.schemeless());
        Ok(Session {
            http,
            id: created.id,
            base,
            token: created.token,
        })
    }

    /// Attach to an already-running session without polling.
    pub fn attach(base: Url, token: impl Into<String>) -> Result<Session> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(HTTP_TIMEOUT_SECONDS))
            .build()?;
        Ok(Session {
            http,
            id: base.path().name().to_string(),
            base,
            token: token.into(),
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// The session's own base url; compound dataset urls live under it.
    pub fn base_url(&self) -> &Url {
        &self.base
    }

    pub fn http(&self) -> &reqwest::Client {
        &self.http
    }

    /// Ask the session which datasources exist at `url`.
    ///
    /// Returns zero, one or many descriptors; interpreting the count is
    /// the caller's business.
    pub async fn resolve_datasources(&self, url: &Url) -> Result<Vec<DataSourceDescriptor>> {
        let probe_url = self.base.join_path("datasources");
        log_debug!("Probing datasources for {url}", url: url.double_protocol());
        let response: DataSourcesResponse = self
            .http
            .get(probe_url.schemeless())
            .query(&[("url", url.double_protocol())])
            .bearer_auth(&self.token)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(response.datasources)
    }
}
