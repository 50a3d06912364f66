use std::sync::Arc;

use anyhow::Result;
use ilurl::{Url, VirtualTag, token};
use ilview::{
    MultiscaleDataset, NativeViewHandle, Outcome, PredictionsDataset, PredictionsUrlParts,
    Session, SessionConfig, StrippedDataset, ViewError, ViewResolver, ViewState,
};

use mock_server::MockSessionServer;

fn test_config(base_url: &str) -> SessionConfig {
    SessionConfig {
        server_url: base_url.to_string(),
        session_duration_minutes: 5,
        poll_interval_ms: 10,
        timeout_budget_ms: 1000,
    }
}

async fn create_test_session(base_url: &str) -> Result<Session> {
    Ok(Session::create(&test_config(base_url)).await?)
}

fn handle(name: &str, url: &Url) -> NativeViewHandle {
    NativeViewHandle {
        name: name.to_string(),
        url: url.clone(),
    }
}

/// Session creation polls readiness and lands on the session's own url
#[tokio::test]
async fn test_create_session() -> Result<()> {
    let server = MockSessionServer::start().await;
    let session = create_test_session(&server.base_url()).await?;

    assert_eq!(session.id(), "sess1");
    assert!(session.base_url().schemeless().ends_with("/session/sess1"));

    server.stop().await;
    Ok(())
}

/// A session that never becomes ready exhausts the polling budget
#[tokio::test]
async fn test_create_session_times_out() {
    let server = MockSessionServer::start_never_ready().await;
    let mut config = test_config(&server.base_url());
    config.poll_interval_ms = 20;
    config.timeout_budget_ms = 50;

    let result = Session::create(&config).await;
    assert!(matches!(result, Err(ViewError::SessionTimeout { budget_ms: 50 })));

    server.stop().await;
}

/// Attaching to a running session skips creation and polling
#[tokio::test]
async fn test_attach_to_running_session() -> Result<()> {
    let server = MockSessionServer::start().await;
    let base = Url::parse(&format!("{}/session/sess1", server.base_url()))?;
    let session = Session::attach(base, "test-token")?;

    let url = Url::parse(&format!("{}/data/cortex", server.base_url()))?;
    let datasources = session.resolve_datasources(&url).await?;
    assert_eq!(datasources.len(), 1);

    server.stop().await;
    Ok(())
}

/// Fetching a dataset normalizes its url and parses the info document
#[tokio::test]
async fn test_fetch_multiscale_dataset() -> Result<()> {
    let server = MockSessionServer::start().await;
    let http = reqwest::Client::new();

    let url = Url::parse(&format!("{}/data/cortex", server.base_url()))?;
    let dataset = MultiscaleDataset::fetch(&http, &url).await?;

    assert_eq!(dataset.url().tag(), Some(VirtualTag::Precomputed));
    assert_eq!(dataset.scales().len(), 2);
    assert!(dataset.find_scale([50, 50, 50]).is_some());
    assert!(dataset.find_scale([50, 50, 51]).is_none());

    server.stop().await;
    Ok(())
}

#[tokio::test]
async fn test_fetch_rejects_non_http_transport() -> Result<()> {
    let http = reqwest::Client::new();
    let url = Url::parse("ws://example.com/data/cortex")?;
    let result = MultiscaleDataset::fetch(&http, &url).await;
    assert!(matches!(result, Err(ViewError::UnsupportedTransport { .. })));
    Ok(())
}

#[tokio::test]
async fn test_fetch_missing_dataset() -> Result<()> {
    let server = MockSessionServer::start().await;
    let http = reqwest::Client::new();

    let url = Url::parse(&format!("{}/data/nothere", server.base_url()))?;
    let result = MultiscaleDataset::fetch(&http, &url).await;
    assert!(matches!(result, Err(ViewError::MetadataFetchFailed { .. })));

    server.stop().await;
    Ok(())
}

#[tokio::test]
async fn test_fetch_garbage_metadata() -> Result<()> {
    let server = MockSessionServer::start().await;
    let http = reqwest::Client::new();

    let url = Url::parse(&format!("{}/data/garbage", server.base_url()))?;
    let result = MultiscaleDataset::fetch(&http, &url).await;
    assert!(matches!(result, Err(ViewError::MalformedMetadata { .. })));

    server.stop().await;
    Ok(())
}

/// Materialize-then-parse recovers the original url and resolution
#[tokio::test]
async fn test_stripped_materialize_round_trip() -> Result<()> {
    let server = MockSessionServer::start().await;
    let session = create_test_session(&server.base_url()).await?;
    let http = reqwest::Client::new();

    let original_url = Url::parse(&format!("{}/data/cortex", server.base_url()))?;
    let original = MultiscaleDataset::fetch(&http, &original_url).await?;

    let stripped = StrippedDataset::materialize(&original, [50, 50, 50], &session).await?;
    assert_eq!(stripped.scale().resolution, [50, 50, 50]);
    assert_eq!(stripped.dataset().scales().len(), 1);

    let parts = StrippedDataset::parse_url(stripped.url())?;
    assert_eq!(parts.original_url, *original.url());
    assert_eq!(parts.resolution, [50, 50, 50]);

    server.stop().await;
    Ok(())
}

/// A strip result that keeps more than one scale violates the contract
#[tokio::test]
async fn test_stripped_materialize_rejects_bad_strip() -> Result<()> {
    let server = MockSessionServer::start().await;
    let session = create_test_session(&server.base_url()).await?;
    let http = reqwest::Client::new();

    let original_url = Url::parse(&format!("{}/data/cortex", server.base_url()))?;
    let original = MultiscaleDataset::fetch(&http, &original_url).await?;

    // The mock returns two scales for this resolution
    let result = StrippedDataset::materialize(&original, [13, 13, 13], &session).await;
    assert!(matches!(result, Err(ViewError::StripResultInvalid { .. })));

    server.stop().await;
    Ok(())
}

/// Rebuilding from the url alone re-fetches both metadata documents
#[tokio::test]
async fn test_stripped_from_url() -> Result<()> {
    let server = MockSessionServer::start().await;
    let session = create_test_session(&server.base_url()).await?;
    let http = reqwest::Client::new();

    let original_url = Url::parse(&format!("{}/data/cortex", server.base_url()))?;
    let original = MultiscaleDataset::fetch(&http, &original_url).await?;
    let materialized = StrippedDataset::materialize(&original, [10, 10, 10], &session).await?;

    let rebuilt = StrippedDataset::from_url(&http, materialized.url()).await?;
    assert_eq!(rebuilt.original().url(), original.url());
    assert_eq!(rebuilt.original().scales().len(), 2);
    assert_eq!(rebuilt.scale().resolution, [10, 10, 10]);

    server.stop().await;
    Ok(())
}

/// Create-then-parse recovers the raw-data url from a predictions address
#[tokio::test]
async fn test_predictions_create_and_parse() -> Result<()> {
    let server = MockSessionServer::start().await;
    let session = create_test_session(&server.base_url()).await?;
    let http = reqwest::Client::new();

    let raw_url = Url::parse(&format!("{}/data/cortex", server.base_url()))?;
    let raw_data = MultiscaleDataset::fetch(&http, &raw_url).await?;

    let predictions = PredictionsDataset::create_for(&raw_data, &session).await?;
    let parts = PredictionsDataset::parse_url(predictions.url())?;
    assert_eq!(parts.raw_data_url()?, *raw_data.url());
    assert!(matches!(
        parts,
        PredictionsUrlParts::Materialized { run_id: Some(_), .. }
    ));

    server.stop().await;
    Ok(())
}

/// The predictions pattern strictly dominates the datasource probe
#[tokio::test]
async fn test_resolver_predictions_dominates() -> Result<()> {
    let server = MockSessionServer::start().await;
    let session = Arc::new(create_test_session(&server.base_url()).await?);
    let resolver = ViewResolver::new(session.clone(), "test-precedence");

    // The mock session would report exactly one datasource at this url
    // too; the predictions probe must still win.
    let descriptor = serde_json::json!({
        "url": "precomputed://https://example.com/data/cortex",
        "spatial_resolution": [50, 50, 50],
    });
    let displayed = session.base_url().join_path(&format!(
        "predictions/raw_data={}/generation=3",
        token::encode(descriptor.to_string().as_bytes())
    ));

    let outcome = resolver.url_changed(handle("training", &displayed)).await;
    let Outcome::Fresh(ViewState::Predictions(view)) = outcome else {
        panic!("expected fresh predictions view, got {:?}", outcome);
    };
    assert_eq!(view.classifier_generation, Some(3));
    assert_eq!(view.raw_data.spatial_resolution, [50, 50, 50]);

    server.stop().await;
    Ok(())
}

/// Exactly one datasource at a url degrades the view to training
#[tokio::test]
async fn test_resolver_training_view() -> Result<()> {
    let server = MockSessionServer::start().await;
    let session = Arc::new(create_test_session(&server.base_url()).await?);
    let resolver = ViewResolver::new(session, "test-training");

    let url = Url::parse(&format!("{}/data/cortex", server.base_url()))?;
    let outcome = resolver.url_changed(handle("cortex", &url)).await;
    let Outcome::Fresh(ViewState::Training(view)) = outcome else {
        panic!("expected fresh training view, got {:?}", outcome);
    };
    assert_eq!(view.handle.name, "cortex");

    server.stop().await;
    Ok(())
}

/// More than one datasource at a url is a raw-data view
#[tokio::test]
async fn test_resolver_raw_data_view() -> Result<()> {
    let server = MockSessionServer::start().await;
    let session = Arc::new(create_test_session(&server.base_url()).await?);
    let resolver = ViewResolver::new(session, "test-rawdata");

    let url = Url::parse(&format!("{}/data/multi-volume", server.base_url()))?;
    let outcome = resolver.url_changed(handle("multi", &url)).await;
    let Outcome::Fresh(ViewState::RawData(view)) = outcome else {
        panic!("expected fresh raw-data view, got {:?}", outcome);
    };
    assert_eq!(view.datasources.len(), 2);

    server.stop().await;
    Ok(())
}

/// A url nothing claims resolves to a surfaced failure, not an empty view
#[tokio::test]
async fn test_resolver_failed_view() -> Result<()> {
    let server = MockSessionServer::start().await;
    let session = Arc::new(create_test_session(&server.base_url()).await?);
    let resolver = ViewResolver::new(session, "test-failed");

    let url = Url::parse(&format!("{}/data/empty-volume", server.base_url()))?;
    let outcome = resolver.url_changed(handle("empty", &url)).await;
    let Outcome::Fresh(ViewState::Failed(error)) = outcome else {
        panic!("expected fresh failed state, got {:?}", outcome);
    };
    assert!(matches!(*error, ViewError::NoViewForUrl(_)));
    assert!(matches!(resolver.current(), ViewState::Failed(_)));

    server.stop().await;
    Ok(())
}

/// A slow earlier resolution must not overwrite a faster later one
#[tokio::test]
async fn test_resolver_stale_race() -> Result<()> {
    let server = MockSessionServer::start().await;
    let session = Arc::new(create_test_session(&server.base_url()).await?);
    let resolver = ViewResolver::new(session, "test-stale-race");

    // The mock delays the datasource answer for "slow" urls, so the
    // first-started resolution finishes last.
    let slow_url = Url::parse(&format!("{}/data/slow-volume", server.base_url()))?;
    let fast_url = Url::parse(&format!("{}/data/cortex", server.base_url()))?;

    let (slow_outcome, fast_outcome) = tokio::join!(
        resolver.url_changed(handle("slow", &slow_url)),
        resolver.url_changed(handle("fast", &fast_url)),
    );

    assert!(slow_outcome.is_stale());
    let Outcome::Fresh(ViewState::Training(view)) = fast_outcome else {
        panic!("expected fresh training view, got {:?}", fast_outcome);
    };
    assert_eq!(view.handle.name, "fast");

    // The applied state is the later resolution's
    let ViewState::Training(current) = resolver.current() else {
        panic!("expected training state to stick");
    };
    assert_eq!(current.handle.name, "fast");

    server.stop().await;
    Ok(())
}
