//! Application state module
//!
//! Defines shared state accessible across all request handlers.

use std::sync::Arc;

use entrada_core::{
    AccessDecisionPipeline, CaptureGateway, HttpCaptureClient, HttpCaptureConfig,
    HttpRecognitionClient, HttpRecognitionConfig, MockCamera, MockRecognition, PipelineOptions,
    RecognitionGateway, StagingArea, StorageKeyResolver, VisitLedger,
};

use crate::config::Config;

/// Application state containing shared resources.
#[derive(Clone)]
pub struct AppState {
    /// Access decision pipeline orchestrating capture, recognition and ledger
    pub pipeline: Arc<AccessDecisionPipeline>,
    /// Visit ledger, shared with the pipeline
    pub ledger: Arc<VisitLedger>,
    /// Storage key resolver over the configured object store
    pub resolver: Arc<StorageKeyResolver>,
    /// Staging area for captured images, shared with the pipeline
    pub staging: StagingArea,
}

impl AppState {
    pub fn new(
        pipeline: Arc<AccessDecisionPipeline>,
        ledger: Arc<VisitLedger>,
        resolver: Arc<StorageKeyResolver>,
        staging: StagingArea,
    ) -> Self {
        Self {
            pipeline,
            ledger,
            resolver,
            staging,
        }
    }

    /// Build the state from configuration, wiring collaborator clients.
    ///
    /// Unconfigured collaborators degrade rather than fail: without a
    /// capture daemon every decision is a camera-unavailable denial, and
    /// without a recognition service the mock gateway is used (development
    /// only, logged loudly).
    pub fn from_config(config: &Config) -> entrada_core::Result<Self> {
        let capture: Arc<dyn CaptureGateway> = match &config.capture_api_url {
            Some(url) => {
                tracing::info!(api_url = %url, "Using capture daemon");
                Arc::new(HttpCaptureClient::new(HttpCaptureConfig::new(url.clone()))?)
            }
            None => {
                tracing::warn!("CAPTURE_API_URL not set - camera will report unavailable");
                Arc::new(MockCamera::unavailable(
                    "Camera is not available or failed to initialize.",
                ))
            }
        };

        let recognition: Arc<dyn RecognitionGateway> =
            match (&config.recognition_api_url, &config.recognition_api_key) {
                (Some(url), Some(key)) => {
                    tracing::info!(api_url = %url, collection = %config.recognition_collection, "Using recognition service");
                    Arc::new(HttpRecognitionClient::new(HttpRecognitionConfig::new(
                        url.clone(),
                        key.clone(),
                        config.recognition_collection.clone(),
                    ))?)
                }
                _ => {
                    tracing::warn!(
                        "RECOGNITION_API_URL/RECOGNITION_API_KEY not set - using mock recognition (development only!)"
                    );
                    Arc::new(MockRecognition::enrolling("mock-identity"))
                }
            };

        let ledger = Arc::new(VisitLedger::new(config.ledger_path.clone()));
        let staging = StagingArea::new(config.staging_dir.clone());
        let resolver = Arc::new(StorageKeyResolver::new(entrada_core::store_from_env()));

        let opts = PipelineOptions {
            match_threshold: config.match_threshold,
            recent_window: chrono::Duration::hours(config.recent_window_hours),
            count_semantics: config.count_semantics,
        };

        let pipeline = Arc::new(AccessDecisionPipeline::new(
            capture,
            recognition,
            ledger.clone(),
            staging.clone(),
            opts,
        ));

        Ok(Self::new(pipeline, ledger, resolver, staging))
    }
}
