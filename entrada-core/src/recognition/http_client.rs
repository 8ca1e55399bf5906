//! HTTP client for a face-collection recognition service.
//!
//! Speaks a small JSON API over two endpoints:
//!
//! - `POST {api_url}/collections/{collection}/search` with a base64 image,
//!   threshold and max-faces cap; returns the candidate matches.
//! - `POST {api_url}/collections/{collection}/faces` with a base64 image and
//!   an external id; enrolls the face and returns its assigned identity.
//!
//! One attempt per call; retries belong to the service, not this client.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use super::{FaceMatch, RecognitionGateway, SearchOutcome};
use crate::error::{EntradaError, Result};

/// Configuration for the recognition service client.
#[derive(Clone)]
pub struct HttpRecognitionConfig {
    /// API base URL.
    pub api_url: String,
    /// Bearer token for authentication.
    pub api_key: String,
    /// Face collection the service searches and enrolls into.
    pub collection_id: String,
    /// Request timeout.
    pub timeout: Duration,
}

impl std::fmt::Debug for HttpRecognitionConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpRecognitionConfig")
            .field("api_url", &self.api_url)
            .field("api_key", &"[REDACTED]")
            .field("collection_id", &self.collection_id)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl HttpRecognitionConfig {
    pub fn new(
        api_url: impl Into<String>,
        api_key: impl Into<String>,
        collection_id: impl Into<String>,
    ) -> Self {
        Self {
            api_url: api_url.into(),
            api_key: api_key.into(),
            collection_id: collection_id.into(),
            timeout: Duration::from_secs(10),
        }
    }
}

#[derive(Debug, Serialize)]
struct SearchRequest<'a> {
    image: &'a str,
    threshold: u8,
    max_faces: u32,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    matches: Vec<MatchEntry>,
}

#[derive(Debug, Deserialize)]
struct MatchEntry {
    face_id: String,
    external_image_id: String,
    #[serde(default)]
    similarity: f32,
}

#[derive(Debug, Serialize)]
struct EnrollRequest<'a> {
    image: &'a str,
    external_image_id: &'a str,
}

#[derive(Debug, Deserialize)]
struct EnrollResponse {
    face_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    code: String,
    #[serde(default)]
    message: String,
}

/// Recognition gateway backed by an HTTP face-collection service.
pub struct HttpRecognitionClient {
    client: Client,
    config: HttpRecognitionConfig,
}

impl HttpRecognitionClient {
    pub fn new(config: HttpRecognitionConfig) -> Result<Self> {
        debug!(collection_id = %config.collection_id, "Creating recognition client");
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(EntradaError::Http)?;
        Ok(Self { client, config })
    }

    fn endpoint(&self, suffix: &str) -> String {
        format!(
            "{}/collections/{}/{}",
            self.config.api_url, self.config.collection_id, suffix
        )
    }
}

#[async_trait]
impl RecognitionGateway for HttpRecognitionClient {
    #[instrument(level = "info", skip(self, image), fields(collection = %self.config.collection_id))]
    async fn search_by_image(
        &self,
        image: &[u8],
        threshold: u8,
        max_matches: u32,
    ) -> Result<SearchOutcome> {
        let start = Instant::now();
        let encoded = BASE64.encode(image);
        let request = SearchRequest {
            image: &encoded,
            threshold,
            max_faces: max_matches,
        };

        let response = self
            .client
            .post(self.endpoint("search"))
            .bearer_auth(&self.config.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::BAD_REQUEST {
            let body: ErrorBody = response.json().await.unwrap_or_else(|_| ErrorBody {
                code: "invalid_image".into(),
                message: String::new(),
            });
            if body.code == "invalid_image" {
                let message = if body.message.is_empty() {
                    "No valid face detected in the submitted image.".to_string()
                } else {
                    body.message
                };
                debug!(latency_ms = start.elapsed().as_millis() as u64, "Image rejected by backend");
                return Ok(SearchOutcome::RejectedImage(message));
            }
            return Err(EntradaError::Recognition(format!(
                "search rejected: {} ({})",
                body.message, body.code
            )));
        }
        if !status.is_success() {
            warn!(%status, "Search returned unexpected status");
            return Err(EntradaError::Recognition(format!(
                "search returned status {status}"
            )));
        }

        let parsed: SearchResponse = response
            .json()
            .await
            .map_err(|e| EntradaError::Recognition(format!("failed to parse search response: {e}")))?;

        let outcome = match parsed.matches.into_iter().next() {
            Some(entry) => SearchOutcome::Match(FaceMatch {
                identity_id: entry.face_id,
                external_id: entry.external_image_id,
                similarity: entry.similarity,
            }),
            None => SearchOutcome::NoMatch,
        };
        info!(
            latency_ms = start.elapsed().as_millis() as u64,
            matched = matches!(outcome, SearchOutcome::Match(_)),
            "Face search completed"
        );
        Ok(outcome)
    }

    #[instrument(level = "info", skip(self, image), fields(collection = %self.config.collection_id, external_id))]
    async fn enroll(&self, image: &[u8], external_id: &str) -> Result<String> {
        let encoded = BASE64.encode(image);
        let request = EnrollRequest {
            image: &encoded,
            external_image_id: external_id,
        };

        let response = self
            .client
            .post(self.endpoint("faces"))
            .bearer_auth(&self.config.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            warn!(%status, "Enrollment returned unexpected status");
            return Err(EntradaError::Recognition(format!(
                "enrollment returned status {status}"
            )));
        }

        let parsed: EnrollResponse = response.json().await.map_err(|e| {
            EntradaError::Recognition(format!("failed to parse enrollment response: {e}"))
        })?;

        match parsed.face_id {
            Some(identity_id) if !identity_id.is_empty() => {
                info!(identity_id = %identity_id, "Face enrolled");
                Ok(identity_id)
            }
            _ => Err(EntradaError::EnrollmentIncomplete(external_id.to_string())),
        }
    }
}
