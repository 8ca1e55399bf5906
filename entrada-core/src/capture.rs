//! Face capture gateway.
//!
//! The capture device is an external collaborator with a narrow contract:
//! one call yields either a cropped face image or a structured failure.
//! Capture never surfaces as an error; an unavailable camera or a frame
//! without a face are normal negative outcomes the pipeline turns into a
//! denied decision.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tracing::{debug, instrument, warn};

use crate::error::{EntradaError, Result};

/// Outcome of a single capture attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureOutcome {
    /// A cropped face image, JPEG bytes.
    Face(Vec<u8>),
    /// The camera could not be opened or read.
    CameraUnavailable(String),
    /// A frame was acquired but no face was found in it.
    NoFaceDetected(String),
}

/// Supplies one cropped face image per call. Infallible by contract.
#[async_trait]
pub trait CaptureGateway: Send + Sync {
    async fn capture_face(&self) -> CaptureOutcome;
}

/// Configuration for the capture daemon HTTP client.
#[derive(Debug, Clone)]
pub struct HttpCaptureConfig {
    /// Base URL of the capture daemon, e.g. `http://127.0.0.1:8090`.
    pub api_url: String,
    /// Request timeout.
    pub timeout: Duration,
}

impl HttpCaptureConfig {
    pub fn new(api_url: impl Into<String>) -> Self {
        Self {
            api_url: api_url.into(),
            timeout: Duration::from_secs(10),
        }
    }
}

/// Structured failure body returned by the capture daemon.
#[derive(Debug, Deserialize)]
struct CaptureFailureBody {
    #[serde(default)]
    message: String,
}

/// HTTP client for a camera daemon exposing a single capture endpoint.
///
/// `GET {api_url}/capture` returns JPEG bytes on success, 409 with a JSON
/// `{ "message": ... }` body when no face was found in the frame, and 503
/// when the camera itself is down.
pub struct HttpCaptureClient {
    client: Client,
    config: HttpCaptureConfig,
}

impl HttpCaptureClient {
    pub fn new(config: HttpCaptureConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(EntradaError::Http)?;
        Ok(Self { client, config })
    }
}

#[async_trait]
impl CaptureGateway for HttpCaptureClient {
    #[instrument(level = "debug", skip(self), fields(api_url = %self.config.api_url))]
    async fn capture_face(&self) -> CaptureOutcome {
        let url = format!("{}/capture", self.config.api_url);
        let response = match self.client.get(&url).send().await {
            Ok(response) => response,
            Err(e) => {
                warn!(error = %e, "Capture daemon unreachable");
                return CaptureOutcome::CameraUnavailable(
                    "Camera is not available or failed to initialize.".into(),
                );
            }
        };

        match response.status() {
            StatusCode::OK => match response.bytes().await {
                Ok(bytes) if !bytes.is_empty() => {
                    debug!(bytes = bytes.len(), "Face captured");
                    CaptureOutcome::Face(bytes.to_vec())
                }
                Ok(_) => CaptureOutcome::NoFaceDetected("Unable to capture image.".into()),
                Err(e) => {
                    warn!(error = %e, "Failed to read capture body");
                    CaptureOutcome::CameraUnavailable("Unable to capture image.".into())
                }
            },
            StatusCode::CONFLICT => {
                let message = response
                    .json::<CaptureFailureBody>()
                    .await
                    .map(|body| body.message)
                    .ok()
                    .filter(|m| !m.is_empty())
                    .unwrap_or_else(|| "No face detected in image.".to_string());
                CaptureOutcome::NoFaceDetected(message)
            }
            status => {
                warn!(%status, "Capture daemon returned unexpected status");
                CaptureOutcome::CameraUnavailable(
                    "Camera is not available or failed to initialize.".into(),
                )
            }
        }
    }
}

/// Capture gateway returning a fixed outcome.
///
/// Used in tests and as the fallback when no capture daemon is configured,
/// in which case every decision is a camera-unavailable denial.
pub struct MockCamera {
    outcome: std::sync::Mutex<CaptureOutcome>,
}

impl MockCamera {
    pub fn with_face(image: Vec<u8>) -> Self {
        Self {
            outcome: std::sync::Mutex::new(CaptureOutcome::Face(image)),
        }
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self {
            outcome: std::sync::Mutex::new(CaptureOutcome::CameraUnavailable(message.into())),
        }
    }

    pub fn no_face(message: impl Into<String>) -> Self {
        Self {
            outcome: std::sync::Mutex::new(CaptureOutcome::NoFaceDetected(message.into())),
        }
    }

    /// Replace the outcome returned by subsequent captures.
    pub fn set_outcome(&self, outcome: CaptureOutcome) {
        *self.outcome.lock().expect("capture outcome lock poisoned") = outcome;
    }
}

#[async_trait]
impl CaptureGateway for MockCamera {
    async fn capture_face(&self) -> CaptureOutcome {
        self.outcome
            .lock()
            .expect("capture outcome lock poisoned")
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn mock_camera_returns_configured_outcome() {
        let camera = MockCamera::with_face(vec![1, 2, 3]);
        assert_eq!(
            camera.capture_face().await,
            CaptureOutcome::Face(vec![1, 2, 3])
        );

        camera.set_outcome(CaptureOutcome::NoFaceDetected("no face".into()));
        assert_eq!(
            camera.capture_face().await,
            CaptureOutcome::NoFaceDetected("no face".into())
        );
    }
}
