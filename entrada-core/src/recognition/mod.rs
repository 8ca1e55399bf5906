//! Face recognition gateway.
//!
//! The recognition service is an external oracle: given face image bytes it
//! either returns the best match from a face collection or enrolls a new
//! identity. An image the backend rejects as not containing a usable face is
//! a normal negative outcome ([`SearchOutcome::RejectedImage`]), not an
//! error; any other backend failure is a collaborator failure that
//! propagates to the caller.

mod http_client;
mod mock;

pub use http_client::{HttpRecognitionClient, HttpRecognitionConfig};
pub use mock::MockRecognition;

use async_trait::async_trait;

use crate::error::Result;

/// Match confidence threshold used by the access pipeline.
pub const DEFAULT_MATCH_THRESHOLD: u8 = 85;

/// A successful match from the face collection.
#[derive(Debug, Clone, PartialEq)]
pub struct FaceMatch {
    /// Stable identifier assigned by the recognition service.
    pub identity_id: String,
    /// External label stored at enrollment time, returned verbatim.
    pub external_id: String,
    /// Match confidence in percent.
    pub similarity: f32,
}

/// Outcome of a search against the face collection.
#[derive(Debug, Clone, PartialEq)]
pub enum SearchOutcome {
    /// The best match at or above the requested threshold.
    Match(FaceMatch),
    /// A valid face with no match in the collection.
    NoMatch,
    /// The backend rejected the image as not containing a usable face.
    RejectedImage(String),
}

/// External recognition oracle: search a face collection or enroll into it.
#[async_trait]
pub trait RecognitionGateway: Send + Sync {
    /// Search the collection for the single best match at or above
    /// `threshold` percent confidence, considering at most `max_matches`
    /// candidates.
    async fn search_by_image(
        &self,
        image: &[u8],
        threshold: u8,
        max_matches: u32,
    ) -> Result<SearchOutcome>;

    /// Enroll a new face under `external_id`, returning the identity id the
    /// service assigned. A response without an identity is an
    /// [`crate::EntradaError::EnrollmentIncomplete`] failure, never a
    /// fabricated identity.
    async fn enroll(&self, image: &[u8], external_id: &str) -> Result<String>;
}
