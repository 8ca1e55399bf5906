//! Entrada Core - face-recognition access control library
//!
//! This crate contains the access-decision pipeline, the append-only visit
//! ledger and the storage key resolver behind the Entrada re-entry service.
//! The face capture device, the recognition oracle and the object-storage
//! backend are external collaborators consumed through narrow gateway
//! traits; this crate supplies HTTP clients and mocks for each.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use entrada_core::{
//!     AccessDecisionPipeline, Decision, MockCamera, MockRecognition,
//!     PipelineOptions, StagingArea, VisitLedger,
//! };
//!
//! # async fn example() -> entrada_core::Result<()> {
//! let pipeline = AccessDecisionPipeline::new(
//!     Arc::new(MockCamera::with_face(b"jpeg".to_vec())),
//!     Arc::new(MockRecognition::enrolling("face-123")),
//!     Arc::new(VisitLedger::new("visits.json")),
//!     StagingArea::new("temp-images"),
//!     PipelineOptions::default(),
//! );
//!
//! match pipeline.decide().await? {
//!     Decision::Evaluated(evaluation) => {
//!         println!("allowed: {}", evaluation.allowed);
//!     }
//!     Decision::Refused { message } => println!("refused: {message}"),
//! }
//! # Ok(())
//! # }
//! ```

pub mod capture;
pub mod error;
pub mod ledger;
pub mod naming;
pub mod pipeline;
pub mod recognition;
pub mod resolver;
pub mod staging;
pub mod storage;

// Re-export main types for convenience
pub use capture::{CaptureGateway, CaptureOutcome, HttpCaptureClient, HttpCaptureConfig, MockCamera};
pub use error::{EntradaError, Result};
pub use ledger::{VisitGroup, VisitLedger, VisitRecord};
pub use pipeline::{
    AccessDecisionPipeline, AccessEvaluation, CountSemantics, Decision, IdentityResolution,
    PipelineOptions,
};
pub use recognition::{
    FaceMatch, HttpRecognitionClient, HttpRecognitionConfig, MockRecognition, RecognitionGateway,
    SearchOutcome, DEFAULT_MATCH_THRESHOLD,
};
pub use resolver::{StorageKeyResolver, RETRIEVAL_URL_TTL, VISIT_IMAGE_PREFIX};
pub use staging::StagingArea;
pub use storage::{store_from_env, FsObjectStore, MemoryObjectStore, ObjectInfo, ObjectStore};
