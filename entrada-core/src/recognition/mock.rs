//! Mock recognition gateway for testing.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use super::{FaceMatch, RecognitionGateway, SearchOutcome};
use crate::error::{EntradaError, Result};

enum SearchBehavior {
    Outcome(SearchOutcome),
    Fail(String),
}

enum EnrollBehavior {
    AssignId(String),
    NoIdentity,
    Fail(String),
}

/// Scriptable recognition gateway. Searches and enrollments return fixed
/// behaviors; enrollment calls are counted and their external ids recorded
/// so tests can assert the match-vs-enroll branch.
pub struct MockRecognition {
    search: SearchBehavior,
    enroll: EnrollBehavior,
    enroll_calls: AtomicUsize,
    last_enrolled_external_id: Mutex<Option<String>>,
}

impl MockRecognition {
    /// Every search finds the given identity pair.
    pub fn matching(identity_id: impl Into<String>, external_id: impl Into<String>) -> Self {
        Self::new(
            SearchBehavior::Outcome(SearchOutcome::Match(FaceMatch {
                identity_id: identity_id.into(),
                external_id: external_id.into(),
                similarity: 99.0,
            })),
            EnrollBehavior::AssignId("unused".into()),
        )
    }

    /// Every search misses; enrollment assigns the given identity id.
    pub fn enrolling(identity_id: impl Into<String>) -> Self {
        Self::new(
            SearchBehavior::Outcome(SearchOutcome::NoMatch),
            EnrollBehavior::AssignId(identity_id.into()),
        )
    }

    /// Every search misses; enrollment responds without an identity.
    pub fn enrolling_without_identity() -> Self {
        Self::new(
            SearchBehavior::Outcome(SearchOutcome::NoMatch),
            EnrollBehavior::NoIdentity,
        )
    }

    /// Every search reports the image as rejected by the backend.
    pub fn rejecting(message: impl Into<String>) -> Self {
        Self::new(
            SearchBehavior::Outcome(SearchOutcome::RejectedImage(message.into())),
            EnrollBehavior::AssignId("unused".into()),
        )
    }

    /// Every search fails with a collaborator error.
    pub fn failing(message: impl Into<String>) -> Self {
        let message = message.into();
        Self::new(
            SearchBehavior::Fail(message.clone()),
            EnrollBehavior::Fail(message),
        )
    }

    fn new(search: SearchBehavior, enroll: EnrollBehavior) -> Self {
        Self {
            search,
            enroll,
            enroll_calls: AtomicUsize::new(0),
            last_enrolled_external_id: Mutex::new(None),
        }
    }

    pub fn enroll_calls(&self) -> usize {
        self.enroll_calls.load(Ordering::SeqCst)
    }

    pub fn last_enrolled_external_id(&self) -> Option<String> {
        self.last_enrolled_external_id
            .lock()
            .expect("mock lock poisoned")
            .clone()
    }
}

#[async_trait]
impl RecognitionGateway for MockRecognition {
    async fn search_by_image(
        &self,
        _image: &[u8],
        _threshold: u8,
        _max_matches: u32,
    ) -> Result<SearchOutcome> {
        match &self.search {
            SearchBehavior::Outcome(outcome) => Ok(outcome.clone()),
            SearchBehavior::Fail(message) => Err(EntradaError::Recognition(message.clone())),
        }
    }

    async fn enroll(&self, _image: &[u8], external_id: &str) -> Result<String> {
        self.enroll_calls.fetch_add(1, Ordering::SeqCst);
        *self
            .last_enrolled_external_id
            .lock()
            .expect("mock lock poisoned") = Some(external_id.to_string());

        match &self.enroll {
            EnrollBehavior::AssignId(identity_id) => Ok(identity_id.clone()),
            EnrollBehavior::NoIdentity => {
                Err(EntradaError::EnrollmentIncomplete(external_id.to_string()))
            }
            EnrollBehavior::Fail(message) => Err(EntradaError::Recognition(message.clone())),
        }
    }
}
