//! Access decision pipeline.
//!
//! Orchestrates one camera frame into an allow/deny decision: capture under
//! an exclusive camera scope, resolve an identity against the recognition
//! oracle (match or fresh enrollment), stage the image for later promotion,
//! then consult the visit ledger's recent-visit window.
//!
//! Negative outcomes (camera down, no face, image rejected by the
//! recognition backend) are normal [`Decision::Refused`] results, never
//! errors. Collaborator failures always propagate to the caller.

use std::sync::Arc;

use chrono::{Duration, Utc};
use tokio::sync::Mutex;
use tracing::{debug, info, instrument};

use crate::capture::{CaptureGateway, CaptureOutcome};
use crate::error::Result;
use crate::ledger::{VisitLedger, VisitRecord};
use crate::naming;
use crate::recognition::{RecognitionGateway, SearchOutcome, DEFAULT_MATCH_THRESHOLD};
use crate::staging::StagingArea;

/// At most one candidate match per search.
const MAX_MATCHES: u32 = 1;

/// Which recent-visit count the atomic check-and-register flow reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountSemantics {
    /// The count as observed before the new record was appended.
    BeforeRegister,
    /// The count including the record appended by this call.
    AfterRegister,
}

/// Pipeline tuning knobs.
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    /// Recognition match threshold in percent.
    pub match_threshold: u8,
    /// Lookback window for the repeat-visit check.
    pub recent_window: Duration,
    /// Count convention for [`AccessDecisionPipeline::check_and_register`].
    pub count_semantics: CountSemantics,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            match_threshold: DEFAULT_MATCH_THRESHOLD,
            recent_window: Duration::hours(24),
            count_semantics: CountSemantics::AfterRegister,
        }
    }
}

/// Transient result of one recognition attempt. Never persisted; it is the
/// input used to query or append to the ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityResolution {
    pub identity_id: String,
    pub external_id: String,
    pub is_new_enrollment: bool,
}

/// A fully evaluated decision with a resolved identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessEvaluation {
    pub allowed: bool,
    pub identity_id: String,
    pub external_id: String,
    /// Recent visits within the lookback window; see [`CountSemantics`]
    /// for the register-and-check flow.
    pub visits_count: usize,
    /// Staged image filename, returned for later promotion.
    pub staged_filename: String,
    pub is_new_enrollment: bool,
}

/// Result of one pipeline run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// Negative decision reached before an identity could be resolved.
    Refused { message: String },
    /// Identity resolved and the ledger consulted.
    Evaluated(AccessEvaluation),
}

enum IdentityOutcome {
    Resolved(IdentityResolution),
    Rejected(String),
}

/// Turns one camera frame into an access decision against a shared ledger.
pub struct AccessDecisionPipeline {
    capture: Arc<dyn CaptureGateway>,
    /// The physical camera is a single exclusive resource; only one decide
    /// call may be actively capturing. The guard covers the capture step
    /// only and is released on every exit path.
    camera_lock: Mutex<()>,
    recognition: Arc<dyn RecognitionGateway>,
    ledger: Arc<VisitLedger>,
    staging: StagingArea,
    opts: PipelineOptions,
}

impl AccessDecisionPipeline {
    pub fn new(
        capture: Arc<dyn CaptureGateway>,
        recognition: Arc<dyn RecognitionGateway>,
        ledger: Arc<VisitLedger>,
        staging: StagingArea,
        opts: PipelineOptions,
    ) -> Self {
        Self {
            capture,
            camera_lock: Mutex::new(()),
            recognition,
            ledger,
            staging,
            opts,
        }
    }

    pub fn ledger(&self) -> &Arc<VisitLedger> {
        &self.ledger
    }

    pub fn staging(&self) -> &StagingArea {
        &self.staging
    }

    /// Evaluate one capture without recording a visit. Registration is a
    /// separate explicit step.
    #[instrument(level = "info", skip(self))]
    pub async fn decide(&self) -> Result<Decision> {
        self.evaluate().await
    }

    /// Evaluate one capture and append a visit record regardless of the
    /// decision, so denied attempts stay auditable. The reported count
    /// follows the configured [`CountSemantics`].
    #[instrument(level = "info", skip(self))]
    pub async fn check_and_register(&self) -> Result<Decision> {
        let decision = self.evaluate().await?;
        let mut evaluation = match decision {
            Decision::Refused { .. } => return Ok(decision),
            Decision::Evaluated(evaluation) => evaluation,
        };

        self.ledger
            .append(VisitRecord::new(
                evaluation.identity_id.clone(),
                evaluation.external_id.clone(),
                Utc::now(),
            ))
            .await?;

        if self.opts.count_semantics == CountSemantics::AfterRegister {
            // The appended record's timestamp is `now`, always inside the
            // window, so the post-append count is the snapshot count + 1.
            evaluation.visits_count += 1;
        }
        info!(
            identity_id = %evaluation.identity_id,
            allowed = evaluation.allowed,
            "Visit registered with decision"
        );
        Ok(Decision::Evaluated(evaluation))
    }

    /// Append a visit for an already-resolved identity at the current time.
    pub async fn register_visit(
        &self,
        identity_id: impl Into<String>,
        external_id: impl Into<String>,
    ) -> Result<VisitRecord> {
        let record = VisitRecord::new(identity_id, external_id, Utc::now());
        self.ledger.append(record.clone()).await?;
        Ok(record)
    }

    async fn evaluate(&self) -> Result<Decision> {
        let image = {
            let _camera = self.camera_lock.lock().await;
            match self.capture.capture_face().await {
                CaptureOutcome::Face(image) => image,
                CaptureOutcome::CameraUnavailable(message)
                | CaptureOutcome::NoFaceDetected(message) => {
                    debug!(%message, "Capture refused");
                    return Ok(Decision::Refused { message });
                }
            }
        };

        let resolution = match self.resolve_identity(&image).await? {
            IdentityOutcome::Resolved(resolution) => resolution,
            IdentityOutcome::Rejected(message) => {
                debug!(%message, "Recognition rejected the image");
                return Ok(Decision::Refused { message });
            }
        };

        // Staged only once an identity is resolved; rejected frames leave
        // nothing behind in the staging directory.
        let staged_filename = self.staging.stage(&image).await?;

        let since = Utc::now() - self.opts.recent_window;
        let visits_count = self
            .ledger
            .count_since(&resolution.identity_id, &resolution.external_id, since)
            .await?;
        let allowed = visits_count == 0;

        info!(
            identity_id = %resolution.identity_id,
            external_id = %resolution.external_id,
            visits_count,
            allowed,
            new_enrollment = resolution.is_new_enrollment,
            "Access decision evaluated"
        );

        Ok(Decision::Evaluated(AccessEvaluation {
            allowed,
            identity_id: resolution.identity_id,
            external_id: resolution.external_id,
            visits_count,
            staged_filename,
            is_new_enrollment: resolution.is_new_enrollment,
        }))
    }

    /// Map image bytes to an identity: adopt the match verbatim, or enroll
    /// under a fresh `Unknown-` external id.
    async fn resolve_identity(&self, image: &[u8]) -> Result<IdentityOutcome> {
        let outcome = self
            .recognition
            .search_by_image(image, self.opts.match_threshold, MAX_MATCHES)
            .await?;

        match outcome {
            SearchOutcome::Match(found) => Ok(IdentityOutcome::Resolved(IdentityResolution {
                identity_id: found.identity_id,
                external_id: found.external_id,
                is_new_enrollment: false,
            })),
            SearchOutcome::NoMatch => {
                let external_id = naming::unknown_external_id();
                let identity_id = self.recognition.enroll(image, &external_id).await?;
                Ok(IdentityOutcome::Resolved(IdentityResolution {
                    identity_id,
                    external_id,
                    is_new_enrollment: true,
                }))
            }
            SearchOutcome::RejectedImage(message) => Ok(IdentityOutcome::Rejected(message)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::MockCamera;
    use crate::error::EntradaError;
    use crate::recognition::MockRecognition;
    use tempfile::TempDir;

    struct Fixture {
        _dir: TempDir,
        recognition: Arc<MockRecognition>,
        pipeline: AccessDecisionPipeline,
    }

    fn fixture(camera: MockCamera, recognition: MockRecognition) -> Fixture {
        fixture_with(camera, recognition, PipelineOptions::default())
    }

    fn fixture_with(
        camera: MockCamera,
        recognition: MockRecognition,
        opts: PipelineOptions,
    ) -> Fixture {
        let dir = TempDir::new().unwrap();
        let ledger = Arc::new(VisitLedger::new(dir.path().join("visits.json")));
        let staging = StagingArea::new(dir.path().join("temp-images"));
        let recognition = Arc::new(recognition);
        let pipeline = AccessDecisionPipeline::new(
            Arc::new(camera),
            recognition.clone(),
            ledger,
            staging,
            opts,
        );
        Fixture {
            _dir: dir,
            recognition,
            pipeline,
        }
    }

    fn face() -> MockCamera {
        MockCamera::with_face(b"jpeg".to_vec())
    }

    /// Files currently in the staging directory; zero when the directory was
    /// never created.
    fn staged_file_count(fx: &Fixture) -> usize {
        match std::fs::read_dir(fx.pipeline.staging().dir()) {
            Ok(entries) => entries.count(),
            Err(_) => 0,
        }
    }

    #[tokio::test]
    async fn empty_ledger_and_no_match_enrolls_and_allows() {
        let fx = fixture(face(), MockRecognition::enrolling("face-123"));

        let decision = fx.pipeline.decide().await.unwrap();
        let evaluation = match decision {
            Decision::Evaluated(e) => e,
            other => panic!("unexpected decision: {other:?}"),
        };

        assert!(evaluation.allowed);
        assert_eq!(evaluation.visits_count, 0);
        assert_eq!(evaluation.identity_id, "face-123");
        assert!(evaluation.external_id.starts_with("Unknown-"));
        assert!(evaluation.is_new_enrollment);
        assert_eq!(fx.recognition.enroll_calls(), 1);
        assert_eq!(
            fx.recognition.last_enrolled_external_id().unwrap(),
            evaluation.external_id
        );

        // The staged image is on disk, awaiting promotion.
        assert!(fx
            .pipeline
            .staging()
            .contains(&evaluation.staged_filename)
            .await
            .unwrap());

        // decide() never appends.
        assert!(fx.pipeline.ledger().load_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn recent_visit_within_window_denies() {
        let fx = fixture(face(), MockRecognition::matching("f1", "Unknown-abc"));
        fx.pipeline
            .ledger()
            .append(VisitRecord::new(
                "f1",
                "Unknown-abc",
                Utc::now() - Duration::hours(1),
            ))
            .await
            .unwrap();

        let decision = fx.pipeline.decide().await.unwrap();
        let evaluation = match decision {
            Decision::Evaluated(e) => e,
            other => panic!("unexpected decision: {other:?}"),
        };

        assert!(!evaluation.allowed);
        assert_eq!(evaluation.visits_count, 1);
        // The matched external id is adopted verbatim, never regenerated.
        assert_eq!(evaluation.external_id, "Unknown-abc");
        assert!(!evaluation.is_new_enrollment);
        assert_eq!(fx.recognition.enroll_calls(), 0);
    }

    #[tokio::test]
    async fn visit_outside_window_allows() {
        let fx = fixture(face(), MockRecognition::matching("f1", "Unknown-abc"));
        fx.pipeline
            .ledger()
            .append(VisitRecord::new(
                "f1",
                "Unknown-abc",
                Utc::now() - Duration::hours(25),
            ))
            .await
            .unwrap();

        match fx.pipeline.decide().await.unwrap() {
            Decision::Evaluated(e) => {
                assert!(e.allowed);
                assert_eq!(e.visits_count, 0);
            }
            other => panic!("unexpected decision: {other:?}"),
        }
    }

    #[tokio::test]
    async fn camera_unavailable_is_a_refusal_not_an_error() {
        let fx = fixture(
            MockCamera::unavailable("Camera is not available or failed to initialize."),
            MockRecognition::matching("f1", "e1"),
        );

        match fx.pipeline.decide().await.unwrap() {
            Decision::Refused { message } => {
                assert!(message.contains("not available"));
            }
            other => panic!("unexpected decision: {other:?}"),
        }
    }

    #[tokio::test]
    async fn no_face_is_a_refusal() {
        let fx = fixture(
            MockCamera::no_face("No face detected in image."),
            MockRecognition::matching("f1", "e1"),
        );

        assert!(matches!(
            fx.pipeline.decide().await.unwrap(),
            Decision::Refused { .. }
        ));
    }

    #[tokio::test]
    async fn rejected_image_is_a_refusal() {
        let fx = fixture(face(), MockRecognition::rejecting("No valid face detected."));

        match fx.pipeline.decide().await.unwrap() {
            Decision::Refused { message } => assert_eq!(message, "No valid face detected."),
            other => panic!("unexpected decision: {other:?}"),
        }
        assert_eq!(staged_file_count(&fx), 0);
    }

    #[tokio::test]
    async fn repeated_rejected_frames_stage_nothing() {
        let fx = fixture(face(), MockRecognition::rejecting("No valid face detected."));

        for _ in 0..3 {
            assert!(matches!(
                fx.pipeline.decide().await.unwrap(),
                Decision::Refused { .. }
            ));
        }
        assert_eq!(staged_file_count(&fx), 0);
    }

    #[tokio::test]
    async fn recognition_failure_propagates_as_error() {
        let fx = fixture(face(), MockRecognition::failing("backend down"));

        let err = fx.pipeline.decide().await.unwrap_err();
        assert!(matches!(err, EntradaError::Recognition(_)));
        assert_eq!(staged_file_count(&fx), 0);
    }

    #[tokio::test]
    async fn enrollment_without_identity_is_a_collaborator_failure() {
        let fx = fixture(face(), MockRecognition::enrolling_without_identity());

        let err = fx.pipeline.decide().await.unwrap_err();
        assert!(matches!(err, EntradaError::EnrollmentIncomplete(_)));
    }

    #[tokio::test]
    async fn check_and_register_appends_even_when_denied() {
        let fx = fixture(face(), MockRecognition::matching("f1", "Unknown-abc"));
        fx.pipeline
            .ledger()
            .append(VisitRecord::new(
                "f1",
                "Unknown-abc",
                Utc::now() - Duration::hours(1),
            ))
            .await
            .unwrap();

        let decision = fx.pipeline.check_and_register().await.unwrap();
        match decision {
            Decision::Evaluated(e) => {
                assert!(!e.allowed);
                // Default semantics count after the append.
                assert_eq!(e.visits_count, 2);
            }
            other => panic!("unexpected decision: {other:?}"),
        }
        assert_eq!(fx.pipeline.ledger().load_all().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn check_and_register_before_semantics_reports_snapshot_count() {
        let opts = PipelineOptions {
            count_semantics: CountSemantics::BeforeRegister,
            ..PipelineOptions::default()
        };
        let fx = fixture_with(face(), MockRecognition::matching("f1", "Unknown-abc"), opts);

        let decision = fx.pipeline.check_and_register().await.unwrap();
        match decision {
            Decision::Evaluated(e) => {
                assert!(e.allowed);
                assert_eq!(e.visits_count, 0);
            }
            other => panic!("unexpected decision: {other:?}"),
        }
        assert_eq!(fx.pipeline.ledger().load_all().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn check_and_register_refusal_appends_nothing() {
        let fx = fixture(
            MockCamera::no_face("No face detected in image."),
            MockRecognition::matching("f1", "e1"),
        );

        assert!(matches!(
            fx.pipeline.check_and_register().await.unwrap(),
            Decision::Refused { .. }
        ));
        assert!(fx.pipeline.ledger().load_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn register_visit_appends_at_current_time() {
        let fx = fixture(face(), MockRecognition::matching("f1", "e1"));
        let before = Utc::now();
        let record = fx.pipeline.register_visit("f9", "Unknown-x").await.unwrap();
        assert!(record.timestamp >= before);

        let all = fx.pipeline.ledger().load_all().await.unwrap();
        assert_eq!(all, vec![record]);
    }

    #[tokio::test]
    async fn concurrent_decides_stage_distinct_files() {
        let fx = fixture(face(), MockRecognition::enrolling("f1"));
        let pipeline = Arc::new(fx.pipeline);

        let mut filenames = Vec::new();
        let mut handles = Vec::new();
        for _ in 0..4 {
            let pipeline = pipeline.clone();
            handles.push(tokio::spawn(async move { pipeline.decide().await }));
        }
        for handle in handles {
            match handle.await.unwrap().unwrap() {
                Decision::Evaluated(e) => filenames.push(e.staged_filename),
                other => panic!("unexpected decision: {other:?}"),
            }
        }
        filenames.sort();
        filenames.dedup();
        assert_eq!(filenames.len(), 4);
    }
}
