//! Access decision handlers
//!
//! Handles the capture → recognition → ledger decision flow. Negative
//! decisions (camera down, no face, rejected image) are 200 responses with
//! `allowed=false`; only collaborator and ledger failures surface as errors.

use axum::{extract::State, Json};
use serde::Serialize;
use utoipa::ToSchema;

use entrada_core::Decision;

use crate::error::ApiError;
use crate::state::AppState;

/// Response for an access decision
#[derive(Serialize, ToSchema)]
pub struct DecideResponse {
    /// Whether re-entry is granted
    pub allowed: bool,
    /// Explanation for a negative decision reached before identity resolution
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Stable recognition-service identifier for the face
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(example = "8d9c6f2a-1b3e-4c5d-9e8f-0a1b2c3d4e5f")]
    pub identity_id: Option<String>,
    /// External label assigned at enrollment, stable across visits
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(example = "Unknown-550e8400-e29b-41d4-a716-446655440000")]
    pub external_id: Option<String>,
    /// Visits within the recent-visit window
    #[serde(skip_serializing_if = "Option::is_none")]
    pub visits_count: Option<usize>,
    /// Staged capture filename, for later promotion to permanent storage
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(example = "face_20240101_120000_a1b2c3d4.jpg")]
    pub staged_filename: Option<String>,
    /// Whether this capture enrolled a new identity
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_new_enrollment: Option<bool>,
    /// Whether a visit record was appended by this call
    #[serde(skip_serializing_if = "Option::is_none")]
    pub registered: Option<bool>,
}

impl DecideResponse {
    fn from_decision(decision: Decision, registered: Option<bool>) -> Self {
        match decision {
            Decision::Refused { message } => Self {
                allowed: false,
                message: Some(message),
                identity_id: None,
                external_id: None,
                visits_count: None,
                staged_filename: None,
                is_new_enrollment: None,
                registered: None,
            },
            Decision::Evaluated(evaluation) => Self {
                allowed: evaluation.allowed,
                message: None,
                identity_id: Some(evaluation.identity_id),
                external_id: Some(evaluation.external_id),
                visits_count: Some(evaluation.visits_count),
                staged_filename: Some(evaluation.staged_filename),
                is_new_enrollment: Some(evaluation.is_new_enrollment),
                registered,
            },
        }
    }
}

/// Capture a face and decide re-entry without recording a visit
///
/// Runs the full pipeline: exclusive camera capture, staging, recognition
/// (match or enroll), and the 24-hour repeat-visit check. Registration is a
/// separate explicit step (`POST /visits`).
#[utoipa::path(
    post,
    path = "/access/decide",
    tag = "Access",
    responses(
        (status = 200, description = "Decision evaluated (allowed may be false)", body = DecideResponse),
        (status = 500, description = "Ledger or enrollment failure"),
        (status = 503, description = "Recognition or storage collaborator failure")
    )
)]
pub async fn decide_handler(
    State(state): State<AppState>,
) -> Result<Json<DecideResponse>, ApiError> {
    let decision = state.pipeline.decide().await?;
    Ok(Json(DecideResponse::from_decision(decision, None)))
}

/// Capture a face, decide re-entry and record the visit atomically
///
/// Identical to `/access/decide` except that a visit record is appended
/// regardless of the decision, so repeated denied attempts stay auditable.
/// The reported `visits_count` follows the configured count convention.
#[utoipa::path(
    post,
    path = "/access/check-and-register",
    tag = "Access",
    responses(
        (status = 200, description = "Decision evaluated and visit recorded", body = DecideResponse),
        (status = 500, description = "Ledger or enrollment failure"),
        (status = 503, description = "Recognition or storage collaborator failure")
    )
)]
pub async fn check_and_register_handler(
    State(state): State<AppState>,
) -> Result<Json<DecideResponse>, ApiError> {
    let decision = state.pipeline.check_and_register().await?;
    let registered = matches!(decision, Decision::Evaluated(_));
    Ok(Json(DecideResponse::from_decision(
        decision,
        Some(registered),
    )))
}
