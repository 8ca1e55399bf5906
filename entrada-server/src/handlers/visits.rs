//! Visit ledger handlers
//!
//! Explicit registration plus the read and bulk-removal surface over the
//! append-only visit ledger.

use axum::{
    extract::{Query, State},
    Json,
};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use entrada_core::{VisitGroup, VisitRecord};

use crate::error::ApiError;
use crate::state::AppState;

/// One visit record as returned by the API
#[derive(Serialize, ToSchema)]
pub struct VisitDto {
    pub identity_id: String,
    pub external_id: String,
    pub timestamp: DateTime<Utc>,
}

impl From<VisitRecord> for VisitDto {
    fn from(record: VisitRecord) -> Self {
        Self {
            identity_id: record.identity_id,
            external_id: record.external_id,
            timestamp: record.timestamp,
        }
    }
}

/// Per-identity visit count for one date
#[derive(Serialize, ToSchema)]
pub struct VisitGroupDto {
    pub identity_id: String,
    pub external_id: String,
    pub visit_count: usize,
}

impl From<VisitGroup> for VisitGroupDto {
    fn from(group: VisitGroup) -> Self {
        Self {
            identity_id: group.identity_id,
            external_id: group.external_id,
            visit_count: group.visit_count,
        }
    }
}

/// Request body for explicit visit registration
#[derive(Deserialize, ToSchema)]
pub struct RegisterVisitRequest {
    pub identity_id: String,
    pub external_id: String,
}

/// Response for visit registration
#[derive(Serialize, ToSchema)]
pub struct RegisterVisitResponse {
    pub success: bool,
    pub visit: VisitDto,
}

/// Response for the full visit listing
#[derive(Serialize, ToSchema)]
pub struct VisitListResponse {
    pub success: bool,
    pub count: usize,
    pub visits: Vec<VisitDto>,
}

/// Response for grouped per-date visits
#[derive(Serialize, ToSchema)]
pub struct VisitGroupsResponse {
    pub success: bool,
    pub date: NaiveDate,
    pub groups: Vec<VisitGroupDto>,
}

/// Response for bulk removals
#[derive(Serialize, ToSchema)]
pub struct RemovedResponse {
    pub success: bool,
    pub deleted: usize,
}

/// Response for last-visit removal
#[derive(Serialize, ToSchema)]
pub struct RemoveLastResponse {
    pub success: bool,
    pub removed: VisitDto,
}

/// Date query parameter (ISO `yyyy-mm-dd`)
#[derive(Deserialize, IntoParams)]
pub struct DateQuery {
    /// Calendar date, e.g. `2024-01-01`
    pub date: NaiveDate,
}

/// Register a visit for an already-resolved identity at the current time
#[utoipa::path(
    post,
    path = "/visits",
    tag = "Visits",
    request_body = RegisterVisitRequest,
    responses(
        (status = 200, description = "Visit recorded", body = RegisterVisitResponse),
        (status = 400, description = "Missing identifiers"),
        (status = 500, description = "Ledger failure")
    )
)]
pub async fn register_visit(
    State(state): State<AppState>,
    Json(request): Json<RegisterVisitRequest>,
) -> Result<Json<RegisterVisitResponse>, ApiError> {
    if request.identity_id.trim().is_empty() || request.external_id.trim().is_empty() {
        return Err(ApiError::bad_request(
            "Both identity_id and external_id must be provided.",
        ));
    }

    let record = state
        .pipeline
        .register_visit(request.identity_id, request.external_id)
        .await?;

    Ok(Json(RegisterVisitResponse {
        success: true,
        visit: record.into(),
    }))
}

/// List every recorded visit in append order
#[utoipa::path(
    get,
    path = "/visits",
    tag = "Visits",
    responses(
        (status = 200, description = "All visits", body = VisitListResponse),
        (status = 500, description = "Ledger failure")
    )
)]
pub async fn get_all_visits(
    State(state): State<AppState>,
) -> Result<Json<VisitListResponse>, ApiError> {
    let visits = state.ledger.load_all().await?;
    Ok(Json(VisitListResponse {
        success: true,
        count: visits.len(),
        visits: visits.into_iter().map(VisitDto::from).collect(),
    }))
}

/// Per-identity visit counts for one calendar date
#[utoipa::path(
    get,
    path = "/visits/by-date",
    tag = "Visits",
    params(DateQuery),
    responses(
        (status = 200, description = "Groups for the date", body = VisitGroupsResponse),
        (status = 500, description = "Ledger failure")
    )
)]
pub async fn visits_by_date(
    State(state): State<AppState>,
    Query(query): Query<DateQuery>,
) -> Result<Json<VisitGroupsResponse>, ApiError> {
    let groups = state.ledger.group_by_identity_on_date(query.date).await?;
    Ok(Json(VisitGroupsResponse {
        success: true,
        date: query.date,
        groups: groups.into_iter().map(VisitGroupDto::from).collect(),
    }))
}

/// Remove every visit recorded on one calendar date
#[utoipa::path(
    delete,
    path = "/visits/by-date",
    tag = "Visits",
    params(DateQuery),
    responses(
        (status = 200, description = "Matching visits removed", body = RemovedResponse),
        (status = 500, description = "Ledger failure")
    )
)]
pub async fn delete_visits_by_date(
    State(state): State<AppState>,
    Query(query): Query<DateQuery>,
) -> Result<Json<RemovedResponse>, ApiError> {
    let deleted = state.ledger.remove_on_date(query.date).await?;
    Ok(Json(RemovedResponse {
        success: true,
        deleted,
    }))
}

/// Remove every recorded visit
#[utoipa::path(
    delete,
    path = "/visits",
    tag = "Visits",
    responses(
        (status = 200, description = "Ledger wiped", body = RemovedResponse),
        (status = 500, description = "Ledger failure")
    )
)]
pub async fn delete_all_visits(
    State(state): State<AppState>,
) -> Result<Json<RemovedResponse>, ApiError> {
    let deleted = state.ledger.remove_where(|_| true).await?;
    Ok(Json(RemovedResponse {
        success: true,
        deleted,
    }))
}

/// Remove the most recently appended visit
#[utoipa::path(
    delete,
    path = "/visits/last",
    tag = "Visits",
    responses(
        (status = 200, description = "Last visit removed", body = RemoveLastResponse),
        (status = 404, description = "No visits to delete"),
        (status = 500, description = "Ledger failure")
    )
)]
pub async fn delete_last_visit(
    State(state): State<AppState>,
) -> Result<Json<RemoveLastResponse>, ApiError> {
    match state.ledger.remove_last().await? {
        Some(removed) => Ok(Json(RemoveLastResponse {
            success: true,
            removed: removed.into(),
        })),
        None => Err(ApiError::not_found("No visits to delete.")),
    }
}
