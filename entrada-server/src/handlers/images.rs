//! Image handlers
//!
//! Promotion of staged captures into permanent object storage, retrieval-URL
//! issuance via the storage key resolver, and deletion of stored or staged
//! images.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::error::ApiError;
use crate::state::AppState;

/// Request body for promoting a staged capture
#[derive(Deserialize, ToSchema)]
pub struct PromoteImageRequest {
    /// Filename returned by a decide call
    #[schema(example = "face_20240101_120000_a1b2c3d4.jpg")]
    pub staged_filename: String,
    /// Optional display name used as the permanent key's basename
    #[serde(default)]
    pub display_name: Option<String>,
}

/// Response for a promoted image
#[derive(Serialize, ToSchema)]
pub struct PromoteImageResponse {
    pub success: bool,
    /// Permanent storage key under the visit-image prefix
    #[schema(example = "visitas/ana_20240101_120000.jpg")]
    pub key: String,
    /// Time-limited retrieval URL
    pub url: String,
}

/// Response carrying one retrieval URL
#[derive(Serialize, ToSchema)]
pub struct ImageUrlResponse {
    pub success: bool,
    pub key: String,
    pub url: String,
}

/// Response for keyword listings
#[derive(Serialize, ToSchema)]
pub struct ImageListResponse {
    pub success: bool,
    pub count: usize,
    pub images: Vec<String>,
}

/// Generic success acknowledgement
#[derive(Serialize, ToSchema)]
pub struct DeletedResponse {
    pub success: bool,
    pub message: String,
}

/// Image name query parameter
#[derive(Deserialize, IntoParams)]
pub struct ImageNameQuery {
    /// Full filename or a partial name to resolve
    pub name: String,
}

/// Keyword query parameter for listings
#[derive(Deserialize, IntoParams)]
pub struct KeywordQuery {
    /// Substring matched against stored keys, e.g. a `yyyyMMdd` date
    pub keyword: String,
}

/// Promote a staged capture into permanent storage
///
/// Uploads the staged file under a permanent `visitas/` key and deletes the
/// staging file afterwards, whether or not the upload succeeded.
#[utoipa::path(
    post,
    path = "/images/promote",
    tag = "Images",
    request_body = PromoteImageRequest,
    responses(
        (status = 200, description = "Image promoted", body = PromoteImageResponse),
        (status = 404, description = "Staged file not found"),
        (status = 503, description = "Storage backend failure")
    )
)]
pub async fn promote_image(
    State(state): State<AppState>,
    Json(request): Json<PromoteImageRequest>,
) -> Result<Json<PromoteImageResponse>, ApiError> {
    let staged_path = state.staging.path_of(&request.staged_filename)?;
    if !state.staging.contains(&request.staged_filename).await? {
        return Err(ApiError::not_found("Temp image not found"));
    }

    let key = state
        .resolver
        .final_key(request.display_name.as_deref(), chrono::Utc::now());

    let uploaded = state.resolver.upload(&staged_path, &key).await;

    // The staging file is transient either way; remove it before reporting
    // the upload outcome.
    if let Err(e) = state.staging.remove(&request.staged_filename).await {
        tracing::warn!(
            staged_filename = %request.staged_filename,
            error = %e,
            "Failed to remove staging file after promotion"
        );
    }

    let key = uploaded?;
    let url = state.resolver.retrieval_url(&key).await?;
    Ok(Json(PromoteImageResponse {
        success: true,
        key,
        url,
    }))
}

/// Resolve an image name and issue a retrieval URL
#[utoipa::path(
    get,
    path = "/images",
    tag = "Images",
    params(ImageNameQuery),
    responses(
        (status = 200, description = "Retrieval URL issued", body = ImageUrlResponse),
        (status = 400, description = "Missing name"),
        (status = 404, description = "No image found with that name")
    )
)]
pub async fn get_image(
    State(state): State<AppState>,
    Query(query): Query<ImageNameQuery>,
) -> Result<Json<ImageUrlResponse>, ApiError> {
    if query.name.trim().is_empty() {
        return Err(ApiError::bad_request("Must provide an image name."));
    }

    let key = state.resolver.resolve_key(query.name.trim()).await?;
    let url = state.resolver.retrieval_url(&key).await?;
    Ok(Json(ImageUrlResponse {
        success: true,
        key,
        url,
    }))
}

/// Delete a stored image by filename
#[utoipa::path(
    delete,
    path = "/images/{name}",
    tag = "Images",
    params(("name" = String, Path, description = "Stored image filename under the visit prefix")),
    responses(
        (status = 200, description = "Image deleted", body = DeletedResponse),
        (status = 404, description = "Image does not exist"),
        (status = 503, description = "Storage backend failure")
    )
)]
pub async fn delete_image(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<DeletedResponse>, ApiError> {
    if name.trim().is_empty() {
        return Err(ApiError::bad_request("You must provide a file name."));
    }

    let key = state.resolver.qualified_key(name.trim());
    let deleted = state.resolver.delete(&key).await?;
    if !deleted {
        return Err(ApiError::not_found(format!(
            "Could not delete '{key}' or it does not exist."
        )));
    }

    Ok(Json(DeletedResponse {
        success: true,
        message: format!("Image '{key}' deleted successfully."),
    }))
}

/// Delete a staged capture that was never promoted
#[utoipa::path(
    delete,
    path = "/images/staged/{filename}",
    tag = "Images",
    params(("filename" = String, Path, description = "Staged capture filename")),
    responses(
        (status = 200, description = "Staged file deleted", body = DeletedResponse),
        (status = 404, description = "Staged file not found")
    )
)]
pub async fn delete_staged_image(
    State(state): State<AppState>,
    Path(filename): Path<String>,
) -> Result<Json<DeletedResponse>, ApiError> {
    let removed = state.staging.remove(&filename).await?;
    if !removed {
        return Err(ApiError::not_found("Temp image not found"));
    }

    Ok(Json(DeletedResponse {
        success: true,
        message: "Temp image deleted successfully".to_string(),
    }))
}

/// List retrieval URLs for every stored image matching a keyword
///
/// Scans the whole visit-image prefix; intended for per-date review
/// (`keyword=yyyyMMdd`), not for hot paths.
#[utoipa::path(
    get,
    path = "/images/by-keyword",
    tag = "Images",
    params(KeywordQuery),
    responses(
        (status = 200, description = "Matching image URLs", body = ImageListResponse),
        (status = 404, description = "No images matched the keyword")
    )
)]
pub async fn images_by_keyword(
    State(state): State<AppState>,
    Query(query): Query<KeywordQuery>,
) -> Result<Json<ImageListResponse>, ApiError> {
    if query.keyword.trim().is_empty() {
        return Err(ApiError::bad_request("Must provide a keyword."));
    }

    let images = state.resolver.list_by_keyword(query.keyword.trim()).await?;
    if images.is_empty() {
        return Err(ApiError::not_found("No images found for that keyword."));
    }

    Ok(Json(ImageListResponse {
        success: true,
        count: images.len(),
        images,
    }))
}
