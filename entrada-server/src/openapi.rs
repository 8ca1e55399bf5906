//! OpenAPI documentation configuration
//!
//! Generates OpenAPI 3.0 specification for the Entrada access API.

use utoipa::OpenApi;

use crate::handlers::{
    DecideResponse, DeletedResponse, HealthResponse, ImageListResponse, ImageUrlResponse,
    PromoteImageRequest, PromoteImageResponse, ReadyResponse, RegisterVisitRequest,
    RegisterVisitResponse, RemoveLastResponse, RemovedResponse, VisitDto, VisitGroupDto,
    VisitGroupsResponse, VisitListResponse,
};

/// Entrada Access API - OpenAPI Documentation
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Entrada - Access API",
        version = "0.1.0",
        description = r#"
## Face-Recognition Re-Entry Control API

Entrada decides re-entry to a physical space from a single camera frame:

- **Capture** - one cropped face per decision, staged for later promotion
- **Recognition** - match against a face collection, or enroll a new identity
- **Visit Ledger** - append-only record of visits with a 24-hour repeat window
- **Image Storage** - staged captures promoted to permanent object storage with
  short-lived retrieval URLs

### How It Works

1. `POST /access/decide` captures a face and evaluates re-entry
2. A denied camera, missing face or rejected image is a normal `allowed=false` response
3. Record the visit explicitly via `POST /visits`, or use
   `POST /access/check-and-register` to record it atomically
4. Promote the staged capture via `POST /images/promote`; resolve it later by name
"#,
        license(name = "MIT OR Apache-2.0")
    ),
    servers(
        (url = "http://localhost:3000", description = "Local development server")
    ),
    tags(
        (name = "Access", description = "Capture a face and decide re-entry"),
        (name = "Visits", description = "Read and maintain the append-only visit ledger"),
        (name = "Images", description = "Promote, resolve and delete visit images"),
        (name = "Health", description = "Service health and readiness endpoints")
    ),
    paths(
        crate::handlers::health::health,
        crate::handlers::health::ready,
        crate::handlers::access::decide_handler,
        crate::handlers::access::check_and_register_handler,
        crate::handlers::visits::register_visit,
        crate::handlers::visits::get_all_visits,
        crate::handlers::visits::visits_by_date,
        crate::handlers::visits::delete_visits_by_date,
        crate::handlers::visits::delete_all_visits,
        crate::handlers::visits::delete_last_visit,
        crate::handlers::images::promote_image,
        crate::handlers::images::get_image,
        crate::handlers::images::delete_image,
        crate::handlers::images::delete_staged_image,
        crate::handlers::images::images_by_keyword,
    ),
    components(
        schemas(
            HealthResponse,
            ReadyResponse,
            DecideResponse,
            RegisterVisitRequest,
            RegisterVisitResponse,
            VisitDto,
            VisitGroupDto,
            VisitListResponse,
            VisitGroupsResponse,
            RemovedResponse,
            RemoveLastResponse,
            PromoteImageRequest,
            PromoteImageResponse,
            ImageUrlResponse,
            ImageListResponse,
            DeletedResponse,
        )
    )
)]
pub struct ApiDoc;
