//! Request handlers for the Entrada REST API.

pub mod access;
pub mod health;
pub mod images;
pub mod visits;

pub use access::{check_and_register_handler, decide_handler, DecideResponse};
pub use health::{health, ready, HealthResponse, ReadyResponse};
pub use images::{
    delete_image, delete_staged_image, get_image, images_by_keyword, promote_image,
    DeletedResponse, ImageListResponse, ImageUrlResponse, PromoteImageRequest,
    PromoteImageResponse,
};
pub use visits::{
    delete_all_visits, delete_last_visit, delete_visits_by_date, get_all_visits, register_visit,
    visits_by_date, RegisterVisitRequest, RegisterVisitResponse, RemoveLastResponse,
    RemovedResponse, VisitDto, VisitGroupDto, VisitGroupsResponse, VisitListResponse,
};
