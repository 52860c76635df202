//! Admin API handlers
//!
//! Role checks happen in the services; a member calling these gets 403.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};

use super::dto::{EditRolesParams, PhotoForApprovalDto, UserWithRolesDto};
use crate::application::{AdminService, PhotoService};
use crate::interfaces::http::common::{error_response, ApiError, ApiResponse, EmptyData};
use crate::interfaces::http::middleware::AuthenticatedUser;
use crate::shared::ShutdownSignal;

#[derive(Clone)]
pub struct AdminState {
    pub admin: Arc<AdminService>,
    pub photos: Arc<PhotoService>,
    pub shutdown: ShutdownSignal,
}

#[utoipa::path(
    get,
    path = "/api/v1/admin/users-with-roles",
    tag = "Admin",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "All users with their roles", body = ApiResponse<Vec<UserWithRolesDto>>),
        (status = 403, description = "Admin role required")
    )
)]
pub async fn users_with_roles(
    State(state): State<AdminState>,
    Extension(user): Extension<AuthenticatedUser>,
) -> Result<Json<ApiResponse<Vec<UserWithRolesDto>>>, ApiError> {
    let users = state
        .admin
        .users_with_roles(&user.identity())
        .await
        .map_err(error_response)?;
    Ok(Json(ApiResponse::success(
        users.into_iter().map(UserWithRolesDto::from).collect(),
    )))
}

#[utoipa::path(
    post,
    path = "/api/v1/admin/edit-roles/{username}",
    tag = "Admin",
    security(("bearer_auth" = [])),
    params(
        ("username" = String, Path, description = "User whose roles are replaced"),
        EditRolesParams
    ),
    responses(
        (status = 200, description = "Roles now held", body = ApiResponse<Vec<String>>),
        (status = 400, description = "Empty or unknown role"),
        (status = 403, description = "Admin role required"),
        (status = 404, description = "User not found")
    )
)]
pub async fn edit_roles(
    State(state): State<AdminState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(username): Path<String>,
    Query(params): Query<EditRolesParams>,
) -> Result<Json<ApiResponse<Vec<String>>>, ApiError> {
    let roles = state
        .admin
        .edit_roles(&user.identity(), &username, &params.role_names())
        .await
        .map_err(error_response)?;
    Ok(Json(ApiResponse::success(
        roles.iter().map(|r| r.as_str().to_string()).collect(),
    )))
}

#[utoipa::path(
    get,
    path = "/api/v1/admin/photos-to-moderate",
    tag = "Admin",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Unapproved photos", body = ApiResponse<Vec<PhotoForApprovalDto>>),
        (status = 403, description = "Admin or Moderator role required")
    )
)]
pub async fn photos_to_moderate(
    State(state): State<AdminState>,
    Extension(user): Extension<AuthenticatedUser>,
) -> Result<Json<ApiResponse<Vec<PhotoForApprovalDto>>>, ApiError> {
    let photos = state
        .photos
        .photos_for_moderation(&user.identity())
        .await
        .map_err(error_response)?;
    Ok(Json(ApiResponse::success(
        photos.into_iter().map(PhotoForApprovalDto::from).collect(),
    )))
}

#[utoipa::path(
    post,
    path = "/api/v1/admin/approve-photo/{photo_id}",
    tag = "Admin",
    security(("bearer_auth" = [])),
    params(("photo_id" = i32, Path, description = "Photo ID")),
    responses(
        (status = 200, description = "Photo approved", body = ApiResponse<EmptyData>),
        (status = 403, description = "Admin or Moderator role required"),
        (status = 404, description = "Photo not found")
    )
)]
pub async fn approve_photo(
    State(state): State<AdminState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(photo_id): Path<i32>,
) -> Result<Json<ApiResponse<EmptyData>>, ApiError> {
    let cancel = state.shutdown.child_token();
    state
        .photos
        .approve_photo(&user.identity(), photo_id, &cancel)
        .await
        .map_err(error_response)?;
    Ok(Json(ApiResponse::success(EmptyData {})))
}

#[utoipa::path(
    post,
    path = "/api/v1/admin/reject-photo/{photo_id}",
    tag = "Admin",
    security(("bearer_auth" = [])),
    params(("photo_id" = i32, Path, description = "Photo ID")),
    responses(
        (status = 200, description = "Photo removed", body = ApiResponse<EmptyData>),
        (status = 400, description = "Image host error or save failure"),
        (status = 403, description = "Admin or Moderator role required"),
        (status = 404, description = "Photo not found")
    )
)]
pub async fn reject_photo(
    State(state): State<AdminState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(photo_id): Path<i32>,
) -> Result<Json<ApiResponse<EmptyData>>, ApiError> {
    let cancel = state.shutdown.child_token();
    state
        .photos
        .reject_photo(&user.identity(), photo_id, &cancel)
        .await
        .map_err(error_response)?;
    Ok(Json(ApiResponse::success(EmptyData {})))
}
