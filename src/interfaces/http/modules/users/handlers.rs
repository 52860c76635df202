//! Member and photo API handlers
//!
//! Thin wrappers over `MemberService` and `PhotoService`. The caller's
//! identity comes from the auth middleware; each handler hands the services
//! a child of the shutdown token.

use std::sync::Arc;

use axum::{
    extract::{Multipart, Path, Query, State},
    http::{header, HeaderMap, HeaderName, HeaderValue, StatusCode},
    Extension, Json,
};
use tracing::warn;

use super::dto::{MemberDto, MemberListParams, MemberUpdateRequest, PhotoDto, PhotoUploadForm};
use crate::application::{MemberService, PhotoService};
use crate::domain::ImageUpload;
use crate::interfaces::http::common::{
    bad_request, error_response, ApiError, ApiResponse, EmptyData, PaginatedResponse,
    ValidatedJson,
};
use crate::interfaces::http::middleware::AuthenticatedUser;
use crate::shared::{PaginationHeader, ShutdownSignal};

/// Name of the response header carrying page metadata as JSON.
pub const PAGINATION_HEADER: &str = "pagination";

/// Multipart field holding the image.
const FILE_FIELD: &str = "file";

#[derive(Clone)]
pub struct UsersState {
    pub members: Arc<MemberService>,
    pub photos: Arc<PhotoService>,
    pub shutdown: ShutdownSignal,
}

fn pagination_headers(meta: &PaginationHeader) -> HeaderMap {
    let mut headers = HeaderMap::new();
    match serde_json::to_string(meta).map(|json| HeaderValue::from_str(&json)) {
        Ok(Ok(value)) => {
            headers.insert(HeaderName::from_static(PAGINATION_HEADER), value);
        }
        _ => warn!("Could not encode pagination header"),
    }
    headers
}

#[utoipa::path(
    get,
    path = "/api/v1/users",
    tag = "Members",
    security(("bearer_auth" = [])),
    params(MemberListParams),
    responses(
        (status = 200, description = "Member page; metadata also in the Pagination header", body = PaginatedResponse<MemberDto>),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Caller not found")
    )
)]
pub async fn list_members(
    State(state): State<UsersState>,
    Extension(user): Extension<AuthenticatedUser>,
    Query(params): Query<MemberListParams>,
) -> Result<(HeaderMap, Json<PaginatedResponse<MemberDto>>), ApiError> {
    let cancel = state.shutdown.child_token();
    let page = state
        .members
        .get_members(&user.identity(), &params.into(), &cancel)
        .await
        .map_err(error_response)?;

    let headers = pagination_headers(&page.header());
    Ok((headers, Json(PaginatedResponse::from_page(page, MemberDto::from))))
}

#[utoipa::path(
    get,
    path = "/api/v1/users/{username}",
    tag = "Members",
    security(("bearer_auth" = [])),
    params(("username" = String, Path, description = "Member username")),
    responses(
        (status = 200, description = "Member details", body = ApiResponse<MemberDto>),
        (status = 404, description = "Not found")
    )
)]
pub async fn get_member(
    State(state): State<UsersState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(username): Path<String>,
) -> Result<Json<ApiResponse<MemberDto>>, ApiError> {
    let member = state
        .members
        .get_member(&user.identity(), &username)
        .await
        .map_err(error_response)?;
    Ok(Json(ApiResponse::success(MemberDto::from(member))))
}

#[utoipa::path(
    put,
    path = "/api/v1/users",
    tag = "Members",
    security(("bearer_auth" = [])),
    request_body = MemberUpdateRequest,
    responses(
        (status = 204, description = "Profile updated"),
        (status = 400, description = "Nothing changed or save failed"),
        (status = 422, description = "Validation error")
    )
)]
pub async fn update_member(
    State(state): State<UsersState>,
    Extension(user): Extension<AuthenticatedUser>,
    ValidatedJson(request): ValidatedJson<MemberUpdateRequest>,
) -> Result<StatusCode, ApiError> {
    let cancel = state.shutdown.child_token();
    state
        .members
        .update_profile(&user.identity(), &request.into(), &cancel)
        .await
        .map_err(error_response)?;
    Ok(StatusCode::NO_CONTENT)
}

/// Pull the `file` field out of the form; an absent field yields an empty
/// upload, which the service rejects.
async fn read_upload(multipart: &mut Multipart) -> Result<ImageUpload, ApiError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| bad_request(e.body_text()))?
    {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }
        let file_name = field.file_name().unwrap_or("upload").to_string();
        let content_type = field.content_type().map(str::to_string);
        let bytes = field.bytes().await.map_err(|e| bad_request(e.body_text()))?;
        return Ok(ImageUpload {
            file_name,
            content_type,
            bytes: bytes.to_vec(),
        });
    }

    Ok(ImageUpload {
        file_name: String::new(),
        content_type: None,
        bytes: Vec::new(),
    })
}

#[utoipa::path(
    post,
    path = "/api/v1/users/add-photo",
    tag = "Photos",
    security(("bearer_auth" = [])),
    request_body(content = PhotoUploadForm, content_type = "multipart/form-data"),
    responses(
        (status = 201, description = "Photo stored; Location points at the member", body = ApiResponse<PhotoDto>),
        (status = 400, description = "No file, image host error or save failure")
    )
)]
pub async fn add_photo(
    State(state): State<UsersState>,
    Extension(user): Extension<AuthenticatedUser>,
    mut multipart: Multipart,
) -> Result<(StatusCode, HeaderMap, Json<ApiResponse<PhotoDto>>), ApiError> {
    let upload = read_upload(&mut multipart).await?;
    let cancel = state.shutdown.child_token();

    let photo = state
        .photos
        .add_photo(&user.identity(), upload, &cancel)
        .await
        .map_err(error_response)?;

    let mut headers = HeaderMap::new();
    if let Ok(location) = HeaderValue::from_str(&format!("/api/v1/users/{}", user.username)) {
        headers.insert(header::LOCATION, location);
    }

    Ok((
        StatusCode::CREATED,
        headers,
        Json(ApiResponse::success(PhotoDto::from(photo))),
    ))
}

#[utoipa::path(
    put,
    path = "/api/v1/users/set-main-photo/{photo_id}",
    tag = "Photos",
    security(("bearer_auth" = [])),
    params(("photo_id" = i32, Path, description = "Photo ID")),
    responses(
        (status = 204, description = "Main photo changed"),
        (status = 400, description = "Already main or save failed"),
        (status = 404, description = "Photo not found")
    )
)]
pub async fn set_main_photo(
    State(state): State<UsersState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(photo_id): Path<i32>,
) -> Result<StatusCode, ApiError> {
    let cancel = state.shutdown.child_token();
    state
        .photos
        .set_main_photo(&user.identity(), photo_id, &cancel)
        .await
        .map_err(error_response)?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    delete,
    path = "/api/v1/users/delete-photo/{photo_id}",
    tag = "Photos",
    security(("bearer_auth" = [])),
    params(("photo_id" = i32, Path, description = "Photo ID")),
    responses(
        (status = 200, description = "Photo deleted", body = ApiResponse<EmptyData>),
        (status = 400, description = "Main photo, image host error or save failure"),
        (status = 404, description = "Photo not found")
    )
)]
pub async fn delete_photo(
    State(state): State<UsersState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(photo_id): Path<i32>,
) -> Result<Json<ApiResponse<EmptyData>>, ApiError> {
    let cancel = state.shutdown.child_token();
    state
        .photos
        .delete_photo(&user.identity(), photo_id, &cancel)
        .await
        .map_err(error_response)?;
    Ok(Json(ApiResponse::success(EmptyData {})))
}
