//! Member and photo DTOs
//!
//! Field names are camelCase on the wire.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::domain::{Member, Photo, ProfileUpdate, UserParams};

/// Member listing query parameters
#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query, rename_all = "camelCase")]
pub struct MemberListParams {
    /// Gender to list; defaults to the opposite of the caller's
    pub gender: Option<String>,
    /// Minimum age, inclusive (default 18)
    pub min_age: Option<i32>,
    /// Maximum age, inclusive (default 100)
    pub max_age: Option<i32>,
    /// `lastActive` (default) or `created`
    pub order_by: Option<String>,
    /// 1-based page number
    pub page_number: Option<i64>,
    /// Items per page (default 10, max 50)
    pub page_size: Option<i64>,
}

impl From<MemberListParams> for UserParams {
    fn from(p: MemberListParams) -> Self {
        Self {
            gender: p.gender,
            min_age: p.min_age,
            max_age: p.max_age,
            order_by: p.order_by,
            page_number: p.page_number,
            page_size: p.page_size,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PhotoDto {
    pub id: i32,
    pub url: String,
    pub is_main: bool,
    pub is_approved: bool,
}

impl From<Photo> for PhotoDto {
    fn from(p: Photo) -> Self {
        Self {
            id: p.id,
            url: p.url,
            is_main: p.is_main,
            is_approved: p.is_approved,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MemberDto {
    pub id: i32,
    pub username: String,
    pub known_as: String,
    pub age: i32,
    /// URL of the main photo
    pub photo_url: Option<String>,
    pub created: DateTime<Utc>,
    pub last_active: DateTime<Utc>,
    pub gender: String,
    pub introduction: Option<String>,
    pub looking_for: Option<String>,
    pub interests: Option<String>,
    pub city: String,
    pub country: String,
    pub photos: Vec<PhotoDto>,
}

impl From<Member> for MemberDto {
    fn from(m: Member) -> Self {
        Self {
            id: m.id,
            username: m.username,
            known_as: m.known_as,
            age: m.age,
            photo_url: m.photo_url,
            created: m.created,
            last_active: m.last_active,
            gender: m.gender,
            introduction: m.introduction,
            looking_for: m.looking_for,
            interests: m.interests,
            city: m.city,
            country: m.country,
            photos: m.photos.into_iter().map(PhotoDto::from).collect(),
        }
    }
}

/// Own-profile update. Absent fields are left unchanged.
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MemberUpdateRequest {
    #[validate(length(max = 2000))]
    pub introduction: Option<String>,
    #[validate(length(max = 2000))]
    pub looking_for: Option<String>,
    #[validate(length(max = 2000))]
    pub interests: Option<String>,
    #[validate(length(min = 1, max = 100))]
    pub city: Option<String>,
    #[validate(length(min = 1, max = 100))]
    pub country: Option<String>,
}

impl From<MemberUpdateRequest> for ProfileUpdate {
    fn from(r: MemberUpdateRequest) -> Self {
        Self {
            introduction: r.introduction,
            looking_for: r.looking_for,
            interests: r.interests,
            city: r.city,
            country: r.country,
        }
    }
}

/// `multipart/form-data` body of a photo upload
#[derive(ToSchema)]
pub struct PhotoUploadForm {
    #[schema(value_type = String, format = Binary)]
    pub file: Vec<u8>,
}
