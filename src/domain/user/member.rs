//! Member: a user as seen by someone browsing profiles

use chrono::{DateTime, NaiveDate, Utc};

use super::model::User;
use crate::domain::photo::Photo;

#[derive(Debug, Clone)]
pub struct Member {
    pub id: i32,
    pub username: String,
    pub known_as: String,
    pub age: i32,
    pub photo_url: Option<String>,
    pub created: DateTime<Utc>,
    pub last_active: DateTime<Utc>,
    pub gender: String,
    pub introduction: Option<String>,
    pub looking_for: Option<String>,
    pub interests: Option<String>,
    pub city: String,
    pub country: String,
    pub photos: Vec<Photo>,
}

impl Member {
    /// Project a user. Unapproved photos, the main one included, are only
    /// visible to their owner.
    pub fn project(user: User, today: NaiveDate, viewer_is_owner: bool) -> Self {
        let age = user.age_on(today);
        let photo_url = user
            .main_photo()
            .filter(|p| viewer_is_owner || p.is_approved)
            .map(|p| p.url.clone());
        let photos = user
            .photos
            .into_iter()
            .filter(|p| viewer_is_owner || p.is_approved)
            .collect();

        Self {
            id: user.id,
            username: user.username,
            known_as: user.known_as,
            age,
            photo_url,
            created: user.created,
            last_active: user.last_active,
            gender: user.gender,
            introduction: user.introduction,
            looking_for: user.looking_for,
            interests: user.interests,
            city: user.city,
            country: user.country,
            photos,
        }
    }
}
