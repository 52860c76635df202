//! User domain entity

use chrono::{DateTime, Datelike, NaiveDate, Utc};

use super::role::Role;
use crate::domain::photo::{MainPhotoSwap, Photo};
use crate::domain::DomainResult;
use crate::shared::DomainError;

/// User aggregate: profile plus the photos it owns, in insertion order.
#[derive(Debug, Clone)]
pub struct User {
    pub id: i32,
    pub username: String,
    pub known_as: String,
    pub gender: String,
    pub date_of_birth: NaiveDate,
    pub created: DateTime<Utc>,
    pub last_active: DateTime<Utc>,
    pub introduction: Option<String>,
    pub looking_for: Option<String>,
    pub interests: Option<String>,
    pub city: String,
    pub country: String,
    pub roles: Vec<Role>,
    pub photos: Vec<Photo>,
}

/// Profile fields a user may edit on their own account.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileUpdate {
    pub introduction: Option<String>,
    pub looking_for: Option<String>,
    pub interests: Option<String>,
    pub city: Option<String>,
    pub country: Option<String>,
}

/// Data for creating a user (seeding; registration lives elsewhere).
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub known_as: String,
    pub gender: String,
    pub date_of_birth: NaiveDate,
    pub city: String,
    pub country: String,
    pub roles: Vec<Role>,
}

impl User {
    pub fn main_photo(&self) -> Option<&Photo> {
        self.photos.iter().find(|p| p.is_main)
    }

    pub fn photo(&self, photo_id: i32) -> Option<&Photo> {
        self.photos.iter().find(|p| p.id == photo_id)
    }

    pub fn age_on(&self, today: NaiveDate) -> i32 {
        age_on(self.date_of_birth, today)
    }

    pub fn has_role(&self, role: Role) -> bool {
        self.roles.contains(&role)
    }

    /// Work out the flag changes that make `photo_id` the main photo.
    pub fn plan_main_swap(&self, photo_id: i32) -> DomainResult<MainPhotoSwap> {
        let photo = self
            .photo(photo_id)
            .ok_or_else(|| DomainError::photo_not_found(photo_id))?;

        if photo.is_main {
            return Err(DomainError::already_main());
        }

        Ok(MainPhotoSwap {
            previous: self.main_photo().map(|p| p.id),
            next: photo.id,
        })
    }

    /// The photo to delete, if the user owns it and it is not the main one.
    pub fn deletable_photo(&self, photo_id: i32) -> DomainResult<&Photo> {
        let photo = self
            .photo(photo_id)
            .ok_or_else(|| DomainError::photo_not_found(photo_id))?;

        if photo.is_main {
            return Err(DomainError::cannot_delete_main());
        }

        Ok(photo)
    }

    /// Apply an update; returns whether any field actually changed.
    pub fn apply_profile_update(&mut self, update: &ProfileUpdate) -> bool {
        let mut changed = false;

        changed |= replace_optional(&mut self.introduction, &update.introduction);
        changed |= replace_optional(&mut self.looking_for, &update.looking_for);
        changed |= replace_optional(&mut self.interests, &update.interests);

        if let Some(city) = &update.city {
            if *city != self.city {
                self.city = city.clone();
                changed = true;
            }
        }
        if let Some(country) = &update.country {
            if *country != self.country {
                self.country = country.clone();
                changed = true;
            }
        }

        changed
    }
}

fn replace_optional(field: &mut Option<String>, value: &Option<String>) -> bool {
    match value {
        Some(v) if field.as_deref() != Some(v.as_str()) => {
            *field = Some(v.clone());
            true
        }
        _ => false,
    }
}

/// Age in whole years on `today`.
pub fn age_on(date_of_birth: NaiveDate, today: NaiveDate) -> i32 {
    let mut age = today.year() - date_of_birth.year();
    if (today.month(), today.day()) < (date_of_birth.month(), date_of_birth.day()) {
        age -= 1;
    }
    age
}
