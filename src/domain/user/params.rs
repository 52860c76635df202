//! Member listing parameters
//!
//! [`UserParams`] is the raw caller input; [`MemberQuery`] is the normalized
//! form the repositories work with.

use chrono::{Months, NaiveDate};

use super::model::User;
use crate::shared::PageRequest;

pub const DEFAULT_MIN_AGE: u32 = 18;
pub const DEFAULT_MAX_AGE: u32 = 100;

/// Member ordering, newest first in both cases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortBy {
    #[default]
    LastActive,
    Created,
}

impl SortBy {
    /// Unrecognized keys fall back to `LastActive`.
    pub fn from_key(key: &str) -> Self {
        match key {
            "created" => Self::Created,
            _ => Self::LastActive,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::LastActive => "lastActive",
            Self::Created => "created",
        }
    }
}

/// Raw listing parameters as supplied by the caller.
#[derive(Debug, Clone, Default)]
pub struct UserParams {
    pub gender: Option<String>,
    pub min_age: Option<i32>,
    pub max_age: Option<i32>,
    pub order_by: Option<String>,
    pub page_number: Option<i64>,
    pub page_size: Option<i64>,
}

/// Fully resolved member query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberQuery {
    pub gender: String,
    pub min_age: u32,
    pub max_age: u32,
    pub current_username: String,
    pub sort_by: SortBy,
    pub page: PageRequest,
}

/// Date-of-birth window matching an inclusive age range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BirthDateRange {
    /// Born strictly after this date.
    pub born_after: NaiveDate,
    /// Born on or before this date.
    pub born_on_or_before: NaiveDate,
}

impl BirthDateRange {
    pub fn contains(&self, dob: NaiveDate) -> bool {
        dob > self.born_after && dob <= self.born_on_or_before
    }
}

impl MemberQuery {
    /// Resolve raw params. `gender` must already be inferred by the caller.
    pub fn resolve(params: &UserParams, current_username: &str, gender: String) -> Self {
        let min_age = params
            .min_age
            .map_or(DEFAULT_MIN_AGE, |a| a.max(0) as u32);
        let max_age = params
            .max_age
            .map_or(DEFAULT_MAX_AGE, |a| a.max(0) as u32);

        Self {
            gender,
            min_age,
            max_age,
            current_username: current_username.to_string(),
            sort_by: params
                .order_by
                .as_deref()
                .map_or(SortBy::LastActive, SortBy::from_key),
            page: PageRequest::new(params.page_number, params.page_size),
        }
    }

    /// `None` when the age range is empty (`min_age > max_age`).
    ///
    /// Someone aged `max_age` was born after `today - (max_age + 1)` years;
    /// someone aged `min_age` was born on or before `today - min_age` years.
    pub fn birth_date_range(&self, today: NaiveDate) -> Option<BirthDateRange> {
        if self.min_age > self.max_age {
            return None;
        }

        Some(BirthDateRange {
            born_after: years_before(today, self.max_age.saturating_add(1)),
            born_on_or_before: years_before(today, self.min_age),
        })
    }

    /// In-memory form of the listing filter.
    pub fn matches(&self, user: &User, today: NaiveDate) -> bool {
        if user.username == self.current_username || user.gender != self.gender {
            return false;
        }
        self.birth_date_range(today)
            .is_some_and(|range| range.contains(user.date_of_birth))
    }
}

fn years_before(date: NaiveDate, years: u32) -> NaiveDate {
    years
        .checked_mul(12)
        .and_then(|months| date.checked_sub_months(Months::new(months)))
        .unwrap_or(NaiveDate::MIN)
}

/// Opposite of the requester's own gender: `male` → `female`, anything
/// else → `male`.
pub fn default_gender_for(own_gender: &str) -> String {
    if own_gender == "male" {
        "female".to_string()
    } else {
        "male".to_string()
    }
}
