//! Photo domain entity

/// A photo owned by exactly one user.
///
/// `public_id` is the identifier of the asset on the external image host.
/// It is only a lookup key: the host may be unreachable, and photos
/// imported without an upload have none.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Photo {
    pub id: i32,
    pub url: String,
    pub public_id: Option<String>,
    pub is_main: bool,
    pub is_approved: bool,
    pub user_id: i32,
}

/// A successfully uploaded image that has not been persisted yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPhoto {
    pub url: String,
    pub public_id: Option<String>,
}

/// The two flag changes of a main-photo swap, applied as one unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MainPhotoSwap {
    /// Photo currently marked main, if any.
    pub previous: Option<i32>,
    /// Photo that becomes main.
    pub next: i32,
}

/// Moderation queue entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhotoForApproval {
    pub id: i32,
    pub url: String,
    pub username: String,
    pub is_approved: bool,
}

/// Outcome of removing a photo record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhotoRemoval {
    /// No such record.
    Missing,
    /// Removed; carries the photo promoted to main when the removed one was
    /// main and the owner still has photos left.
    Removed { promoted: Option<i32> },
}
