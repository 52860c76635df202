use thiserror::Error;

#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Not found: {entity} with {field}={value}")]
    NotFound {
        entity: &'static str,
        field: &'static str,
        value: String,
    },

    /// Business-rule violation; the message is shown to the caller as-is.
    #[error("{0}")]
    Validation(String),

    /// Image host failure, message passed through verbatim.
    #[error("{0}")]
    ExternalService(String),

    /// The store refused or failed to persist a change.
    #[error("{0}")]
    Persistence(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Operation cancelled")]
    Cancelled,
}

impl DomainError {
    pub fn user_not_found(username: &str) -> Self {
        Self::NotFound {
            entity: "User",
            field: "username",
            value: username.to_string(),
        }
    }

    pub fn photo_not_found(photo_id: i32) -> Self {
        Self::NotFound {
            entity: "Photo",
            field: "id",
            value: photo_id.to_string(),
        }
    }

    pub fn already_main() -> Self {
        Self::Validation("This is already your main photo".into())
    }

    pub fn cannot_delete_main() -> Self {
        Self::Validation("You cannot delete your main photo".into())
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

#[derive(Debug, Error)]
pub enum InfraError {
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    #[error("Image host error: {0}")]
    ImageHost(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<InfraError> for DomainError {
    fn from(e: InfraError) -> Self {
        match e {
            InfraError::ImageHost(msg) => DomainError::ExternalService(msg),
            other => DomainError::Persistence(other.to_string()),
        }
    }
}
