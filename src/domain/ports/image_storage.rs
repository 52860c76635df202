//! Outbound port: external image hosting
//!
//! Binary photo content never touches the local store; it is uploaded to
//! an image host and referenced by URL plus the host's public id.

use async_trait::async_trait;

use crate::domain::DomainResult;

/// An image received from a client, ready to be uploaded.
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub file_name: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

impl ImageUpload {
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Where the host stored the image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedImage {
    pub secure_url: String,
    pub public_id: String,
}

/// Port for the external image host.
///
/// Both calls are single-attempt. Failures are reported as
/// `DomainError::ExternalService` carrying the host's message verbatim.
#[async_trait]
pub trait ImageStorage: Send + Sync {
    async fn upload(&self, image: ImageUpload) -> DomainResult<UploadedImage>;

    /// Deleting an asset the host no longer has counts as success.
    async fn delete(&self, public_id: &str) -> DomainResult<()>;
}
