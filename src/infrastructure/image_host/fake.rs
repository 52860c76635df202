//! Scriptable image host for tests

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::domain::{DomainError, DomainResult, ImageStorage, ImageUpload, UploadedImage};

#[derive(Default)]
pub(crate) struct FakeImageHost {
    counter: AtomicU32,
    /// public ids currently stored
    pub(crate) stored: Mutex<Vec<String>>,
    pub(crate) deleted: Mutex<Vec<String>>,
    pub(crate) upload_error: Mutex<Option<String>>,
    pub(crate) delete_error: Mutex<Option<String>>,
    /// cancelled once the next upload has been stored
    pub(crate) cancel_after_upload: Mutex<Option<CancellationToken>>,
}

impl FakeImageHost {
    pub(crate) fn fail_uploads(&self, message: &str) {
        *self.upload_error.lock().unwrap() = Some(message.to_string());
    }

    pub(crate) fn fail_deletes(&self, message: Option<&str>) {
        *self.delete_error.lock().unwrap() = message.map(str::to_string);
    }

    pub(crate) fn cancel_after_upload(&self, token: &CancellationToken) {
        *self.cancel_after_upload.lock().unwrap() = Some(token.clone());
    }

    pub(crate) fn stored(&self) -> Vec<String> {
        self.stored.lock().unwrap().clone()
    }

    pub(crate) fn deleted(&self) -> Vec<String> {
        self.deleted.lock().unwrap().clone()
    }
}

#[async_trait]
impl ImageStorage for FakeImageHost {
    async fn upload(&self, image: ImageUpload) -> DomainResult<UploadedImage> {
        if let Some(message) = self.upload_error.lock().unwrap().clone() {
            return Err(DomainError::ExternalService(message));
        }
        let n = self.counter.fetch_add(1, Ordering::SeqCst) + 1;
        let public_id = format!("members/{}-{}", n, image.file_name);
        self.stored.lock().unwrap().push(public_id.clone());
        if let Some(token) = self.cancel_after_upload.lock().unwrap().take() {
            token.cancel();
        }
        Ok(UploadedImage {
            secure_url: format!("https://img.example/{}", public_id),
            public_id,
        })
    }

    async fn delete(&self, public_id: &str) -> DomainResult<()> {
        if let Some(message) = self.delete_error.lock().unwrap().clone() {
            return Err(DomainError::ExternalService(message));
        }
        // absent ids succeed, like the real host
        self.stored.lock().unwrap().retain(|id| id != public_id);
        self.deleted.lock().unwrap().push(public_id.to_string());
        Ok(())
    }
}
