//! Cloudinary adapter for the [`ImageStorage`] port
//!
//! Requests are signed: the parameters (minus `file`, `api_key` and the
//! signature fields) are sorted, joined as `k=v&k=v`, suffixed with the API
//! secret and hashed with SHA-256.

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use crate::domain::{DomainResult, ImageStorage, ImageUpload, UploadedImage};
use crate::shared::InfraError;

/// Square crop centred on the detected face.
pub const UPLOAD_TRANSFORMATION: &str = "c_fill,g_face,h_500,w_500";

#[derive(Clone)]
pub struct CloudinaryConfig {
    pub cloud_name: String,
    pub api_key: String,
    pub api_secret: String,
    /// Folder uploaded assets are placed in
    pub folder: String,
    pub timeout_secs: u64,
    pub base_url: String,
}

impl Default for CloudinaryConfig {
    fn default() -> Self {
        Self {
            cloud_name: String::new(),
            api_key: String::new(),
            api_secret: String::new(),
            folder: "members".to_string(),
            timeout_secs: 30,
            base_url: "https://api.cloudinary.com/v1_1".to_string(),
        }
    }
}

impl std::fmt::Debug for CloudinaryConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CloudinaryConfig")
            .field("cloud_name", &self.cloud_name)
            .field("api_key", &self.api_key)
            .field("api_secret", &"<redacted>")
            .field("folder", &self.folder)
            .field("timeout_secs", &self.timeout_secs)
            .field("base_url", &self.base_url)
            .finish()
    }
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    secure_url: String,
    public_id: String,
}

#[derive(Debug, Deserialize)]
struct DestroyResponse {
    result: String,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: ErrorMessage,
}

#[derive(Debug, Deserialize)]
struct ErrorMessage {
    message: String,
}

pub struct CloudinaryImageHost {
    config: CloudinaryConfig,
    http_client: reqwest::Client,
}

impl CloudinaryImageHost {
    pub fn new(config: CloudinaryConfig) -> Result<Self, InfraError> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| InfraError::ImageHost(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            config,
            http_client,
        })
    }

    fn endpoint(&self, action: &str) -> String {
        format!(
            "{}/{}/image/{}",
            self.config.base_url.trim_end_matches('/'),
            self.config.cloud_name,
            action
        )
    }

    fn sign(&self, params: &[(&str, &str)]) -> String {
        sign_params(params, &self.config.api_secret)
    }

    /// Read the host's error message from a failed response, falling back
    /// to the status line.
    async fn error_message(response: reqwest::Response) -> String {
        let status = response.status();
        match response.json::<ErrorBody>().await {
            Ok(body) => body.error.message,
            Err(_) => format!("Image host returned {}", status),
        }
    }
}

/// `k1=v1&k2=v2` over the parameters sorted by key.
pub fn string_to_sign(params: &[(&str, &str)]) -> String {
    let mut sorted: Vec<_> = params.to_vec();
    sorted.sort_by(|a, b| a.0.cmp(b.0));
    sorted
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join("&")
}

pub fn sign_params(params: &[(&str, &str)], secret: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(string_to_sign(params).as_bytes());
    hasher.update(secret.as_bytes());
    hex::encode(hasher.finalize())
}

#[async_trait]
impl ImageStorage for CloudinaryImageHost {
    async fn upload(&self, image: ImageUpload) -> DomainResult<UploadedImage> {
        let timestamp = Utc::now().timestamp().to_string();
        let signature = self.sign(&[
            ("folder", self.config.folder.as_str()),
            ("timestamp", timestamp.as_str()),
            ("transformation", UPLOAD_TRANSFORMATION),
        ]);

        let mut part = Part::bytes(image.bytes).file_name(image.file_name);
        if let Some(content_type) = image.content_type.as_deref() {
            part = part
                .mime_str(content_type)
                .map_err(|e| InfraError::ImageHost(format!("Invalid content type: {}", e)))?;
        }

        let form = Form::new()
            .part("file", part)
            .text("api_key", self.config.api_key.clone())
            .text("timestamp", timestamp)
            .text("folder", self.config.folder.clone())
            .text("transformation", UPLOAD_TRANSFORMATION)
            .text("signature_algorithm", "sha256")
            .text("signature", signature);

        let response = self
            .http_client
            .post(self.endpoint("upload"))
            .multipart(form)
            .send()
            .await
            .map_err(|e| InfraError::ImageHost(e.to_string()))?;

        if !response.status().is_success() {
            let message = Self::error_message(response).await;
            warn!(error = %message, "Image upload rejected");
            return Err(InfraError::ImageHost(message).into());
        }

        let body: UploadResponse = response
            .json()
            .await
            .map_err(|e| InfraError::ImageHost(format!("Malformed upload response: {}", e)))?;

        debug!(public_id = %body.public_id, "Image uploaded");
        Ok(UploadedImage {
            secure_url: body.secure_url,
            public_id: body.public_id,
        })
    }

    async fn delete(&self, public_id: &str) -> DomainResult<()> {
        let timestamp = Utc::now().timestamp().to_string();
        let signature = self.sign(&[("public_id", public_id), ("timestamp", timestamp.as_str())]);

        let params = [
            ("public_id", public_id),
            ("timestamp", timestamp.as_str()),
            ("api_key", self.config.api_key.as_str()),
            ("signature_algorithm", "sha256"),
            ("signature", signature.as_str()),
        ];

        let response = self
            .http_client
            .post(self.endpoint("destroy"))
            .form(&params)
            .send()
            .await
            .map_err(|e| InfraError::ImageHost(e.to_string()))?;

        if !response.status().is_success() {
            let message = Self::error_message(response).await;
            return Err(InfraError::ImageHost(message).into());
        }

        let body: DestroyResponse = response
            .json()
            .await
            .map_err(|e| InfraError::ImageHost(format!("Malformed destroy response: {}", e)))?;

        match body.result.as_str() {
            "ok" => Ok(()),
            // already gone
            "not found" => {
                debug!(public_id, "Image already absent on host");
                Ok(())
            }
            other => Err(InfraError::ImageHost(other.to_string()).into()),
        }
    }
}
