//! Object storage client for item images
//!
//! Talks to the Supabase Storage REST API. The client is built once at
//! start-up; when storage is not configured the server runs without image
//! support and `AppState::storage` is `None`.

use std::time::Duration;

use reqwest::{header, Client};

use crate::config::StorageConfig;
use crate::error::{AppError, AppResult};

/// Supabase Storage client
#[derive(Clone)]
pub struct StorageClient {
    client: Client,
    base_url: String,
    service_key: String,
    bucket: String,
}

impl StorageClient {
    /// Build a client from configuration, or `None` when URL or key is missing or blank
    pub fn new(config: &StorageConfig) -> Option<Self> {
        let (Some(url), Some(key)) = (non_blank(&config.url), non_blank(&config.service_key)) else {
            tracing::warn!("Object storage not configured, image uploads disabled");
            return None;
        };

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| tracing::error!("Failed to build storage HTTP client: {}", e))
            .ok()?;

        tracing::info!("Object storage enabled, bucket: {}", config.bucket);
        Some(Self::with_client(client, url, key, &config.bucket))
    }

    fn with_client(client: Client, base_url: &str, service_key: &str, bucket: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            service_key: service_key.to_string(),
            bucket: bucket.to_string(),
        }
    }

    /// Publicly reachable URL of an object in the bucket
    pub fn public_url(&self, filename: &str) -> String {
        format!(
            "{}/storage/v1/object/public/{}/{}",
            self.base_url, self.bucket, filename
        )
    }

    fn object_url(&self, path: &str) -> String {
        format!("{}/storage/v1/object/{}", self.base_url, path)
    }

    /// Upload an object and return its public URL
    pub async fn upload(
        &self,
        filename: &str,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> AppResult<String> {
        let url = self.object_url(&format!("{}/{}", self.bucket, filename));

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.service_key)
            .header("apikey", &self.service_key)
            .header(header::CONTENT_TYPE, content_type)
            .header("x-upsert", "true")
            .body(bytes)
            .send()
            .await
            .map_err(|e| AppError::StorageError(format!("Upload request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::StorageError(format!(
                "Upload rejected: {} - {}",
                status, body
            )));
        }

        tracing::info!("Uploaded image {}", filename);
        Ok(self.public_url(filename))
    }

    /// Remove an object from the bucket
    pub async fn delete(&self, filename: &str) -> AppResult<()> {
        let url = self.object_url(&self.bucket);

        let response = self
            .client
            .delete(&url)
            .bearer_auth(&self.service_key)
            .header("apikey", &self.service_key)
            .json(&serde_json::json!({ "prefixes": [filename] }))
            .send()
            .await
            .map_err(|e| AppError::StorageError(format!("Delete request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::StorageError(format!(
                "Delete rejected: {} - {}",
                status, body
            )));
        }

        tracing::info!("Deleted image {}", filename);
        Ok(())
    }

    /// Remove the object a stored public URL points at
    pub async fn delete_by_url(&self, url: &str) -> AppResult<()> {
        let filename = filename_from_url(url)
            .ok_or_else(|| AppError::StorageError(format!("No file name in URL {}", url)))?;
        self.delete(filename).await
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

/// Last path segment of a URL, ignoring any query string or fragment
pub fn filename_from_url(url: &str) -> Option<&str> {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    path.rsplit('/').next().filter(|s| !s.is_empty())
}

/// Side effect to run after a database transaction has committed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PostCommit {
    /// An item image that is no longer referenced
    DeleteImage { url: String },
}

/// Run post-commit actions; failures are logged and never returned
pub async fn run_post_commit(storage: Option<&StorageClient>, actions: Vec<PostCommit>) {
    for action in actions {
        match action {
            PostCommit::DeleteImage { url } => {
                let Some(storage) = storage else {
                    tracing::warn!("Storage not configured, leaving orphaned image {}", url);
                    continue;
                };
                if let Err(e) = storage.delete_by_url(&url).await {
                    tracing::error!("Failed to delete image {}: {}", url, e);
                }
            }
        }
    }
}
