//! Object storage for published sketch references
//!
//! The store is built once at startup and handed to request handlers through
//! `AppState`; handlers never reach for a global client.

use crate::config::StorageConfig;
use crate::error::SketchError;
use std::sync::Arc;

/// Well-known path of the reference shown on the easel view
pub const CURRENT_REFERENCE_PATH: &str = "current/sketch_ref.png";

/// Trait that all storage backends must implement
pub trait ObjectStore: Send + Sync {
    /// Returns the backend identifier (e.g., "supabase")
    fn name(&self) -> &'static str;

    /// Store `data` under `path`, replacing any existing object
    fn upload(&self, path: &str, data: &[u8], content_type: &str) -> Result<(), SketchError>;

    /// Public URL of the object at `path`
    fn public_url(&self, path: &str) -> String;
}

/// Build the configured store, if any
pub fn from_config(config: Option<&StorageConfig>) -> Option<Arc<dyn ObjectStore>> {
    config.map(|c| {
        tracing::info!("Using Supabase storage bucket '{}' at {}", c.bucket, c.url);
        Arc::new(SupabaseStore::new(c.clone())) as Arc<dyn ObjectStore>
    })
}

/// Reject paths that are empty, absolute or escape the bucket
pub fn validate_path(path: &str) -> Result<&str, SketchError> {
    let path = path.trim();
    if path.is_empty() {
        return Err(SketchError::InvalidRequest("path must not be empty".to_string()));
    }
    if path.starts_with('/') || path.contains('\\') {
        return Err(SketchError::InvalidRequest(format!(
            "path must be relative: {}",
            path
        )));
    }
    if path.split('/').any(|segment| segment.is_empty() || segment == "." || segment == "..") {
        return Err(SketchError::InvalidRequest(format!("invalid path: {}", path)));
    }
    // Segments go into the REST URL unencoded
    if !path
        .chars()
        .all(|c| c == '/' || c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
    {
        return Err(SketchError::InvalidRequest(format!(
            "path may only contain letters, digits, '.', '_', '-' and '/': {}",
            path
        )));
    }
    Ok(path)
}

/// Supabase Storage REST client
pub struct SupabaseStore {
    config: StorageConfig,
}

impl SupabaseStore {
    pub fn new(config: StorageConfig) -> Self {
        Self { config }
    }

    fn object_url(&self, path: &str) -> String {
        format!(
            "{}/storage/v1/object/{}/{}",
            self.config.url, self.config.bucket, path
        )
    }
}

impl ObjectStore for SupabaseStore {
    fn name(&self) -> &'static str {
        "supabase"
    }

    fn upload(&self, path: &str, data: &[u8], content_type: &str) -> Result<(), SketchError> {
        let url = self.object_url(path);
        tracing::debug!("Uploading {} bytes to {}", data.len(), url);

        ureq::post(&url)
            .header("Authorization", &format!("Bearer {}", self.config.service_key))
            .header("apikey", &self.config.service_key)
            .header("x-upsert", "true")
            .header("Content-Type", content_type)
            .send(data)
            .map_err(|e| SketchError::StorageError(format!("Upload of {} failed: {}", path, e)))?;

        Ok(())
    }

    fn public_url(&self, path: &str) -> String {
        format!(
            "{}/storage/v1/object/public/{}/{}",
            self.config.url, self.config.bucket, path
        )
    }
}
