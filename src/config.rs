use crate::Args;

/// Server configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub max_file_size: usize,
    /// `None` when the storage credentials are incomplete
    pub storage: Option<StorageConfig>,
}

/// Connection settings for the object store that publishes sketch references
#[derive(Clone)]
pub struct StorageConfig {
    pub url: String,
    pub service_key: String,
    pub bucket: String,
}

// Keeps the service key out of logs.
impl std::fmt::Debug for StorageConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageConfig")
            .field("url", &self.url)
            .field("service_key", &"<redacted>")
            .field("bucket", &self.bucket)
            .finish()
    }
}

impl From<Args> for Config {
    fn from(args: Args) -> Self {
        let storage = match (args.supabase_url, args.supabase_service_key) {
            (Some(url), Some(service_key)) if !url.is_empty() && !service_key.is_empty() => {
                Some(StorageConfig {
                    url: url.trim_end_matches('/').to_string(),
                    service_key,
                    bucket: args.storage_bucket,
                })
            }
            _ => None,
        };

        Self {
            host: args.host,
            port: args.port,
            max_file_size: args.max_file_size,
            storage,
        }
    }
}
