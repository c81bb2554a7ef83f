use crate::models::PartitionKey;
use anyhow::{Result, bail};
use std::env;
use std::path::PathBuf;

/// Ingestion run configuration
#[derive(Debug, Clone)]
pub struct IngestConfig {
    /// Languages included in the discovery query (default: python, javascript, html, css, java)
    pub languages: Vec<String>,

    /// Discovery lookback window in days (default: 10)
    pub lookback_days: u32,

    /// Maximum repositories processed per run (default: 20)
    pub max_repositories: usize,

    /// Partitions routed to storage; anything else is discarded
    pub partitions: Vec<PartitionKey>,

    /// Parent directory for staging roots (default: system temp dir)
    pub staging_dir: PathBuf,

    /// Interval between scheduled runs in seconds (default: 600)
    pub interval_secs: u64,

    /// Shallow clone depth, full clone when unset
    pub clone_depth: Option<u32>,

    pub github: GitHubConfig,
    pub storage: StorageConfig,
}

#[derive(Debug, Clone)]
pub struct GitHubConfig {
    /// API base URL (default: "https://api.github.com")
    pub api_url: String,
    /// Personal access token, anonymous access when unset
    pub token: Option<String>,
}

#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// Target bucket, a single fixed namespace
    pub bucket: String,
    /// S3-compatible endpoint, AWS default resolution when unset
    pub endpoint: Option<String>,
    /// Region (default: "us-east-1")
    pub region: String,
    pub access_key: Option<String>,
    pub secret_key: Option<String>,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            languages: ["python", "javascript", "html", "css", "java"]
                .into_iter()
                .map(String::from)
                .collect(),
            lookback_days: 10,
            max_repositories: 20,
            partitions: PartitionKey::ALL.to_vec(),
            staging_dir: env::temp_dir(),
            interval_secs: 600, // 10 minutes
            clone_depth: None,
            github: GitHubConfig::default(),
            storage: StorageConfig::default(),
        }
    }
}

impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            api_url: "https://api.github.com".to_string(),
            token: None,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            bucket: "repo-ingest".to_string(),
            endpoint: None,
            region: "us-east-1".to_string(),
            access_key: None,
            secret_key: None,
        }
    }
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

fn parse_partitions(value: &str) -> Vec<PartitionKey> {
    split_list(value)
        .iter()
        .filter_map(|name| match name.parse() {
            Ok(key) => Some(key),
            Err(e) => {
                tracing::warn!("Ignoring partition from INGEST_PARTITIONS: {}", e);
                None
            }
        })
        .collect()
}

impl IngestConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let default = Self::default();

        Self {
            languages: env::var("INGEST_LANGUAGES")
                .ok()
                .map(|v| split_list(&v))
                .unwrap_or(default.languages),

            lookback_days: env::var("INGEST_LOOKBACK_DAYS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(default.lookback_days),

            max_repositories: env::var("INGEST_MAX_REPOSITORIES")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(default.max_repositories),

            partitions: env::var("INGEST_PARTITIONS")
                .ok()
                .map(|v| parse_partitions(&v))
                .unwrap_or(default.partitions),

            staging_dir: env::var("INGEST_STAGING_DIR")
                .map(PathBuf::from)
                .unwrap_or(default.staging_dir),

            interval_secs: env::var("INGEST_INTERVAL_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(default.interval_secs),

            clone_depth: env::var("INGEST_CLONE_DEPTH")
                .ok()
                .and_then(|v| v.parse().ok()),

            github: GitHubConfig {
                api_url: env::var("GITHUB_API_URL").unwrap_or(default.github.api_url),
                token: env::var("GITHUB_TOKEN").ok().filter(|t| !t.is_empty()),
            },

            storage: StorageConfig {
                bucket: env::var("STORAGE_BUCKET").unwrap_or(default.storage.bucket),
                endpoint: env::var("STORAGE_ENDPOINT").ok(),
                region: env::var("STORAGE_REGION").unwrap_or(default.storage.region),
                access_key: env::var("STORAGE_ACCESS_KEY").ok(),
                secret_key: env::var("STORAGE_SECRET_KEY").ok(),
            },
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.languages.is_empty() {
            bail!("at least one language is required");
        }
        if self.lookback_days == 0 {
            bail!("lookback window must be at least one day");
        }
        if self.max_repositories == 0 {
            bail!("max repositories per run must be positive");
        }
        if self.partitions.is_empty() {
            bail!("at least one target partition is required");
        }
        if self.storage.bucket.trim().is_empty() {
            bail!("storage bucket must be set");
        }
        Ok(())
    }

    pub fn routes_to(&self, partition: PartitionKey) -> bool {
        self.partitions.contains(&partition)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = IngestConfig::default();
        assert_eq!(config.lookback_days, 10);
        assert_eq!(config.max_repositories, 20);
        assert_eq!(config.languages.len(), 5);
        assert_eq!(config.partitions.len(), 4);
        assert_eq!(config.interval_secs, 600);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_empty_values() {
        let mut config = IngestConfig::default();
        config.languages.clear();
        assert!(config.validate().is_err());

        let mut config = IngestConfig::default();
        config.max_repositories = 0;
        assert!(config.validate().is_err());

        let mut config = IngestConfig::default();
        config.storage.bucket = " ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_parse_partitions_skips_unknown() {
        let parsed = parse_partitions("python_files, rust_files,java_files,");
        assert_eq!(
            parsed,
            vec![PartitionKey::PythonFiles, PartitionKey::JavaFiles]
        );
    }

    #[test]
    fn test_routes_to_enabled_partitions_only() {
        let config = IngestConfig {
            partitions: vec![PartitionKey::CssFiles],
            ..Default::default()
        };
        assert!(config.routes_to(PartitionKey::CssFiles));
        assert!(!config.routes_to(PartitionKey::HtmlFiles));
    }
}
