/// Configuration management for vidhub
use crate::error::{HubError, HubResult};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

/// Main server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub service: ServiceConfig,
    pub storage: StorageConfig,
    pub assets: AssetsConfig,
    pub authentication: AuthConfig,
    pub pagination: PaginationConfig,
    pub rate_limit: RateLimitConfig,
    pub logging: LoggingConfig,
    pub jobs: JobsConfig,
}

/// Service-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    pub hostname: String,
    pub port: u16,
    pub public_url: String,
    pub version: String,
    /// Maximum accepted request body for multipart uploads, in bytes
    pub upload_limit: usize,
}

/// Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub data_directory: PathBuf,
    pub database: PathBuf,
    /// Where multipart uploads are staged before they reach the asset store
    pub temp_directory: PathBuf,
}

/// Remote asset store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetsConfig {
    pub store: AssetStoreConfig,
    /// Upper bound on any single upload/destroy call
    pub timeout_secs: u64,
}

/// Asset store backend selection
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum AssetStoreConfig {
    Disk {
        location: PathBuf,
        public_base_url: String,
    },
    Cloudinary {
        cloud_name: String,
        api_key: String,
        api_secret: String,
    },
}

/// Authentication configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Session lifetime in seconds
    pub session_ttl_secs: i64,
}

/// Listing defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaginationConfig {
    pub default_page_size: u32,
    pub max_page_size: u32,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            default_page_size: 10,
            max_page_size: 100,
        }
    }
}

/// Rate limiting configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    pub enabled: bool,
    pub authenticated_rps: u32,
    pub unauthenticated_rps: u32,
    pub burst_size: u32,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    /// Emit JSON lines instead of the human-readable format
    pub json: bool,
}

/// Background job configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobsConfig {
    pub enabled: bool,
    pub retirement_retry_interval_secs: u64,
    /// Staged uploads older than this are removed from the temp directory
    pub stale_upload_ttl_secs: u64,
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

impl ServerConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> HubResult<Self> {
        dotenv::dotenv().ok();

        let hostname = env::var("VIDHUB_HOSTNAME").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("VIDHUB_PORT")
            .unwrap_or_else(|_| "8000".to_string())
            .parse()
            .map_err(|_| HubError::Validation("Invalid port number".to_string()))?;
        let public_url = env::var("VIDHUB_PUBLIC_URL")
            .unwrap_or_else(|_| format!("http://{}:{}", hostname, port));
        let version = env!("CARGO_PKG_VERSION").to_string();
        let upload_limit = env_or("VIDHUB_UPLOAD_LIMIT", 512 * 1024 * 1024);

        let data_directory: PathBuf = env::var("VIDHUB_DATA_DIRECTORY")
            .unwrap_or_else(|_| "./data".to_string())
            .into();
        let database = env::var("VIDHUB_DATABASE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| data_directory.join("vidhub.sqlite"));
        let temp_directory = env::var("VIDHUB_TEMP_DIRECTORY")
            .map(PathBuf::from)
            .unwrap_or_else(|_| data_directory.join("temp"));

        let store = if let Ok(cloud_name) = env::var("VIDHUB_CLOUDINARY_CLOUD_NAME") {
            AssetStoreConfig::Cloudinary {
                cloud_name,
                api_key: env::var("VIDHUB_CLOUDINARY_API_KEY").unwrap_or_default(),
                api_secret: env::var("VIDHUB_CLOUDINARY_API_SECRET").unwrap_or_default(),
            }
        } else {
            AssetStoreConfig::Disk {
                location: env::var("VIDHUB_ASSET_DISK_LOCATION")
                    .map(PathBuf::from)
                    .unwrap_or_else(|_| data_directory.join("assets")),
                public_base_url: env::var("VIDHUB_ASSET_PUBLIC_BASE_URL")
                    .unwrap_or_else(|_| format!("{}/assets", public_url.trim_end_matches('/'))),
            }
        };

        let pagination_defaults = PaginationConfig::default();

        Ok(ServerConfig {
            service: ServiceConfig {
                hostname,
                port,
                public_url,
                version,
                upload_limit,
            },
            storage: StorageConfig {
                data_directory,
                database,
                temp_directory,
            },
            assets: AssetsConfig {
                store,
                timeout_secs: env_or("VIDHUB_ASSET_TIMEOUT_SECS", 120),
            },
            authentication: AuthConfig {
                session_ttl_secs: env_or("VIDHUB_SESSION_TTL_SECS", 86400),
            },
            pagination: PaginationConfig {
                default_page_size: env_or(
                    "VIDHUB_DEFAULT_PAGE_SIZE",
                    pagination_defaults.default_page_size,
                ),
                max_page_size: env_or("VIDHUB_MAX_PAGE_SIZE", pagination_defaults.max_page_size),
            },
            rate_limit: RateLimitConfig {
                enabled: env_or("VIDHUB_RATE_LIMITS_ENABLED", true),
                authenticated_rps: env_or("VIDHUB_RATE_LIMIT_AUTHENTICATED_RPS", 100),
                unauthenticated_rps: env_or("VIDHUB_RATE_LIMIT_UNAUTHENTICATED_RPS", 10),
                burst_size: env_or("VIDHUB_RATE_LIMIT_BURST", 50),
            },
            logging: LoggingConfig {
                level: env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
                json: env::var("VIDHUB_LOG_FORMAT")
                    .map(|v| v.eq_ignore_ascii_case("json"))
                    .unwrap_or(false),
            },
            jobs: JobsConfig {
                enabled: env_or("VIDHUB_JOBS_ENABLED", true),
                retirement_retry_interval_secs: env_or("VIDHUB_RETIREMENT_RETRY_SECS", 600),
                stale_upload_ttl_secs: env_or("VIDHUB_STALE_UPLOAD_TTL_SECS", 86400),
            },
        })
    }

    /// Validate configuration
    pub fn validate(&self) -> HubResult<()> {
        if self.service.hostname.is_empty() {
            return Err(HubError::Validation("Hostname cannot be empty".to_string()));
        }

        if self.pagination.default_page_size == 0 || self.pagination.max_page_size == 0 {
            return Err(HubError::Validation(
                "Page sizes must be greater than zero".to_string(),
            ));
        }

        if self.pagination.default_page_size > self.pagination.max_page_size {
            return Err(HubError::Validation(
                "Default page size cannot exceed the maximum page size".to_string(),
            ));
        }

        if self.assets.timeout_secs == 0 {
            return Err(HubError::Validation(
                "Asset store timeout must be greater than zero".to_string(),
            ));
        }

        if let AssetStoreConfig::Cloudinary {
            cloud_name,
            api_key,
            api_secret,
        } = &self.assets.store
        {
            if cloud_name.is_empty() || api_key.is_empty() || api_secret.is_empty() {
                return Err(HubError::Validation(
                    "Cloudinary requires cloud name, API key and API secret".to_string(),
                ));
            }
        }

        Ok(())
    }

    /// Configuration rooted in a scratch directory, used by tests
    pub fn for_directory(root: &std::path::Path) -> Self {
        ServerConfig {
            service: ServiceConfig {
                hostname: "127.0.0.1".to_string(),
                port: 0,
                public_url: "http://127.0.0.1".to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
                upload_limit: 16 * 1024 * 1024,
            },
            storage: StorageConfig {
                data_directory: root.to_path_buf(),
                database: root.join("vidhub.sqlite"),
                temp_directory: root.join("temp"),
            },
            assets: AssetsConfig {
                store: AssetStoreConfig::Disk {
                    location: root.join("assets"),
                    public_base_url: "http://127.0.0.1/assets".to_string(),
                },
                timeout_secs: 5,
            },
            authentication: AuthConfig {
                session_ttl_secs: 3600,
            },
            pagination: PaginationConfig::default(),
            rate_limit: RateLimitConfig {
                enabled: false,
                authenticated_rps: 100,
                unauthenticated_rps: 10,
                burst_size: 50,
            },
            logging: LoggingConfig {
                level: "debug".to_string(),
                json: false,
            },
            jobs: JobsConfig {
                enabled: false,
                retirement_retry_interval_secs: 600,
                stale_upload_ttl_secs: 86400,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_scratch_config_is_valid() {
        let dir = tempdir().unwrap();
        let config = ServerConfig::for_directory(dir.path());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_default_page_size_above_max_rejected() {
        let dir = tempdir().unwrap();
        let mut config = ServerConfig::for_directory(dir.path());
        config.pagination.default_page_size = 500;
        assert!(matches!(config.validate(), Err(HubError::Validation(_))));
    }

    #[test]
    fn test_incomplete_cloudinary_credentials_rejected() {
        let dir = tempdir().unwrap();
        let mut config = ServerConfig::for_directory(dir.path());
        config.assets.store = AssetStoreConfig::Cloudinary {
            cloud_name: "demo".to_string(),
            api_key: String::new(),
            api_secret: "secret".to_string(),
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_asset_timeout_rejected() {
        let dir = tempdir().unwrap();
        let mut config = ServerConfig::for_directory(dir.path());
        config.assets.timeout_secs = 0;
        assert!(config.validate().is_err());
    }
}
