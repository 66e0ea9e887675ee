/// Configuration management for hashvault
use crate::{
    blob_store::{validate, OutputFormat},
    error::{VaultError, VaultResult},
};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

/// Request traces from `tower_http` are emitted at debug level
const DEFAULT_LOG_FILTER: &str = "hashvault=debug,tower_http=debug";

/// Main server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub service: ServiceConfig,
    pub storage: StorageConfig,
    pub logging: LoggingConfig,
}

/// Service-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    pub hostname: String,
    pub port: u16,
}

/// Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Flat blob directory, created at startup if absent
    pub directory: PathBuf,
    pub format: OutputFormat,
    pub max_upload_bytes: usize,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// `EnvFilter` directives
    pub level: String,
    pub json: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            service: ServiceConfig {
                hostname: "0.0.0.0".to_string(),
                port: 3000,
            },
            storage: StorageConfig {
                directory: PathBuf::from("./uploads"),
                format: OutputFormat::default(),
                max_upload_bytes: validate::MAX_UPLOAD_BYTES,
            },
            logging: LoggingConfig {
                level: DEFAULT_LOG_FILTER.to_string(),
                json: false,
            },
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> VaultResult<Self> {
        dotenv::dotenv().ok();

        let hostname = env::var("HASHVAULT_HOSTNAME").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port = env::var("HASHVAULT_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse()
            .map_err(|_| VaultError::Config("Invalid port number".to_string()))?;

        let directory: PathBuf = env::var("HASHVAULT_STORAGE_DIR")
            .unwrap_or_else(|_| "./uploads".to_string())
            .into();
        let format = env::var("HASHVAULT_FORMAT")
            .unwrap_or_else(|_| "webp".to_string())
            .parse()
            .map_err(VaultError::Config)?;
        let max_upload_bytes = env::var("HASHVAULT_MAX_UPLOAD_BYTES")
            .unwrap_or_else(|_| validate::MAX_UPLOAD_BYTES.to_string())
            .parse()
            .map_err(|_| VaultError::Config("Invalid upload limit".to_string()))?;

        let level = env::var("RUST_LOG").unwrap_or_else(|_| DEFAULT_LOG_FILTER.to_string());
        let json = env::var("HASHVAULT_LOG_FORMAT")
            .map(|v| v.eq_ignore_ascii_case("json"))
            .unwrap_or(false);

        Ok(ServerConfig {
            service: ServiceConfig { hostname, port },
            storage: StorageConfig {
                directory,
                format,
                max_upload_bytes,
            },
            logging: LoggingConfig { level, json },
        })
    }

    /// Validate configuration
    pub fn validate(&self) -> VaultResult<()> {
        if self.service.hostname.is_empty() {
            return Err(VaultError::Config("Hostname cannot be empty".to_string()));
        }

        if self.storage.directory.as_os_str().is_empty() {
            return Err(VaultError::Config(
                "Storage directory cannot be empty".to_string(),
            ));
        }

        if self.storage.max_upload_bytes == 0 {
            return Err(VaultError::Config(
                "Upload limit must be greater than zero".to_string(),
            ));
        }

        Ok(())
    }

    /// HTTP body limit for upload requests
    ///
    /// Base64 text may arrive line-wrapped and with every `/` escaped as `\/`,
    /// so the limit allows two and a half times the encoded length of the
    /// largest upload, plus room for a data-URI prefix and the JSON envelope.
    /// The decoded size check in [`validate::validate_size`] is the real
    /// ceiling.
    pub fn body_limit(&self) -> usize {
        const ENVELOPE_SLACK: usize = 64 * 1024;
        let encoded = validate::encoded_len(self.storage.max_upload_bytes);
        (encoded.saturating_mul(5) / 2).saturating_add(ENVELOPE_SLACK)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = ServerConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.storage.format, OutputFormat::WebP);
        assert_eq!(config.storage.max_upload_bytes, 10 * 1024 * 1024);
    }

    #[test]
    fn test_validate_rejects_empty_values() {
        let mut config = ServerConfig::default();
        config.storage.directory = PathBuf::new();
        assert!(config.validate().is_err());

        let mut config = ServerConfig::default();
        config.service.hostname.clear();
        assert!(config.validate().is_err());

        let mut config = ServerConfig::default();
        config.storage.max_upload_bytes = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_body_limit_fits_largest_upload() {
        let config = ServerConfig::default();
        let encoded = validate::encoded_len(config.storage.max_upload_bytes);
        assert!(config.body_limit() > encoded + "data:image/png;base64,".len());

        // Every character escaped plus an escaped CRLF every 76 columns
        let worst = 2 * encoded + 4 * encoded.div_ceil(76);
        assert!(config.body_limit() > worst);
    }
}
