//! Configuration module for FieldSync.
//!
//! Provides typed configuration structs that map to the YAML configuration file,
//! with loading, validation, defaults, and a builder pattern for programmatic use.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Config struct with sub-sections
// ---------------------------------------------------------------------------

/// Top-level configuration for FieldSync.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    pub api: ApiConfig,
    pub storage: StorageConfig,
    pub sync: SyncConfig,
    pub logging: LoggingConfig,
}

/// Remote inspection API settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Base URL of the inspection API.
    pub base_url: String,
    /// Bearer token for API requests. `None` until the user configures one.
    pub auth_token: Option<String>,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

/// Local storage settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Path of the SQLite catalog database.
    pub database_path: PathBuf,
    /// Directory for downloaded asset content.
    pub content_dir: PathBuf,
}

/// Sync engine settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Maximum concurrent asset downloads within one sync pass.
    pub download_concurrency: u32,
    /// File types whose content is additionally cached inline in the
    /// database (lowercase, no dot).
    pub inline_content_types: Vec<String>,
    /// Inline caching is skipped for payloads larger than this.
    pub inline_content_max_bytes: u64,
}

/// Logging / tracing settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level: `trace`, `debug`, `info`, `warn`, or `error`.
    pub level: String,
}

// ---------------------------------------------------------------------------
// Config::load()
// ---------------------------------------------------------------------------

impl Config {
    /// Load configuration from a YAML file at `path`.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Try to load from `path`; fall back to [`Config::default`] on any error.
    pub fn load_or_default(path: &Path) -> Self {
        Self::load(path).unwrap_or_default()
    }

    /// Platform-appropriate default path for the configuration file.
    ///
    /// Typically `$XDG_CONFIG_HOME/fieldsync/config.yaml` on Linux.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("~/.config"))
            .join("fieldsync")
            .join("config.yaml")
    }
}

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://inspect.enigmora.com/api/v1".to_string(),
            auth_token: None,
            timeout_secs: 30,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        let data_dir = dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("~/.local/share"))
            .join("fieldsync");
        Self {
            database_path: data_dir.join("fieldsync.db"),
            content_dir: data_dir.join("content"),
        }
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            download_concurrency: 4,
            inline_content_types: vec![
                "json".to_string(),
                "txt".to_string(),
                "csv".to_string(),
            ],
            inline_content_max_bytes: 262_144,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Config::validate()
// ---------------------------------------------------------------------------

/// A single validation error found in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path to the offending field, e.g. `"sync.download_concurrency"`.
    pub field: String,
    /// Human-readable explanation.
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Valid values for `logging.level`.
const VALID_LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

impl Config {
    /// Validate the configuration and return all errors found.
    ///
    /// An empty vector means the configuration is valid.
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        // --- api ---
        if self.api.base_url.trim().is_empty() {
            errors.push(ValidationError {
                field: "api.base_url".into(),
                message: "must not be empty".into(),
            });
        } else if !self.api.base_url.starts_with("http://")
            && !self.api.base_url.starts_with("https://")
        {
            errors.push(ValidationError {
                field: "api.base_url".into(),
                message: format!("must start with http:// or https://: {}", self.api.base_url),
            });
        }
        if self.api.timeout_secs == 0 {
            errors.push(ValidationError {
                field: "api.timeout_secs".into(),
                message: "must be greater than 0".into(),
            });
        }

        // --- storage ---
        if self.storage.database_path.as_os_str().is_empty() {
            errors.push(ValidationError {
                field: "storage.database_path".into(),
                message: "must not be empty".into(),
            });
        }
        if self.storage.content_dir.as_os_str().is_empty() {
            errors.push(ValidationError {
                field: "storage.content_dir".into(),
                message: "must not be empty".into(),
            });
        }

        // --- sync ---
        if self.sync.download_concurrency == 0 || self.sync.download_concurrency > 32 {
            errors.push(ValidationError {
                field: "sync.download_concurrency".into(),
                message: "must be in range 1..=32".into(),
            });
        }
        if self.sync.inline_content_max_bytes == 0 {
            errors.push(ValidationError {
                field: "sync.inline_content_max_bytes".into(),
                message: "must be greater than 0".into(),
            });
        }

        // --- logging ---
        if !VALID_LOG_LEVELS.contains(&self.logging.level.as_str()) {
            errors.push(ValidationError {
                field: "logging.level".into(),
                message: format!(
                    "invalid level '{}'; valid options: {}",
                    self.logging.level,
                    VALID_LOG_LEVELS.join(", ")
                ),
            });
        }

        errors
    }
}

// ---------------------------------------------------------------------------
// ConfigBuilder
// ---------------------------------------------------------------------------

/// Builder for constructing a [`Config`] programmatically.
///
/// Starts from [`Config::default`] and allows selective overrides.
///
/// # Example
///
/// ```rust,no_run
/// use fieldsync_core::config::ConfigBuilder;
/// use std::path::PathBuf;
///
/// let config = ConfigBuilder::new()
///     .api_base_url("https://staging.inspect.enigmora.com/api/v1")
///     .storage_database_path(PathBuf::from("/tmp/fieldsync.db"))
///     .sync_download_concurrency(8)
///     .build();
/// ```
#[derive(Debug, Clone)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Create a new builder initialised with [`Config::default`] values.
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    // --- api ---

    pub fn api_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.config.api.base_url = base_url.into();
        self
    }

    pub fn api_auth_token(mut self, token: impl Into<String>) -> Self {
        self.config.api.auth_token = Some(token.into());
        self
    }

    pub fn api_timeout_secs(mut self, seconds: u64) -> Self {
        self.config.api.timeout_secs = seconds;
        self
    }

    // --- storage ---

    pub fn storage_database_path(mut self, path: PathBuf) -> Self {
        self.config.storage.database_path = path;
        self
    }

    pub fn storage_content_dir(mut self, dir: PathBuf) -> Self {
        self.config.storage.content_dir = dir;
        self
    }

    // --- sync ---

    pub fn sync_download_concurrency(mut self, n: u32) -> Self {
        self.config.sync.download_concurrency = n;
        self
    }

    pub fn sync_inline_content_types(mut self, types: Vec<String>) -> Self {
        self.config.sync.inline_content_types = types;
        self
    }

    pub fn sync_inline_content_max_bytes(mut self, bytes: u64) -> Self {
        self.config.sync.inline_content_max_bytes = bytes;
        self
    }

    // --- logging ---

    pub fn logging_level(mut self, level: impl Into<String>) -> Self {
        self.config.logging.level = level.into();
        self
    }

    // --- build ---

    /// Consume the builder and return the finished [`Config`].
    pub fn build(self) -> Config {
        self.config
    }

    /// Build and validate in one step. Returns `Err` with the list of
    /// validation errors if the configuration is invalid.
    pub fn build_validated(self) -> Result<Config, Vec<ValidationError>> {
        let config = self.build();
        let errors = config.validate();
        if errors.is_empty() {
            Ok(config)
        } else {
            Err(errors)
        }
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    // -- Defaults --

    #[test]
    fn default_config_has_sensible_values() {
        let cfg = Config::default();
        assert_eq!(cfg.api.base_url, "https://inspect.enigmora.com/api/v1");
        assert!(cfg.api.auth_token.is_none());
        assert_eq!(cfg.api.timeout_secs, 30);
        assert!(cfg
            .storage
            .database_path
            .to_string_lossy()
            .contains("fieldsync"));
        assert!(cfg.storage.content_dir.ends_with("fieldsync/content"));
        assert_eq!(cfg.sync.download_concurrency, 4);
        assert_eq!(cfg.sync.inline_content_types, vec!["json", "txt", "csv"]);
        assert_eq!(cfg.sync.inline_content_max_bytes, 262_144);
        assert_eq!(cfg.logging.level, "info");
    }

    #[test]
    fn default_config_passes_validation() {
        let cfg = Config::default();
        let errors = cfg.validate();
        assert!(errors.is_empty(), "unexpected validation errors: {errors:?}");
    }

    // -- Loading --

    #[test]
    fn load_from_yaml_file() {
        let yaml = r#"
api:
  base_url: https://staging.inspect.enigmora.com/api/v1
  auth_token: "token-123"
  timeout_secs: 10
storage:
  database_path: /tmp/fieldsync-test.db
  content_dir: /tmp/fieldsync-content
sync:
  download_concurrency: 8
  inline_content_types: [json]
  inline_content_max_bytes: 1024
logging:
  level: debug
"#;
        let mut tmp = tempfile::NamedTempFile::new().expect("create temp file");
        tmp.write_all(yaml.as_bytes()).unwrap();
        tmp.flush().unwrap();

        let cfg = Config::load(tmp.path()).expect("load config");
        assert_eq!(
            cfg.api.base_url,
            "https://staging.inspect.enigmora.com/api/v1"
        );
        assert_eq!(cfg.api.auth_token, Some("token-123".to_string()));
        assert_eq!(cfg.api.timeout_secs, 10);
        assert_eq!(
            cfg.storage.database_path,
            PathBuf::from("/tmp/fieldsync-test.db")
        );
        assert_eq!(
            cfg.storage.content_dir,
            PathBuf::from("/tmp/fieldsync-content")
        );
        assert_eq!(cfg.sync.download_concurrency, 8);
        assert_eq!(cfg.sync.inline_content_types, vec!["json"]);
        assert_eq!(cfg.sync.inline_content_max_bytes, 1024);
        assert_eq!(cfg.logging.level, "debug");
    }

    #[test]
    fn load_or_default_returns_default_on_missing_file() {
        let cfg = Config::load_or_default(Path::new("/nonexistent/config.yaml"));
        assert_eq!(cfg.sync.download_concurrency, 4);
    }

    #[test]
    fn load_returns_error_on_invalid_yaml() {
        let mut tmp = tempfile::NamedTempFile::new().expect("create temp file");
        tmp.write_all(b"not: [valid: yaml: {{{").unwrap();
        tmp.flush().unwrap();

        let result = Config::load(tmp.path());
        assert!(result.is_err());
    }

    // -- Validation --

    #[test]
    fn validate_catches_empty_base_url() {
        let mut cfg = Config::default();
        cfg.api.base_url = String::new();
        let errors = cfg.validate();
        assert!(errors.iter().any(|e| e.field == "api.base_url"));
    }

    #[test]
    fn validate_catches_non_http_base_url() {
        let mut cfg = Config::default();
        cfg.api.base_url = "ftp://inspect.enigmora.com".to_string();
        let errors = cfg.validate();
        assert!(errors.iter().any(|e| e.field == "api.base_url"));
    }

    #[test]
    fn validate_catches_zero_timeout() {
        let mut cfg = Config::default();
        cfg.api.timeout_secs = 0;
        let errors = cfg.validate();
        assert!(errors.iter().any(|e| e.field == "api.timeout_secs"));
    }

    #[test]
    fn validate_catches_empty_storage_paths() {
        let mut cfg = Config::default();
        cfg.storage.database_path = PathBuf::new();
        cfg.storage.content_dir = PathBuf::new();
        let errors = cfg.validate();
        let fields: Vec<&str> = errors.iter().map(|e| e.field.as_str()).collect();
        assert!(fields.contains(&"storage.database_path"));
        assert!(fields.contains(&"storage.content_dir"));
    }

    #[test]
    fn validate_catches_invalid_download_concurrency() {
        let mut cfg = Config::default();
        cfg.sync.download_concurrency = 0;
        let errors = cfg.validate();
        assert!(errors
            .iter()
            .any(|e| e.field == "sync.download_concurrency"));

        let mut cfg = Config::default();
        cfg.sync.download_concurrency = 33;
        let errors = cfg.validate();
        assert!(errors
            .iter()
            .any(|e| e.field == "sync.download_concurrency"));
    }

    #[test]
    fn validate_catches_zero_inline_max_bytes() {
        let mut cfg = Config::default();
        cfg.sync.inline_content_max_bytes = 0;
        let errors = cfg.validate();
        assert!(errors
            .iter()
            .any(|e| e.field == "sync.inline_content_max_bytes"));
    }

    #[test]
    fn validate_catches_invalid_log_level() {
        let mut cfg = Config::default();
        cfg.logging.level = "verbose".to_string();
        let errors = cfg.validate();
        assert!(errors.iter().any(|e| e.field == "logging.level"));
    }

    #[test]
    fn validate_accepts_all_valid_log_levels() {
        for level in VALID_LOG_LEVELS {
            let mut cfg = Config::default();
            cfg.logging.level = level.to_string();
            let errors = cfg.validate();
            assert!(
                !errors.iter().any(|e| e.field == "logging.level"),
                "level '{level}' should be valid"
            );
        }
    }

    // -- Builder --

    #[test]
    fn builder_starts_from_defaults() {
        let cfg = ConfigBuilder::new().build();
        assert_eq!(cfg.sync.download_concurrency, 4);
        assert_eq!(cfg.logging.level, "info");
    }

    #[test]
    fn builder_overrides_fields() {
        let cfg = ConfigBuilder::new()
            .api_base_url("http://localhost:8080/api/v1")
            .api_auth_token("secret")
            .api_timeout_secs(5)
            .storage_database_path(PathBuf::from("/tmp/db.sqlite"))
            .storage_content_dir(PathBuf::from("/tmp/content"))
            .sync_download_concurrency(2)
            .sync_inline_content_types(vec!["json".to_string(), "xml".to_string()])
            .sync_inline_content_max_bytes(4096)
            .logging_level("trace")
            .build();

        assert_eq!(cfg.api.base_url, "http://localhost:8080/api/v1");
        assert_eq!(cfg.api.auth_token, Some("secret".to_string()));
        assert_eq!(cfg.api.timeout_secs, 5);
        assert_eq!(cfg.storage.database_path, PathBuf::from("/tmp/db.sqlite"));
        assert_eq!(cfg.storage.content_dir, PathBuf::from("/tmp/content"));
        assert_eq!(cfg.sync.download_concurrency, 2);
        assert_eq!(cfg.sync.inline_content_types, vec!["json", "xml"]);
        assert_eq!(cfg.sync.inline_content_max_bytes, 4096);
        assert_eq!(cfg.logging.level, "trace");
    }

    #[test]
    fn builder_build_validated_succeeds_for_valid_config() {
        let result = ConfigBuilder::new().build_validated();
        assert!(result.is_ok());
    }

    #[test]
    fn builder_build_validated_fails_for_invalid_config() {
        let result = ConfigBuilder::new()
            .api_timeout_secs(0)
            .logging_level("nope")
            .build_validated();
        assert!(result.is_err());
        let errors = result.unwrap_err();
        assert!(errors.len() >= 2);
    }

    // -- default_path --

    #[test]
    fn default_path_ends_with_config_yaml() {
        let p = Config::default_path();
        assert!(p.ends_with("fieldsync/config.yaml"));
    }

    // -- ValidationError Display --

    #[test]
    fn validation_error_display() {
        let err = ValidationError {
            field: "api.timeout_secs".into(),
            message: "must be greater than 0".into(),
        };
        assert_eq!(err.to_string(), "api.timeout_secs: must be greater than 0");
    }
}
