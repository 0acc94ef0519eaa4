//! Configuration management for docforge
//!
//! Hierarchical configuration with precedence: CLI > environment >
//! `docforge.toml` > defaults. The file layer is optional; a missing config
//! file is not an error, a malformed one is.
//!
//! Secrets never live in the file: the issue-tracker token is read from an
//! environment variable whose *name* the file may override.

use camino::{Utf8Path, Utf8PathBuf};
use serde::Deserialize;
use std::env;
use std::time::Duration;

use docforge_utils::error::ConfigError;

/// Default backend knowledge-service base URL
pub const DEFAULT_BACKEND_URL: &str = "http://localhost:8000";

/// Environment variable holding the issue-tracker token by default
pub const DEFAULT_TRACKER_TOKEN_ENV: &str = "DOCFORGE_TRACKER_TOKEN";

const DEFAULT_CACHE_DIR: &str = ".docforge/cache";
const DEFAULT_BACKEND_TTL_SECS: u64 = 3600;
const DEFAULT_GUIDELINE_TTL_SECS: u64 = 1800;
const DEFAULT_SITE_TTL_SECS: u64 = 600;
const DEFAULT_MERGE_TTL_SECS: u64 = 600;
const DEFAULT_SESSION_TTL_SECS: u64 = 3600;
const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;

/// TTLs for the fingerprint cache, one per call bucket
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheTtls {
    /// Backend analysis/search calls
    pub backend: Duration,
    /// Raw guideline lookups
    pub guideline: Duration,
    /// Site-token resolution (site list pulls)
    pub site: Duration,
}

/// Fully resolved runtime configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Backend knowledge-service base URL
    pub backend_url: String,
    /// Issue-tracker base URL; tracker integration is off when absent
    pub tracker_url: Option<String>,
    /// Issue-tracker bearer token, read from the environment
    pub tracker_token: Option<String>,
    /// Default site id or name used when the caller names none
    pub default_site: Option<String>,
    /// Optional external database connection string (table-spec input only)
    pub external_db_url: Option<String>,
    /// Optional external database type tag
    pub external_db_type: Option<String>,
    /// Root directory for the fingerprint cache
    pub cache_root: Utf8PathBuf,
    /// Fingerprint-cache TTLs
    pub cache_ttls: CacheTtls,
    /// TTL of the in-memory merged-guideline cache
    pub merge_ttl: Duration,
    /// Workflow session TTL
    pub session_ttl: Duration,
    /// Bound on every outbound HTTP call
    pub http_timeout: Duration,
    /// Suppress diagnostic output
    pub quiet: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            backend_url: DEFAULT_BACKEND_URL.to_string(),
            tracker_url: None,
            tracker_token: None,
            default_site: None,
            external_db_url: None,
            external_db_type: None,
            cache_root: Utf8PathBuf::from(DEFAULT_CACHE_DIR),
            cache_ttls: CacheTtls {
                backend: Duration::from_secs(DEFAULT_BACKEND_TTL_SECS),
                guideline: Duration::from_secs(DEFAULT_GUIDELINE_TTL_SECS),
                site: Duration::from_secs(DEFAULT_SITE_TTL_SECS),
            },
            merge_ttl: Duration::from_secs(DEFAULT_MERGE_TTL_SECS),
            session_ttl: Duration::from_secs(DEFAULT_SESSION_TTL_SECS),
            http_timeout: Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS),
            quiet: false,
        }
    }
}

/// `docforge.toml` layout
#[derive(Debug, Clone, Default, Deserialize)]
struct FileConfig {
    #[serde(default)]
    backend: BackendSection,
    #[serde(default)]
    tracker: TrackerSection,
    #[serde(default)]
    site: SiteSection,
    #[serde(default)]
    cache: CacheSection,
    #[serde(default)]
    workflow: WorkflowSection,
    #[serde(default)]
    database: DatabaseSection,
    #[serde(default)]
    quiet: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct BackendSection {
    url: Option<String>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct TrackerSection {
    url: Option<String>,
    /// Name of the env var holding the token (never the token itself)
    token_env: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct SiteSection {
    default: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct CacheSection {
    root: Option<String>,
    backend_ttl_secs: Option<u64>,
    guideline_ttl_secs: Option<u64>,
    site_ttl_secs: Option<u64>,
    merge_ttl_secs: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct WorkflowSection {
    session_ttl_secs: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct DatabaseSection {
    url: Option<String>,
    kind: Option<String>,
}

impl Config {
    /// Resolve configuration from defaults, an optional `docforge.toml`, and
    /// environment variables, in ascending precedence.
    ///
    /// `file` forces a specific config path; otherwise `./docforge.toml` is
    /// used when present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` when an explicitly named file cannot be read,
    /// when any config file fails to parse, or when a TTL is zero.
    pub fn load(file: Option<&Utf8Path>) -> Result<Self, ConfigError> {
        let file_config = Self::read_file_layer(file)?;
        let mut config = Self::default();
        config.apply_file(&file_config);
        config.apply_env();
        config.validate()?;
        Ok(config)
    }

    fn read_file_layer(file: Option<&Utf8Path>) -> Result<FileConfig, ConfigError> {
        let path = match file {
            Some(explicit) => {
                if !explicit.exists() {
                    return Err(ConfigError::Read {
                        path: explicit.to_string(),
                        reason: "file does not exist".to_string(),
                    });
                }
                explicit.to_owned()
            }
            None => {
                let discovered = Utf8PathBuf::from("docforge.toml");
                if !discovered.exists() {
                    return Ok(FileConfig::default());
                }
                discovered
            }
        };

        let text = std::fs::read_to_string(&path).map_err(|err| ConfigError::Read {
            path: path.to_string(),
            reason: err.to_string(),
        })?;
        toml::from_str(&text).map_err(|err| ConfigError::Parse {
            path: path.to_string(),
            reason: err.to_string(),
        })
    }

    fn apply_file(&mut self, file: &FileConfig) {
        if let Some(url) = &file.backend.url {
            self.backend_url = url.clone();
        }
        if let Some(secs) = file.backend.timeout_secs {
            self.http_timeout = Duration::from_secs(secs);
        }
        if let Some(url) = &file.tracker.url {
            self.tracker_url = Some(url.clone());
        }
        let token_env = file
            .tracker
            .token_env
            .as_deref()
            .unwrap_or(DEFAULT_TRACKER_TOKEN_ENV);
        self.tracker_token = env::var(token_env).ok();
        if let Some(site) = &file.site.default {
            self.default_site = Some(site.clone());
        }
        if let Some(root) = &file.cache.root {
            self.cache_root = Utf8PathBuf::from(root);
        }
        if let Some(secs) = file.cache.backend_ttl_secs {
            self.cache_ttls.backend = Duration::from_secs(secs);
        }
        if let Some(secs) = file.cache.guideline_ttl_secs {
            self.cache_ttls.guideline = Duration::from_secs(secs);
        }
        if let Some(secs) = file.cache.site_ttl_secs {
            self.cache_ttls.site = Duration::from_secs(secs);
        }
        if let Some(secs) = file.cache.merge_ttl_secs {
            self.merge_ttl = Duration::from_secs(secs);
        }
        if let Some(secs) = file.workflow.session_ttl_secs {
            self.session_ttl = Duration::from_secs(secs);
        }
        if let Some(url) = &file.database.url {
            self.external_db_url = Some(url.clone());
        }
        if let Some(kind) = &file.database.kind {
            self.external_db_type = Some(kind.clone());
        }
        if let Some(quiet) = file.quiet {
            self.quiet = quiet;
        }
    }

    fn apply_env(&mut self) {
        if let Ok(url) = env::var("DOCFORGE_BACKEND_URL") {
            self.backend_url = url;
        }
        if let Ok(url) = env::var("DOCFORGE_TRACKER_URL") {
            self.tracker_url = Some(url);
        }
        if let Ok(token) = env::var(DEFAULT_TRACKER_TOKEN_ENV) {
            self.tracker_token = Some(token);
        }
        if let Ok(site) = env::var("DOCFORGE_DEFAULT_SITE") {
            self.default_site = Some(site);
        }
        if let Ok(url) = env::var("DOCFORGE_DB_URL") {
            self.external_db_url = Some(url);
        }
        if let Ok(kind) = env::var("DOCFORGE_DB_TYPE") {
            self.external_db_type = Some(kind);
        }
        if let Ok(root) = env::var("DOCFORGE_CACHE_DIR") {
            self.cache_root = Utf8PathBuf::from(root);
        }
        if let Ok(quiet) = env::var("DOCFORGE_QUIET") {
            self.quiet = matches!(quiet.as_str(), "1" | "true" | "yes");
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.backend_url.trim().is_empty() {
            return Err(ConfigError::Invalid {
                reason: "backend URL must not be empty".to_string(),
            });
        }
        for (name, ttl) in [
            ("backend", self.cache_ttls.backend),
            ("guideline", self.cache_ttls.guideline),
            ("site", self.cache_ttls.site),
            ("merge", self.merge_ttl),
            ("session", self.session_ttl),
        ] {
            if ttl.is_zero() {
                return Err(ConfigError::Invalid {
                    reason: format!("{name} TTL must be greater than zero"),
                });
            }
        }
        Ok(())
    }
}
