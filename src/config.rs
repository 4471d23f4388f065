//! Editor configuration.

use crate::error::{MagEditError, Result};
use std::path::PathBuf;
use std::time::Duration;

/// Environment variable holding the generation API token.
pub const API_TOKEN_ENV: &str = "BRIA_API_TOKEN";

/// Generation endpoint of the remote service.
pub const DEFAULT_GENERATE_URL: &str = "https://engine.prod.bria-api.com/v2/image/generate";

/// Builder for [`EditorConfig`].
#[derive(Debug, Clone)]
pub struct EditorConfigBuilder {
    api_token: Option<String>,
    generate_url: String,
    poll_interval: Duration,
    max_attempts: u32,
    retention: Duration,
    store_quota: Option<u64>,
    data_dir: Option<PathBuf>,
    session_dir: Option<PathBuf>,
}

impl Default for EditorConfigBuilder {
    fn default() -> Self {
        Self {
            api_token: None,
            generate_url: DEFAULT_GENERATE_URL.to_string(),
            poll_interval: Duration::from_secs(2),
            max_attempts: 30,
            retention: Duration::from_secs(60 * 60),
            store_quota: Some(5 * 1024 * 1024),
            data_dir: None,
            session_dir: None,
        }
    }
}

impl EditorConfigBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the API token. Falls back to `BRIA_API_TOKEN` at call time.
    pub fn api_token(mut self, token: impl Into<String>) -> Self {
        self.api_token = Some(token.into());
        self
    }

    /// Overrides the generation endpoint.
    pub fn generate_url(mut self, url: impl Into<String>) -> Self {
        self.generate_url = url.into();
        self
    }

    /// Sets the fixed delay between status checks.
    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Sets how many status checks are made before giving up.
    pub fn max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts;
        self
    }

    /// Sets how long gallery entries stay visible.
    pub fn retention(mut self, retention: Duration) -> Self {
        self.retention = retention;
        self
    }

    /// Sets the byte quota of the local stores; `None` disables it.
    pub fn store_quota(mut self, quota: Option<u64>) -> Self {
        self.store_quota = quota;
        self
    }

    /// Sets the directory for the long-lived store (gallery).
    pub fn data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.data_dir = Some(dir.into());
        self
    }

    /// Sets the directory for the session store (working image).
    pub fn session_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.session_dir = Some(dir.into());
        self
    }

    /// Builds the configuration, resolving default directories.
    pub fn build(self) -> Result<EditorConfig> {
        if self.max_attempts == 0 {
            return Err(MagEditError::InvalidRequest(
                "max_attempts must be at least 1".into(),
            ));
        }

        let data_dir = match self.data_dir {
            Some(dir) => dir,
            None => dirs::data_dir()
                .map(|dir| dir.join("magedit"))
                .ok_or_else(|| {
                    MagEditError::InvalidRequest("could not determine a data directory".into())
                })?,
        };
        let session_dir = match self.session_dir {
            Some(dir) => dir,
            None => default_session_dir(dirs::runtime_dir(), dirs::cache_dir())?,
        };

        Ok(EditorConfig {
            api_token: self.api_token,
            generate_url: self.generate_url,
            poll_interval: self.poll_interval,
            max_attempts: self.max_attempts,
            retention: self.retention,
            store_quota: self.store_quota,
            data_dir,
            session_dir,
        })
    }
}

/// Per-user session directory: `$XDG_RUNTIME_DIR/magedit`, else
/// `<cache dir>/magedit/session`. Never the shared temp dir.
fn default_session_dir(runtime: Option<PathBuf>, cache: Option<PathBuf>) -> Result<PathBuf> {
    runtime
        .map(|dir| dir.join("magedit"))
        .or_else(|| cache.map(|dir| dir.join("magedit").join("session")))
        .ok_or_else(|| {
            MagEditError::InvalidRequest("could not determine a session directory".into())
        })
}

/// Picks the explicit token, else the value `env` returns for
/// [`API_TOKEN_ENV`]. Blank values count as missing.
fn resolve_token(
    explicit: Option<&str>,
    env: impl FnOnce(&str) -> Option<String>,
) -> Result<String> {
    explicit
        .map(str::to_string)
        .or_else(|| env(API_TOKEN_ENV))
        .filter(|token| !token.trim().is_empty())
        .ok_or_else(|| {
            MagEditError::Auth(format!("{API_TOKEN_ENV} not set and no API token provided"))
        })
}

/// Resolved editor configuration.
#[derive(Debug, Clone)]
pub struct EditorConfig {
    api_token: Option<String>,
    /// Generation endpoint.
    pub generate_url: String,
    /// Fixed delay between status checks.
    pub poll_interval: Duration,
    /// Status checks before the poll gives up.
    pub max_attempts: u32,
    /// Gallery retention window.
    pub retention: Duration,
    /// Byte quota applied to each local store.
    pub store_quota: Option<u64>,
    /// Long-lived store directory.
    pub data_dir: PathBuf,
    /// Session store directory.
    pub session_dir: PathBuf,
}

impl EditorConfig {
    /// Creates a new [`EditorConfigBuilder`].
    pub fn builder() -> EditorConfigBuilder {
        EditorConfigBuilder::new()
    }

    /// Resolves the API token. Read at call time so a token exported after
    /// startup is picked up.
    pub fn api_token(&self) -> Result<String> {
        resolve_token(self.api_token.as_deref(), |key| std::env::var(key).ok())
    }

    /// Whether a token is available right now.
    pub fn has_api_token(&self) -> bool {
        self.api_token().is_ok()
    }
}
