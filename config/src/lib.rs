//! `~/.lokitos/config.toml`
//!
//! ```toml
//! [backend]
//! url = "https://xyz.example.co"
//! anon_key = "${LOKITOS_ANON_KEY}"
//! timeout_secs = 30
//! require_https = true
//!
//! [retry]
//! max_retries = 2
//! initial_delay_ms = 300
//! max_delay_ms = 5000
//!
//! [feed.posts]
//! buffer_size_max = 20
//! cleanup_threshold = 25
//! load_threshold = 5
//! load_batch = 10
//!
//! [scroll]
//! memory_capacity = 32
//! ```
//!
//! Every section and key is optional. String values may reference
//! environment variables as `${VAR}`. `LOKITOS_BACKEND_URL` and
//! `LOKITOS_ANON_KEY` take precedence over the file.

use std::fmt;
use std::path::{Path, PathBuf};
use std::{env, fs};

use serde::Deserialize;
use thiserror::Error;

pub const BACKEND_URL_ENV: &str = "LOKITOS_BACKEND_URL";
pub const ANON_KEY_ENV: &str = "LOKITOS_ANON_KEY";

const fn default_true() -> bool {
    true
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

impl ConfigError {
    #[must_use]
    pub fn path(&self) -> &Path {
        match self {
            ConfigError::Read { path, .. } | ConfigError::Parse { path, .. } => path,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct LokitosConfig {
    pub backend: Option<BackendSection>,
    pub retry: Option<RetrySection>,
    pub feed: Option<FeedSection>,
    pub scroll: Option<ScrollSection>,
}

#[derive(Deserialize)]
pub struct BackendSection {
    pub url: Option<String>,
    pub anon_key: Option<String>,
    pub timeout_secs: Option<u64>,
    /// Refuse plain `http://` URLs. Turn off only for a local backend.
    #[serde(default = "default_true")]
    pub require_https: bool,
}

impl Default for BackendSection {
    fn default() -> Self {
        Self {
            url: None,
            anon_key: None,
            timeout_secs: None,
            require_https: true,
        }
    }
}

// Manual Debug impl to prevent leaking the key in logs.
impl fmt::Debug for BackendSection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BackendSection")
            .field("url", &self.url)
            .field(
                "anon_key",
                &if self.anon_key.is_some() {
                    "[REDACTED]"
                } else {
                    "None"
                },
            )
            .field("timeout_secs", &self.timeout_secs)
            .field("require_https", &self.require_https)
            .finish()
    }
}

#[derive(Debug, Default, Clone, Copy, Deserialize)]
pub struct RetrySection {
    pub max_retries: Option<u32>,
    pub initial_delay_ms: Option<u64>,
    pub max_delay_ms: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct FeedSection {
    pub posts: Option<PolicySection>,
    pub videos: Option<PolicySection>,
}

/// Overrides for one feed's window sizes. Missing keys keep the built-in default.
#[derive(Debug, Default, Clone, Copy, Deserialize)]
pub struct PolicySection {
    pub buffer_size_max: Option<usize>,
    pub cleanup_threshold: Option<usize>,
    pub load_threshold: Option<usize>,
    pub load_batch: Option<usize>,
}

#[derive(Debug, Default, Clone, Copy, Deserialize)]
pub struct ScrollSection {
    pub memory_capacity: Option<usize>,
}

/// Replace `${VAR}` with the variable's value. Unset variables become empty;
/// an unclosed `${` is kept literally.
#[must_use]
pub fn expand_env_vars(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut rest = value;

    while let Some(start) = rest.find("${") {
        let Some(len) = rest[start + 2..].find('}') else {
            break;
        };
        out.push_str(&rest[..start]);
        let var = &rest[start + 2..start + 2 + len];
        if !var.is_empty() {
            out.push_str(&env::var(var).unwrap_or_default());
        }
        rest = &rest[start + 2 + len + 1..];
    }

    out.push_str(rest);
    out
}

impl LokitosConfig {
    /// Load the user's config file. `Ok(None)` when there is none.
    pub fn load() -> Result<Option<Self>, ConfigError> {
        match config_path() {
            Some(path) => Self::load_from(&path),
            None => Ok(None),
        }
    }

    pub fn load_from(path: &Path) -> Result<Option<Self>, ConfigError> {
        if !path.exists() {
            return Ok(None);
        }

        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(err) => {
                tracing::warn!(path = %path.display(), error = %err, "Failed to read config");
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source: err,
                });
            }
        };

        match toml::from_str(&content) {
            Ok(config) => Ok(Some(config)),
            Err(err) => {
                tracing::warn!(path = %path.display(), error = %err, "Failed to parse config");
                Err(ConfigError::Parse {
                    path: path.to_path_buf(),
                    source: err,
                })
            }
        }
    }

    #[must_use]
    pub fn path() -> Option<PathBuf> {
        config_path()
    }

    /// Backend URL from the environment, else from the file.
    #[must_use]
    pub fn backend_url(&self) -> Option<String> {
        self.backend_url_with(|name| env::var(name).ok())
    }

    /// Anon key from the environment, else from the file.
    #[must_use]
    pub fn anon_key(&self) -> Option<String> {
        self.anon_key_with(|name| env::var(name).ok())
    }

    fn backend_url_with(&self, lookup: impl Fn(&str) -> Option<String>) -> Option<String> {
        resolve(
            lookup(BACKEND_URL_ENV),
            self.backend.as_ref().and_then(|b| b.url.as_deref()),
        )
    }

    fn anon_key_with(&self, lookup: impl Fn(&str) -> Option<String>) -> Option<String> {
        resolve(
            lookup(ANON_KEY_ENV),
            self.backend.as_ref().and_then(|b| b.anon_key.as_deref()),
        )
    }

    #[must_use]
    pub fn require_https(&self) -> bool {
        self.backend.as_ref().is_none_or(|b| b.require_https)
    }
}

fn resolve(from_env: Option<String>, from_file: Option<&str>) -> Option<String> {
    from_env
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .or_else(|| {
            from_file
                .map(|v| expand_env_vars(v).trim().to_string())
                .filter(|v| !v.is_empty())
        })
}

/// `~/.lokitos`
#[must_use]
pub fn data_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".lokitos"))
}

#[must_use]
pub fn config_path() -> Option<PathBuf> {
    data_dir().map(|dir| dir.join("config.toml"))
}
