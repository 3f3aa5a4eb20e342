//! Turns the optional config file into concrete client and feed settings.

use std::time::Duration;

use anyhow::{Context, Result, bail};

use lokitos_backend::retry::RetryConfig;
use lokitos_backend::{AnonKey, BackendConfig};
use lokitos_config::{LokitosConfig, PolicySection, RetrySection};
use lokitos_core::BufferPolicy;
use lokitos_core::scroll_memory::DEFAULT_CAPACITY;

#[derive(Debug)]
pub struct Settings {
    pub backend: BackendConfig,
    pub posts: BufferPolicy,
    pub videos: BufferPolicy,
    pub scroll_memory_capacity: usize,
}

impl Settings {
    pub fn from_config(config: &LokitosConfig) -> Result<Self> {
        let Some(url) = config.backend_url() else {
            bail!(
                "no backend url: set {} or [backend] url in {}",
                lokitos_config::BACKEND_URL_ENV,
                config_hint()
            );
        };
        let Some(anon_key) = config.anon_key() else {
            bail!(
                "no anon key: set {} or [backend] anon_key in {}",
                lokitos_config::ANON_KEY_ENV,
                config_hint()
            );
        };

        let mut backend = BackendConfig::new(&url, AnonKey::new(anon_key))
            .with_context(|| format!("invalid backend url {url:?}"))?
            .with_require_https(config.require_https())
            .with_retry(retry_config(config.retry.unwrap_or_default()));
        if let Some(secs) = config.backend.as_ref().and_then(|b| b.timeout_secs) {
            backend = backend.with_timeout(Duration::from_secs(secs));
        }

        let feed = config.feed.as_ref();
        let posts = buffer_policy(feed.and_then(|f| f.posts), BufferPolicy::POSTS)
            .context("invalid [feed.posts]")?;
        let videos = buffer_policy(feed.and_then(|f| f.videos), BufferPolicy::VIDEOS)
            .context("invalid [feed.videos]")?;

        let scroll_memory_capacity = config
            .scroll
            .and_then(|s| s.memory_capacity)
            .unwrap_or(DEFAULT_CAPACITY);

        Ok(Self {
            backend,
            posts,
            videos,
            scroll_memory_capacity,
        })
    }
}

fn config_hint() -> String {
    LokitosConfig::path().map_or_else(
        || "~/.lokitos/config.toml".to_string(),
        |p| p.display().to_string(),
    )
}

fn retry_config(section: RetrySection) -> RetryConfig {
    let defaults = RetryConfig::default();
    RetryConfig {
        max_retries: section.max_retries.unwrap_or(defaults.max_retries),
        initial_delay: section
            .initial_delay_ms
            .map_or(defaults.initial_delay, Duration::from_millis),
        max_delay: section
            .max_delay_ms
            .map_or(defaults.max_delay, Duration::from_millis),
        jitter_factor: defaults.jitter_factor,
    }
}

fn buffer_policy(
    section: Option<PolicySection>,
    defaults: BufferPolicy,
) -> Result<BufferPolicy, lokitos_core::PolicyError> {
    let Some(section) = section else {
        return Ok(defaults);
    };
    BufferPolicy::new(
        section.buffer_size_max.unwrap_or(defaults.buffer_size_max),
        section
            .cleanup_threshold
            .unwrap_or(defaults.cleanup_threshold),
        section.load_threshold.unwrap_or(defaults.load_threshold),
        section.load_batch.unwrap_or(defaults.load_batch),
    )
}
