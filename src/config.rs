//! Configuration types for imagegen-probe
//!
//! Configuration is passed explicitly into each operation rather than read
//! from ambient global state. A [`ProviderConfig`] describes one backend
//! (key, base URL, model); a [`PollConfig`] bounds one poll loop.

use crate::types::Provider;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Backend connection configuration
///
/// One value per backend; constructed by the caller (key loading and
/// config-file parsing are caller concerns).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Which backend shape to speak
    pub provider: Provider,

    /// API key. How it is placed on the wire depends on the provider:
    /// `Bearer` scheme, raw header value, or a dedicated `x-key` header.
    pub api_key: String,

    /// Base URL without a trailing slash, e.g. `https://api.example.com`
    pub base_url: String,

    /// Model identifier. For the replicate-compatible shape this is the full
    /// owner-qualified slug (e.g. `black-forest-labs/flux-dev`); for the
    /// others it is the bare model name or slug.
    pub model: String,

    /// Timeout applied to the submission call (default: 60s)
    #[serde(default = "default_submit_timeout")]
    pub submit_timeout: Duration,
}

impl ProviderConfig {
    /// Create a config with the default submission timeout
    pub fn new(
        provider: Provider,
        api_key: impl Into<String>,
        base_url: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            provider,
            api_key: api_key.into(),
            base_url: base_url.into(),
            model: model.into(),
            submit_timeout: default_submit_timeout(),
        }
    }

    /// Base URL with any trailing slash removed
    pub(crate) fn base(&self) -> &str {
        self.base_url.trim_end_matches('/')
    }
}

/// Poll loop configuration
///
/// Bounds a single job's status-fetch loop. The defaults mirror typical
/// generation latencies: 30 attempts, 2 seconds apart.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PollConfig {
    /// Maximum number of status fetches before giving up with a timeout
    /// result (default: 30)
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Fixed sleep between non-terminal results (default: 2s)
    #[serde(default = "default_interval")]
    pub interval: Duration,

    /// Fixed delay before the first status fetch (default: none). Some
    /// backends need a warm-up before the first check is meaningful.
    #[serde(default)]
    pub initial_delay: Duration,

    /// Timeout applied to each individual status fetch (default: 30s)
    #[serde(default = "default_request_timeout")]
    pub request_timeout: Duration,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            interval: default_interval(),
            initial_delay: Duration::ZERO,
            request_timeout: default_request_timeout(),
        }
    }
}

fn default_submit_timeout() -> Duration {
    Duration::from_secs(60)
}

fn default_max_attempts() -> u32 {
    30
}

fn default_interval() -> Duration {
    Duration::from_secs(2)
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(30)
}
