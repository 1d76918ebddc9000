//! Cache configuration.
//!
//! Controls the L1 response cache via the `[cache]` section of `encore.toml`.

use std::num::NonZeroUsize;

use serde::Deserialize;

const DEFAULT_L1_RESPONSE_LIMIT: usize = 200;
const DEFAULT_L1_RESPONSE_BODY_LIMIT_BYTES: usize = 512 * 1024;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Enable L1 response cache.
    pub enable_l1_cache: bool,
    /// Maximum HTTP responses in L1 cache.
    pub l1_response_limit: usize,
    /// Responses with larger bodies are served but never stored.
    pub l1_response_body_limit_bytes: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enable_l1_cache: true,
            l1_response_limit: DEFAULT_L1_RESPONSE_LIMIT,
            l1_response_body_limit_bytes: DEFAULT_L1_RESPONSE_BODY_LIMIT_BYTES,
        }
    }
}

impl From<&crate::config::CacheSettings> for CacheConfig {
    fn from(settings: &crate::config::CacheSettings) -> Self {
        Self {
            enable_l1_cache: settings.enable_l1_cache,
            l1_response_limit: settings.l1_response_limit,
            l1_response_body_limit_bytes: settings.l1_response_body_limit_bytes,
        }
    }
}

impl CacheConfig {
    /// Returns the L1 response limit as NonZeroUsize, clamping to 1 if zero.
    pub fn l1_response_limit_non_zero(&self) -> NonZeroUsize {
        NonZeroUsize::new(self.l1_response_limit).unwrap_or(NonZeroUsize::MIN)
    }
}
