//! Encore response cache.
//!
//! - **L1 (Response Cache)**: rendered HTTP responses keyed by path and query
//! - **Tag registry**: which responses depend on which content tags
//!
//! ## Configuration
//!
//! Cache behavior is controlled via `encore.toml`:
//!
//! ```toml
//! [cache]
//! enable_l1_cache = true
//! l1_response_limit = 200
//! l1_response_body_limit_bytes = 524288
//! ```

mod config;
pub mod deps;
mod invalidator;
mod keys;
mod lock;
mod middleware;
mod registry;
mod store;

pub use config::CacheConfig;
pub use invalidator::{CacheInvalidator, InvalidationError, TagInvalidator};
pub use keys::{CacheTag, L1Key, OutputFormat, hash_query};
pub use middleware::{CacheState, response_cache_layer};
pub use registry::{CacheRegistry, StoreOutcome};
pub use store::{CachedResponse, L1Store};
