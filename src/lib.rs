//! Server-side Statsig client with local rule evaluation.
//!
//! Gate checks and dynamic config lookups are evaluated in-process against a
//! rule set that is periodically synced from the Statsig API, so the hot path
//! does not pay a network round trip per check. Exposure events are buffered
//! and shipped in batches in the background.
//!
//! To change the default request timeout set the STATSIG_TIMEOUT_MS
//! environment variable to the desired timeout value.
//!
//! Reference: https://docs.statsig.com/http-api
//!
//! ```ignore
//! let client = Client::new("secret-...".to_string(), StatsigOptions::default()).await?;
//! let user = StatsigUser::new("user-123".to_string(), "production".to_string());
//! if client.check_gate("new_checkout".to_string(), user).await {
//!     // feature is on for this user
//! }
//! ```
mod client;
mod evaluator;
mod http;
mod logger;
mod store;

pub mod models;
pub mod providers;

pub use crate::client::Client;
pub use crate::models::{DynamicConfig, StatsigOptions, StatsigUser};
