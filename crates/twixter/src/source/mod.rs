//! The remote social-graph source.
//!
//! - [`client`] - `ProfileSource` trait and the HTTP-backed `TwitterClient`
//! - [`pagination`] - cursor-driven fetching with bounded retry
//! - [`types`] - wire payloads and cursor sentinels
//! - [`error`] - `SourceError` and transient classification
//! - [`rate_limit`] - proactive request pacing

pub mod client;
pub mod error;
pub mod pagination;
pub mod rate_limit;
pub mod types;

pub use client::{DEFAULT_BASE_URL, ProfileSource, TwitterClient};
pub use error::{SourceError, short_error_message};
pub use pagination::{FetchError, FetchOptions, FetchOutcome, fetch_all};
pub use rate_limit::ApiRateLimiter;
pub use types::{END_CURSOR, MAX_PAGE_SIZE, PageRequest, RawUser, START_CURSOR, UserPage};
