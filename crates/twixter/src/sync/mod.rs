//! Profile and follow-graph synchronization.
//!
//! - [`types`] - `SyncOptions`, `SyncReport`, `SyncError`
//! - [`progress`] - `SyncProgress`, `ProgressCallback`, `emit()`
//! - [`engine`] - `sync_user()`, `sync_users()`

pub mod engine;
mod progress;
mod types;

pub use types::{
    DEFAULT_CONCURRENCY, RelationReport, SyncError, SyncOptions, SyncReport, UserSyncResult,
};

pub use progress::{ProgressCallback, SyncProgress, emit};

pub use engine::{sync_user, sync_users};
