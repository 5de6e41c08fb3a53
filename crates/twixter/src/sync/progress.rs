//! Progress reporting for sync operations.
//!
//! Callers that want live feedback (a CLI progress bar, a job log) pass a
//! [`ProgressCallback`]. Every stage of a sync reports through [`emit`], so a
//! missing callback costs nothing.

use crate::profile::RelationKind;

/// Progress events emitted during a sync.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub enum SyncProgress {
    /// Starting to sync one user.
    SyncingUser {
        username: String,
    },

    /// The user's own profile was fetched and saved.
    ProfileSaved {
        username: String,
        followers_count: u64,
        followings_count: u64,
    },

    /// Starting to page through a relation.
    FetchingRelation {
        username: String,
        relation: RelationKind,
    },

    /// Fetched a page of connections.
    FetchedPage {
        username: String,
        relation: RelationKind,
        /// Page number (1-indexed).
        page: u32,
        /// Users on this page.
        count: usize,
        /// Running total for this relation.
        total_so_far: usize,
    },

    /// A page request failed transiently and will be retried.
    PageRetry {
        username: String,
        relation: RelationKind,
        cursor: i64,
        /// The attempt that just failed (1-indexed).
        attempt: u32,
        retry_after_ms: u64,
    },

    /// Pagination for a relation stopped.
    FetchComplete {
        username: String,
        relation: RelationKind,
        total: usize,
        /// False when an error cut pagination short.
        complete: bool,
    },

    /// Connections were persisted and edges attached.
    EdgesAttached {
        username: String,
        relation: RelationKind,
        connections: usize,
        new_edges: u64,
    },

    /// A relation was not persisted because its fetch was incomplete.
    RelationSkipped {
        username: String,
        relation: RelationKind,
        error: String,
    },

    /// Syncing a batch of users.
    SyncingUsers {
        count: usize,
    },

    /// Finished syncing a batch of users.
    SyncUsersComplete {
        successful: usize,
        failed: usize,
    },

    /// Non-fatal warning.
    Warning {
        message: String,
    },
}

/// Callback for progress updates during sync operations.
pub type ProgressCallback = Box<dyn Fn(SyncProgress) + Send + Sync>;

/// Emit a progress event if a callback is provided.
#[inline]
pub fn emit(on_progress: Option<&ProgressCallback>, event: SyncProgress) {
    if let Some(cb) = on_progress {
        cb(event);
    }
}
