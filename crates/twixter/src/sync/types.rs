//! Sync options, reports, and errors.

use thiserror::Error;

use crate::profile::{Profile, RelationKind};
use crate::source::{FetchError, FetchOptions, SourceError};
use crate::store::StoreError;

/// Default number of users synced at once by `sync_users`.
pub const DEFAULT_CONCURRENCY: usize = 4;

/// Options for syncing a user.
#[derive(Debug, Clone)]
pub struct SyncOptions {
    /// Fetch and attach the accounts the user follows.
    pub followings: bool,
    /// Fetch and attach the accounts following the user.
    pub followers: bool,
    /// Pagination settings applied to each relation.
    pub fetch: FetchOptions,
    /// Maximum users synced concurrently by `sync_users`.
    pub concurrency: usize,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            followings: true,
            followers: true,
            fetch: FetchOptions::default(),
            concurrency: DEFAULT_CONCURRENCY,
        }
    }
}

impl SyncOptions {
    /// Whether a relation is enabled.
    pub fn includes(&self, relation: RelationKind) -> bool {
        match relation {
            RelationKind::Followings => self.followings,
            RelationKind::Followers => self.followers,
        }
    }
}

/// Outcome of one relation within a sync.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RelationReport {
    /// Profiles returned by the source, including any from an incomplete fetch.
    pub fetched: usize,
    /// Pages successfully fetched.
    pub pages: u32,
    /// Edges that did not exist before this sync.
    pub new_edges: u64,
    /// Whether the relation was persisted.
    pub attached: bool,
}

/// Result of a successful user sync.
#[derive(Debug, Clone)]
pub struct SyncReport {
    /// The user's profile as saved.
    pub profile: Profile,
    pub followings: Option<RelationReport>,
    pub followers: Option<RelationReport>,
}

impl SyncReport {
    /// Total new edges across both relations.
    pub fn new_edges(&self) -> u64 {
        [&self.followings, &self.followers]
            .into_iter()
            .flatten()
            .map(|r| r.new_edges)
            .sum()
    }
}

/// Per-user result from `sync_users`.
#[derive(Debug)]
pub struct UserSyncResult {
    pub username: String,
    pub result: Result<SyncReport, SyncError>,
}

/// Errors that stop a user sync.
#[derive(Debug, Error)]
pub enum SyncError {
    /// The user's own profile could not be fetched.
    #[error("failed to fetch profile: {0}")]
    Profile(#[source] SourceError),

    /// A relation could not be fetched completely and was not attached.
    #[error("failed to fetch relation: {0}")]
    Fetch(#[from] FetchError),

    /// Persisting the profile or a relation failed.
    #[error("failed to persist: {0}")]
    Store(#[from] StoreError),
}
