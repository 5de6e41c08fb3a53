//! Persistence for profiles and the follow graph.
//!
//! [`GraphStore`] is the seam the sync engine writes through;
//! [`SeaOrmGraphStore`] implements it over any sea-orm connection.
//!
//! Every multi-row write runs in a single transaction. A batch either lands
//! completely or not at all, so a cancelled or failed sync never leaves a
//! half-attached relation behind.

mod edges;
mod errors;
mod profiles;

use std::sync::Arc;

use async_trait::async_trait;
use sea_orm::{DatabaseConnection, DbErr, TransactionTrait};

use crate::codec::from_model;
use crate::profile::{Profile, RelationKind};

pub use edges::{EDGE_CHUNK_SIZE, EdgePair, build_edge_pairs, orient};
pub use errors::{Result, StoreError};
pub use profiles::{LOOKUP_CHUNK_SIZE, UPSERT_CHUNK_SIZE, apply_renames, dedupe_by_username};

/// Storage for profiles and directed follow edges.
#[async_trait]
pub trait GraphStore: Send + Sync {
    /// Load a profile by username.
    async fn get_profile(&self, username: &str) -> Result<Profile>;

    /// Create or overwrite a single profile.
    async fn save_profile(&self, profile: &Profile) -> Result<()> {
        self.save_profiles(std::slice::from_ref(profile))
            .await
            .map(|_| ())
    }

    /// Create or overwrite a batch of profiles atomically.
    ///
    /// Duplicate usernames collapse to their last occurrence. Returns the
    /// number of distinct profiles written.
    async fn save_profiles(&self, profiles: &[Profile]) -> Result<u64>;

    /// Record that `owner` follows each of `followings`. Returns new edges.
    async fn add_followings(&self, owner: &Profile, followings: &[Profile]) -> Result<u64>;

    /// Record that each of `followers` follows `owner`. Returns new edges.
    async fn add_followers(&self, owner: &Profile, followers: &[Profile]) -> Result<u64>;

    /// Profiles `username` follows, in the order they were attached.
    async fn get_followings(&self, username: &str) -> Result<Vec<Profile>>;

    /// Profiles following `username`, in the order they were attached.
    async fn get_followers(&self, username: &str) -> Result<Vec<Profile>>;

    /// The `limit` most-followed profiles that `username` follows.
    async fn get_top_followings_by_followers(
        &self,
        username: &str,
        limit: u64,
    ) -> Result<Vec<Profile>>;

    /// The `limit` most-followed profiles following `username`.
    async fn get_top_followers_by_followers(
        &self,
        username: &str,
        limit: u64,
    ) -> Result<Vec<Profile>>;
}

/// [`GraphStore`] backed by a sea-orm connection pool.
///
/// Clones share the same pool.
#[derive(Debug, Clone)]
pub struct SeaOrmGraphStore {
    db: Arc<DatabaseConnection>,
}

impl SeaOrmGraphStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db: Arc::new(db) }
    }

    /// Get the underlying connection.
    pub fn connection(&self) -> &DatabaseConnection {
        &self.db
    }

    /// Upsert the owner and its connections, then attach edges, in one
    /// transaction.
    ///
    /// Profiles whose handle changed since they were stored are renamed in
    /// place first, keeping their existing edges.
    pub async fn attach(
        &self,
        relation: RelationKind,
        owner: &Profile,
        connections: &[Profile],
    ) -> Result<u64> {
        let operation = match relation {
            RelationKind::Followings => "add followings",
            RelationKind::Followers => "add followers",
        };
        validate_username(owner, operation)?;
        for connection in connections {
            validate_username(connection, operation)?;
        }

        let unique = dedupe_by_username(connections);

        let result: std::result::Result<u64, DbErr> = async {
            let txn = self.db.begin().await?;

            let mut batch: Vec<&Profile> = Vec::with_capacity(unique.len() + 1);
            batch.push(owner);
            batch.extend(unique.iter().copied());
            profiles::apply_renames(&txn, &batch).await?;

            profiles::upsert_profiles(&txn, &[owner]).await?;
            profiles::upsert_profiles(&txn, &unique).await?;

            let mut usernames: Vec<&str> = unique.iter().map(|p| p.username.as_str()).collect();
            usernames.push(owner.username.as_str());
            let ids = profiles::resolve_ids(&txn, &usernames).await?;

            let owner_id = ids.get(&owner.username).copied().ok_or_else(|| {
                DbErr::RecordNotFound(format!("profile {} vanished mid-transaction", owner.username))
            })?;
            usernames.pop();
            let pairs = build_edge_pairs(relation, owner_id, &usernames, &ids);
            let inserted = edges::insert_edges(&txn, &pairs).await?;

            txn.commit().await?;
            Ok(inserted)
        }
        .await;

        match result {
            Ok(inserted) => {
                tracing::debug!(
                    username = %owner.username,
                    relation = %relation,
                    connections = unique.len(),
                    new_edges = inserted,
                    "Attached edges"
                );
                Ok(inserted)
            }
            Err(e) => {
                tracing::error!(
                    operation,
                    username = %owner.username,
                    connections = unique.len(),
                    error = %e,
                    "Failed to attach edges, batch rolled back"
                );
                Err(StoreError::persistence(operation, e))
            }
        }
    }

    /// Read a relation, optionally ranked and truncated.
    pub async fn connections(
        &self,
        relation: RelationKind,
        username: &str,
        top: Option<u64>,
    ) -> Result<Vec<Profile>> {
        let operation = match (relation, top) {
            (RelationKind::Followings, None) => "get followings",
            (RelationKind::Followers, None) => "get followers",
            (RelationKind::Followings, Some(_)) => "get top followings",
            (RelationKind::Followers, Some(_)) => "get top followers",
        };

        let owner = self.find_model(username, operation).await?;

        if top == Some(0) {
            return Ok(Vec::new());
        }

        match edges::find_connections(self.connection(), relation, owner.id, top).await {
            Ok(rows) => Ok(rows.into_iter().map(from_model).collect()),
            Err(e) => {
                match top {
                    Some(limit) => tracing::error!(
                        operation,
                        username = %username,
                        limit,
                        error = %e,
                        "Failed to read relation"
                    ),
                    None => tracing::error!(
                        operation,
                        username = %username,
                        error = %e,
                        "Failed to read relation"
                    ),
                }
                Err(StoreError::persistence(operation, e))
            }
        }
    }

    async fn find_model(
        &self,
        username: &str,
        operation: &'static str,
    ) -> Result<crate::entity::profile::Model> {
        match profiles::find_by_username(self.connection(), username).await {
            Ok(Some(model)) => Ok(model),
            Ok(None) => {
                tracing::error!(operation, username = %username, "Profile not found");
                Err(StoreError::not_found(username))
            }
            Err(e) => {
                tracing::error!(
                    operation,
                    username = %username,
                    error = %e,
                    "Failed to load profile"
                );
                Err(StoreError::persistence(operation, e))
            }
        }
    }
}

#[async_trait]
impl GraphStore for SeaOrmGraphStore {
    async fn get_profile(&self, username: &str) -> Result<Profile> {
        self.find_model(username, "get profile").await.map(from_model)
    }

    async fn save_profiles(&self, profiles: &[Profile]) -> Result<u64> {
        const OPERATION: &str = "save profiles";

        for profile in profiles {
            validate_username(profile, OPERATION)?;
        }
        let unique = dedupe_by_username(profiles);
        if unique.is_empty() {
            return Ok(0);
        }

        let result: std::result::Result<u64, DbErr> = async {
            let txn = self.db.begin().await?;
            profiles::apply_renames(&txn, &unique).await?;
            let written = profiles::upsert_profiles(&txn, &unique).await?;
            txn.commit().await?;
            Ok(written)
        }
        .await;

        result.map_err(|e| {
            let first = unique.first().map(|p| p.username.as_str()).unwrap_or_default();
            tracing::error!(
                operation = OPERATION,
                username = %first,
                count = unique.len(),
                error = %e,
                "Failed to save profiles, batch rolled back"
            );
            StoreError::persistence(OPERATION, e)
        })
    }

    async fn add_followings(&self, owner: &Profile, followings: &[Profile]) -> Result<u64> {
        self.attach(RelationKind::Followings, owner, followings).await
    }

    async fn add_followers(&self, owner: &Profile, followers: &[Profile]) -> Result<u64> {
        self.attach(RelationKind::Followers, owner, followers).await
    }

    async fn get_followings(&self, username: &str) -> Result<Vec<Profile>> {
        self.connections(RelationKind::Followings, username, None)
            .await
    }

    async fn get_followers(&self, username: &str) -> Result<Vec<Profile>> {
        self.connections(RelationKind::Followers, username, None)
            .await
    }

    async fn get_top_followings_by_followers(
        &self,
        username: &str,
        limit: u64,
    ) -> Result<Vec<Profile>> {
        self.connections(RelationKind::Followings, username, Some(limit))
            .await
    }

    async fn get_top_followers_by_followers(
        &self,
        username: &str,
        limit: u64,
    ) -> Result<Vec<Profile>> {
        self.connections(RelationKind::Followers, username, Some(limit))
            .await
    }
}

fn validate_username(profile: &Profile, operation: &'static str) -> Result<()> {
    if profile.username.trim().is_empty() {
        tracing::error!(
            operation,
            external_id = %profile.external_id,
            "Refusing to store a profile without a username"
        );
        return Err(StoreError::InvalidInput {
            message: format!(
                "profile with external id {:?} has an empty username",
                profile.external_id
            ),
        });
    }
    Ok(())
}
