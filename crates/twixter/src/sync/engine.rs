//! Sync engine: profile, then both relations, then edges.
//!
//! The engine holds no state. The source, the store, and the progress
//! callback are all passed in, so the same functions run against the real
//! API and database or against test doubles.
//!
//! # Example
//!
//! ```ignore
//! use twixter::store::SeaOrmGraphStore;
//! use twixter::sync::{SyncOptions, sync_user};
//!
//! let store = SeaOrmGraphStore::new(db);
//! let report = sync_user(&client, &store, "alice", &SyncOptions::default(), None).await?;
//! println!("{} new edges", report.new_edges());
//! ```

use futures::stream::{self, StreamExt};

use super::progress::{ProgressCallback, SyncProgress, emit};
use super::types::{RelationReport, SyncError, SyncOptions, SyncReport, UserSyncResult};
use crate::codec::decode_source_user;
use crate::profile::{Profile, RelationKind};
use crate::retry::with_retry;
use crate::source::{
    FetchError, FetchOptions, FetchOutcome, ProfileSource, RawUser, SourceError, fetch_all,
    short_error_message,
};
use crate::store::GraphStore;

/// Sync one user's profile and follow graph.
///
/// The profile is saved first. Followings and followers are then fetched
/// concurrently. A relation is attached only if every page was fetched, so
/// the store never holds a partial edge batch from this run. If either
/// relation failed, the first failure is returned after any complete
/// relation has been attached.
///
/// Completed steps are not rolled back: a saved profile without edges is a
/// valid state for the next sync to build on.
pub async fn sync_user(
    source: &dyn ProfileSource,
    store: &dyn GraphStore,
    username: &str,
    options: &SyncOptions,
    on_progress: Option<&ProgressCallback>,
) -> Result<SyncReport, SyncError> {
    emit(
        on_progress,
        SyncProgress::SyncingUser {
            username: username.to_string(),
        },
    );
    tracing::info!(username = %username, "Syncing user");

    let raw = fetch_profile(source, username, &options.fetch)
        .await
        .map_err(|e| {
            tracing::error!(username = %username, error = %e, "Failed to fetch profile");
            SyncError::Profile(e)
        })?;
    let profile = decode_source_user(&raw);
    store.save_profile(&profile).await?;

    emit(
        on_progress,
        SyncProgress::ProfileSaved {
            username: profile.username.clone(),
            followers_count: profile.followers_count,
            followings_count: profile.followings_count,
        },
    );

    let (followings, followers) = tokio::join!(
        fetch_relation(
            source,
            &profile.username,
            RelationKind::Followings,
            options,
            on_progress
        ),
        fetch_relation(
            source,
            &profile.username,
            RelationKind::Followers,
            options,
            on_progress
        ),
    );

    let mut first_error: Option<FetchError> = None;
    let followings = attach_relation(
        store,
        &profile,
        RelationKind::Followings,
        followings,
        &mut first_error,
        on_progress,
    )
    .await?;
    let followers = attach_relation(
        store,
        &profile,
        RelationKind::Followers,
        followers,
        &mut first_error,
        on_progress,
    )
    .await?;

    if let Some(err) = first_error {
        return Err(SyncError::Fetch(err));
    }

    let report = SyncReport {
        profile,
        followings,
        followers,
    };
    tracing::info!(
        username = %username,
        followings = report.followings.as_ref().map_or(0, |r| r.fetched),
        followers = report.followers.as_ref().map_or(0, |r| r.fetched),
        new_edges = report.new_edges(),
        "User sync complete"
    );
    Ok(report)
}

/// Sync many users with bounded concurrency.
///
/// A failure for one user does not stop the others. Results come back in the
/// order of `usernames`.
pub async fn sync_users(
    source: &dyn ProfileSource,
    store: &dyn GraphStore,
    usernames: &[String],
    options: &SyncOptions,
    on_progress: Option<&ProgressCallback>,
) -> Vec<UserSyncResult> {
    if usernames.is_empty() {
        return Vec::new();
    }

    emit(
        on_progress,
        SyncProgress::SyncingUsers {
            count: usernames.len(),
        },
    );

    let concurrency = options.concurrency.max(1);
    let mut results: Vec<(usize, UserSyncResult)> = stream::iter(usernames.iter().enumerate())
        .map(|(idx, username)| async move {
            let result = sync_user(source, store, username, options, on_progress).await;
            if let Err(e) = &result {
                tracing::warn!(username = %username, error = %e, "User sync failed");
            }
            (
                idx,
                UserSyncResult {
                    username: username.clone(),
                    result,
                },
            )
        })
        .buffer_unordered(concurrency)
        .collect()
        .await;
    results.sort_by_key(|(idx, _)| *idx);

    let failed = results.iter().filter(|(_, r)| r.result.is_err()).count();
    emit(
        on_progress,
        SyncProgress::SyncUsersComplete {
            successful: results.len() - failed,
            failed,
        },
    );

    results.into_iter().map(|(_, r)| r).collect()
}

/// Fetch a single profile with the same timeout and retry policy as pages.
async fn fetch_profile(
    source: &dyn ProfileSource,
    username: &str,
    options: &FetchOptions,
) -> Result<RawUser, SourceError> {
    with_retry(
        || async {
            match tokio::time::timeout(options.page_timeout, source.get_profile(username)).await {
                Ok(result) => result,
                Err(_) => Err(SourceError::Timeout {
                    seconds: options.page_timeout.as_secs(),
                }),
            }
        },
        &options.retry,
        SourceError::is_transient,
        |err, delay, attempt| {
            tracing::warn!(
                username = %username,
                attempt,
                delay_ms = delay.as_millis() as u64,
                error = %short_error_message(err),
                "Profile request failed, retrying"
            );
        },
    )
    .await
}

async fn fetch_relation(
    source: &dyn ProfileSource,
    username: &str,
    relation: RelationKind,
    options: &SyncOptions,
    on_progress: Option<&ProgressCallback>,
) -> Option<FetchOutcome> {
    if !options.includes(relation) {
        return None;
    }
    Some(fetch_all(source, username, relation, &options.fetch, on_progress).await)
}

/// Persist a fetched relation if it is complete.
///
/// An incomplete relation is skipped and its error recorded in
/// `first_error` unless an earlier one is already there.
async fn attach_relation(
    store: &dyn GraphStore,
    owner: &Profile,
    relation: RelationKind,
    outcome: Option<FetchOutcome>,
    first_error: &mut Option<FetchError>,
    on_progress: Option<&ProgressCallback>,
) -> Result<Option<RelationReport>, SyncError> {
    let Some(outcome) = outcome else {
        return Ok(None);
    };

    let mut report = RelationReport {
        fetched: outcome.profiles.len(),
        pages: outcome.pages,
        ..RelationReport::default()
    };

    if let Some(err) = outcome.error {
        tracing::warn!(
            username = %owner.username,
            relation = %relation,
            fetched = report.fetched,
            error = %err,
            "Relation fetch incomplete, not attaching"
        );
        emit(
            on_progress,
            SyncProgress::RelationSkipped {
                username: owner.username.clone(),
                relation,
                error: err.to_string(),
            },
        );
        first_error.get_or_insert(err);
        return Ok(Some(report));
    }

    report.new_edges = match relation {
        RelationKind::Followings => store.add_followings(owner, &outcome.profiles).await?,
        RelationKind::Followers => store.add_followers(owner, &outcome.profiles).await?,
    };
    report.attached = true;

    emit(
        on_progress,
        SyncProgress::EdgesAttached {
            username: owner.username.clone(),
            relation,
            connections: report.fetched,
            new_edges: report.new_edges,
        },
    );

    Ok(Some(report))
}
