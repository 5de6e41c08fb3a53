//! Profile row queries shared by every store operation.
//!
//! Helpers take any [`ConnectionTrait`] so they run unchanged on a pooled
//! connection or inside an open transaction.

use std::collections::HashMap;

use chrono::Utc;
use sea_orm::{
    ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter,
    sea_query::{Expr, OnConflict},
};
use uuid::Uuid;

use crate::codec::to_active_model;
use crate::entity::profile::{Column, Entity as ProfileEntity, Model as ProfileModel};
use crate::profile::Profile;

/// Rows per upsert statement. Keeps bound parameters under SQLite's 999 limit.
pub const UPSERT_CHUNK_SIZE: usize = 40;

/// Usernames per `IN (...)` lookup.
pub const LOOKUP_CHUNK_SIZE: usize = 500;

/// Load a profile row by username.
pub async fn find_by_username<C: ConnectionTrait>(
    conn: &C,
    username: &str,
) -> Result<Option<ProfileModel>, DbErr> {
    ProfileEntity::find()
        .filter(Column::Username.eq(username))
        .one(conn)
        .await
}

/// Collapse a batch to one profile per username.
///
/// The last occurrence wins, at the position of the first. A single
/// `ON CONFLICT DO UPDATE` statement cannot touch the same row twice, so
/// duplicates must be gone before the insert is built.
pub fn dedupe_by_username(profiles: &[Profile]) -> Vec<&Profile> {
    let mut positions: HashMap<&str, usize> = HashMap::with_capacity(profiles.len());
    let mut unique: Vec<&Profile> = Vec::with_capacity(profiles.len());

    for profile in profiles {
        match positions.get(profile.username.as_str()) {
            Some(&idx) => unique[idx] = profile,
            None => {
                positions.insert(profile.username.as_str(), unique.len());
                unique.push(profile);
            }
        }
    }

    unique
}

/// Upsert profiles keyed on username, in chunks.
///
/// Callers wanting all-or-nothing semantics pass a transaction. Returns the
/// number of profiles written.
pub async fn upsert_profiles<C: ConnectionTrait>(
    conn: &C,
    profiles: &[&Profile],
) -> Result<u64, DbErr> {
    if profiles.is_empty() {
        return Ok(0);
    }

    let now = Utc::now();
    for chunk in profiles.chunks(UPSERT_CHUNK_SIZE) {
        let models = chunk.iter().map(|p| to_active_model(p, Uuid::new_v4(), now));
        ProfileEntity::insert_many(models)
            .on_conflict(build_upsert_on_conflict())
            .exec_without_returning(conn)
            .await?;
    }

    tracing::debug!(count = profiles.len(), "Upserted profiles");
    Ok(profiles.len() as u64)
}

/// Move handles that changed at the source onto their existing rows.
///
/// Rows are matched by `external_id`. A matched row whose username differs
/// from the incoming one is renamed in place, so its ID and every edge
/// pointing at it survive. Must run before [`upsert_profiles`], which keys on
/// username. Returns the number of rows renamed.
pub async fn apply_renames<C: ConnectionTrait>(
    conn: &C,
    profiles: &[&Profile],
) -> Result<u64, DbErr> {
    let handles: HashMap<&str, &str> = profiles
        .iter()
        .filter(|p| !p.external_id.is_empty())
        .map(|p| (p.external_id.as_str(), p.username.as_str()))
        .collect();
    if handles.is_empty() {
        return Ok(0);
    }

    let external_ids: Vec<&str> = handles.keys().copied().collect();
    let mut renamed = 0;

    for chunk in external_ids.chunks(LOOKUP_CHUNK_SIZE) {
        let rows = ProfileEntity::find()
            .filter(Column::ExternalId.is_in(chunk.iter().copied()))
            .all(conn)
            .await?;

        for row in rows {
            let Some(&username) = handles.get(row.external_id.as_str()) else {
                continue;
            };
            if row.username == username {
                continue;
            }

            ProfileEntity::update_many()
                .col_expr(Column::Username, Expr::value(username))
                .filter(Column::Id.eq(row.id))
                .exec(conn)
                .await?;
            tracing::debug!(
                external_id = %row.external_id,
                from = %row.username,
                to = %username,
                "Profile handle changed"
            );
            renamed += 1;
        }
    }

    Ok(renamed)
}

/// Resolve row IDs for a set of usernames. Unknown usernames are absent from
/// the returned map.
pub async fn resolve_ids<C: ConnectionTrait>(
    conn: &C,
    usernames: &[&str],
) -> Result<HashMap<String, Uuid>, DbErr> {
    let mut ids = HashMap::with_capacity(usernames.len());

    for chunk in usernames.chunks(LOOKUP_CHUNK_SIZE) {
        let rows = ProfileEntity::find()
            .filter(Column::Username.is_in(chunk.iter().copied()))
            .all(conn)
            .await?;
        ids.extend(rows.into_iter().map(|row| (row.username, row.id)));
    }

    Ok(ids)
}

/// Build the ON CONFLICT clause used by profile upserts.
///
/// Username is the natural key. Every descriptive, counter, and entities
/// column is overwritten (whole-record last write wins). The row ID and
/// `created_at` of an existing row are kept.
pub(crate) fn build_upsert_on_conflict() -> OnConflict {
    OnConflict::column(Column::Username)
        .update_columns([
            Column::ExternalId,
            Column::Name,
            Column::Location,
            Column::Bio,
            Column::Url,
            Column::Email,
            Column::ProfileBannerUrl,
            Column::ProfileImageUrl,
            Column::Verified,
            Column::Protected,
            Column::DefaultProfile,
            Column::DefaultProfileImage,
            Column::FollowersCount,
            Column::FollowingsCount,
            Column::FavouritesCount,
            Column::ListedCount,
            Column::PostsCount,
            Column::Entities,
            Column::JoinedAt,
            Column::UpdatedAt,
        ])
        .to_owned()
}
