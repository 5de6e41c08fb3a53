//! Follow edge writes and relation reads.

use std::collections::{HashMap, HashSet};

use chrono::Utc;
use sea_orm::{
    ActiveValue::NotSet, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, JoinType, QueryFilter,
    QueryOrder, QuerySelect, RelationTrait, Set, sea_query::OnConflict,
};
use uuid::Uuid;

use crate::entity::follow_edge::{
    ActiveModel as FollowEdgeActiveModel, Column as EdgeColumn, Entity as FollowEdge,
    Relation as EdgeRelation,
};
use crate::entity::profile::{Column as ProfileColumn, Entity as ProfileEntity, Model};
use crate::profile::RelationKind;

/// Edges per insert statement.
pub const EDGE_CHUNK_SIZE: usize = 200;

/// A directed `follower -> followee` pair of profile row IDs.
pub type EdgePair = (Uuid, Uuid);

/// Orient an owner/connection pair for a relation.
///
/// Followings point from the owner to the connection; followers point from
/// the connection to the owner.
#[inline]
pub fn orient(relation: RelationKind, owner_id: Uuid, connection_id: Uuid) -> EdgePair {
    match relation {
        RelationKind::Followings => (owner_id, connection_id),
        RelationKind::Followers => (connection_id, owner_id),
    }
}

/// Build the edge list for an owner and its resolved connections.
///
/// Self-edges and repeated pairs are dropped. Connections missing from `ids`
/// are skipped.
pub fn build_edge_pairs(
    relation: RelationKind,
    owner_id: Uuid,
    connections: &[&str],
    ids: &HashMap<String, Uuid>,
) -> Vec<EdgePair> {
    let mut seen = HashSet::with_capacity(connections.len());
    connections
        .iter()
        .filter_map(|username| ids.get(*username).copied())
        .filter(|id| *id != owner_id)
        .map(|id| orient(relation, owner_id, id))
        .filter(|pair| seen.insert(*pair))
        .collect()
}

/// Insert edges, ignoring pairs that already exist.
///
/// Returns the number of edges actually created.
pub async fn insert_edges<C: ConnectionTrait>(conn: &C, pairs: &[EdgePair]) -> Result<u64, DbErr> {
    if pairs.is_empty() {
        return Ok(0);
    }

    let now = Utc::now().fixed_offset();
    let mut inserted = 0u64;

    for chunk in pairs.chunks(EDGE_CHUNK_SIZE) {
        let models = chunk
            .iter()
            .map(|(follower_id, followee_id)| FollowEdgeActiveModel {
                id: NotSet,
                follower_id: Set(*follower_id),
                followee_id: Set(*followee_id),
                created_at: Set(now),
            });

        inserted += FollowEdge::insert_many(models)
            .on_conflict(build_edge_on_conflict())
            .exec_without_returning(conn)
            .await?;
    }

    Ok(inserted)
}

/// Load the connections of `owner_id` for a relation, in edge insertion order.
///
/// With `top` set, connections are instead ranked by their own follower
/// count (descending, ties by username) and truncated to the given size.
pub async fn find_connections<C: ConnectionTrait>(
    conn: &C,
    relation: RelationKind,
    owner_id: Uuid,
    top: Option<u64>,
) -> Result<Vec<Model>, DbErr> {
    let (join, owner_column) = match relation {
        // Owner is the follower; join on the followee side.
        RelationKind::Followings => (EdgeRelation::Followee.def().rev(), EdgeColumn::FollowerId),
        // Owner is the followee; join on the follower side.
        RelationKind::Followers => (EdgeRelation::Follower.def().rev(), EdgeColumn::FolloweeId),
    };

    let query = ProfileEntity::find()
        .join(JoinType::InnerJoin, join)
        .filter(owner_column.eq(owner_id));

    match top {
        Some(limit) => {
            query
                .order_by_desc(ProfileColumn::FollowersCount)
                .order_by_asc(ProfileColumn::Username)
                .limit(limit)
                .all(conn)
                .await
        }
        None => query.order_by_asc(EdgeColumn::Id).all(conn).await,
    }
}

fn build_edge_on_conflict() -> OnConflict {
    OnConflict::columns([EdgeColumn::FollowerId, EdgeColumn::FolloweeId])
        .do_nothing()
        .to_owned()
}
