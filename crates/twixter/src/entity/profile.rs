//! Profile entity - one account on the source platform.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Profile model - the persisted row for a [`crate::Profile`].
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "profiles")]
pub struct Model {
    /// Internal UUID primary key.
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    // ─── Identity ────────────────────────────────────────────────────────────
    /// Immutable ID from the source platform.
    #[sea_orm(unique)]
    pub external_id: String,
    /// Handle on the source platform. Natural key for lookups and upserts.
    #[sea_orm(unique)]
    pub username: String,

    // ─── Descriptive ─────────────────────────────────────────────────────────
    pub name: String,
    pub location: String,
    #[sea_orm(column_type = "Text")]
    pub bio: String,
    #[sea_orm(column_type = "Text")]
    pub url: String,
    pub email: String,
    #[sea_orm(column_type = "Text")]
    pub profile_banner_url: String,
    #[sea_orm(column_type = "Text")]
    pub profile_image_url: String,

    // ─── Flags ───────────────────────────────────────────────────────────────
    #[sea_orm(default_value = false)]
    pub verified: bool,
    #[sea_orm(default_value = false)]
    pub protected: bool,
    #[sea_orm(default_value = false)]
    pub default_profile: bool,
    #[sea_orm(default_value = false)]
    pub default_profile_image: bool,

    // ─── Counters ────────────────────────────────────────────────────────────
    pub followers_count: i64,
    pub followings_count: i64,
    pub favourites_count: i64,
    pub listed_count: i64,
    pub posts_count: i64,

    // ─── Source metadata ─────────────────────────────────────────────────────
    /// Serialized JSON object of schema-less source entities.
    #[sea_orm(column_type = "Text")]
    pub entities: String,
    /// When the account was created on the source platform.
    pub joined_at: Option<DateTimeWithTimeZone>,

    // ─── Audit ───────────────────────────────────────────────────────────────
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
