//! Wire types for the Twitter v1.1 user endpoints.

use serde::Deserialize;

use crate::profile::RelationKind;

/// Cursor sentinel that requests the first page.
pub const START_CURSOR: i64 = -1;

/// Cursor sentinel returned once there are no more pages.
pub const END_CURSOR: i64 = 0;

/// Largest page the source will serve for user lists.
pub const MAX_PAGE_SIZE: u32 = 200;

/// A user object as returned by the source.
///
/// Only the fields that feed a [`crate::Profile`] are declared; everything is
/// defaulted so that sparse or partially redacted users still deserialize.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawUser {
    /// String form of the numeric user ID.
    pub id_str: String,
    pub name: String,
    pub screen_name: String,
    pub location: Option<String>,
    pub description: Option<String>,
    pub url: Option<String>,
    /// Only present for apps with the email permission.
    pub email: Option<String>,
    pub profile_banner_url: Option<String>,
    pub profile_image_url_https: Option<String>,
    pub verified: bool,
    pub protected: bool,
    pub default_profile: bool,
    pub default_profile_image: bool,
    pub followers_count: i64,
    pub friends_count: i64,
    pub favourites_count: i64,
    pub listed_count: i64,
    pub statuses_count: i64,
    /// Account creation date, e.g. `Wed Oct 10 20:19:24 +0000 2018`.
    pub created_at: String,
    /// Embedded URL/hashtag/mention metadata. Shape is not fixed.
    pub entities: serde_json::Value,
}

/// One page of a cursored user list.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct UserPage {
    pub users: Vec<RawUser>,
    /// Cursor for the next page; [`END_CURSOR`] when exhausted.
    pub next_cursor: i64,
    pub previous_cursor: i64,
}

/// Parameters for a single page request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    pub username: String,
    pub relation: RelationKind,
    pub cursor: i64,
    /// Requested page size, already clamped to [`MAX_PAGE_SIZE`].
    pub count: u32,
}

impl PageRequest {
    /// Build the first-page request for a relation.
    pub fn first(username: impl Into<String>, relation: RelationKind, count: u32) -> Self {
        Self {
            username: username.into(),
            relation,
            cursor: START_CURSOR,
            count: clamp_page_size(count),
        }
    }

    /// The same request pointed at another cursor.
    #[must_use]
    pub fn at(&self, cursor: i64) -> Self {
        Self {
            cursor,
            ..self.clone()
        }
    }
}

/// Clamp a caller's page-size hint to what the source accepts.
#[inline]
pub fn clamp_page_size(count: u32) -> u32 {
    count.clamp(1, MAX_PAGE_SIZE)
}
