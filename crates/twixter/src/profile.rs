//! Canonical profile representation shared by the source client and the store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Open-ended metadata the source attaches to a profile (embedded links,
/// hashtags, mentions). The shape is not contractually fixed, so it is kept as
/// a JSON value tree.
pub type Entities = serde_json::Map<String, serde_json::Value>;

/// One social-network account.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    // ─── Identity ────────────────────────────────────────────────────────────
    /// Stable opaque ID from the source system.
    pub external_id: String,
    /// Mutable handle, used as the natural key in the store.
    pub username: String,

    // ─── Descriptive ─────────────────────────────────────────────────────────
    /// Display name.
    pub name: String,
    pub location: String,
    pub bio: String,
    pub url: String,
    pub email: String,
    pub profile_banner_url: String,
    pub profile_image_url: String,

    // ─── Flags ───────────────────────────────────────────────────────────────
    pub verified: bool,
    pub protected: bool,
    pub default_profile: bool,
    pub default_profile_image: bool,

    // ─── Counters (source snapshot at fetch time) ────────────────────────────
    pub followers_count: u64,
    pub followings_count: u64,
    pub favourites_count: u64,
    pub listed_count: u64,
    pub posts_count: u64,

    /// Schema-less metadata; empty when absent or malformed.
    #[serde(default)]
    pub entities: Entities,

    /// When the account was created on the source platform.
    ///
    /// `None` when the source date could not be parsed.
    pub joined_at: Option<DateTime<Utc>>,

    // ─── Audit (owned by the store) ──────────────────────────────────────────
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Profile {
    /// Create a profile with only its identity set.
    pub fn new(external_id: impl Into<String>, username: impl Into<String>) -> Self {
        Self {
            external_id: external_id.into(),
            username: username.into(),
            ..Self::default()
        }
    }
}

/// Which side of the follow graph to enumerate for a user.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RelationKind {
    /// Accounts that follow the user.
    Followers,
    /// Accounts the user follows.
    Followings,
}

impl RelationKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            RelationKind::Followers => "followers",
            RelationKind::Followings => "followings",
        }
    }
}

impl std::fmt::Display for RelationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_sets_identity_only() {
        let profile = Profile::new("42", "alice");
        assert_eq!(profile.external_id, "42");
        assert_eq!(profile.username, "alice");
        assert!(profile.entities.is_empty());
        assert!(profile.joined_at.is_none());
        assert_eq!(profile.followers_count, 0);
    }

    #[test]
    fn test_relation_kind_display() {
        assert_eq!(RelationKind::Followers.to_string(), "followers");
        assert_eq!(RelationKind::Followings.to_string(), "followings");
    }
}
