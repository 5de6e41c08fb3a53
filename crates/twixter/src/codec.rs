//! Conversions between source users, canonical profiles, and stored rows.
//!
//! Every function here is total: a field that cannot be parsed or serialized
//! degrades to its empty value and a warning is logged. Nothing in this module
//! fails the surrounding fetch or save.

use chrono::{DateTime, Utc};
use sea_orm::Set;
use uuid::Uuid;

use crate::entity::profile::{ActiveModel as ProfileActiveModel, Model as ProfileModel};
use crate::profile::{Entities, Profile};
use crate::source::RawUser;

/// Layout of the source's `created_at` strings (Ruby's `Time#to_s`).
pub const SOURCE_DATE_FORMAT: &str = "%a %b %d %H:%M:%S %z %Y";

/// Decode a source user into a canonical profile.
pub fn decode_source_user(user: &RawUser) -> Profile {
    Profile {
        external_id: user.id_str.clone(),
        name: user.name.clone(),
        username: user.screen_name.clone(),
        location: user.location.clone().unwrap_or_default(),
        bio: user.description.clone().unwrap_or_default(),
        url: user.url.clone().unwrap_or_default(),
        email: user.email.clone().unwrap_or_default(),
        profile_banner_url: user.profile_banner_url.clone().unwrap_or_default(),
        profile_image_url: user.profile_image_url_https.clone().unwrap_or_default(),
        verified: user.verified,
        protected: user.protected,
        default_profile: user.default_profile,
        default_profile_image: user.default_profile_image,
        followers_count: non_negative(user.followers_count),
        followings_count: non_negative(user.friends_count),
        favourites_count: non_negative(user.favourites_count),
        listed_count: non_negative(user.listed_count),
        posts_count: non_negative(user.statuses_count),
        entities: decode_entities(&user.entities, &user.screen_name),
        joined_at: parse_source_date(&user.created_at, &user.screen_name),
        created_at: None,
        updated_at: None,
    }
}

/// Parse a source creation date, logging and returning `None` on failure.
pub fn parse_source_date(raw: &str, username: &str) -> Option<DateTime<Utc>> {
    match DateTime::parse_from_str(raw, SOURCE_DATE_FORMAT) {
        Ok(dt) => Some(dt.with_timezone(&Utc)),
        Err(e) => {
            tracing::warn!(
                username = %username,
                created_at = %raw,
                error = %e,
                "Failed to parse account creation date"
            );
            None
        }
    }
}

/// Normalize the source's entities payload into an open mapping.
///
/// `null` means the source sent nothing and is not worth a warning. Any other
/// non-object value is malformed.
fn decode_entities(raw: &serde_json::Value, username: &str) -> Entities {
    match raw {
        serde_json::Value::Object(map) => map.clone(),
        serde_json::Value::Null => Entities::new(),
        other => {
            tracing::warn!(
                username = %username,
                kind = json_kind(other),
                "Malformed entities payload, storing empty entities"
            );
            Entities::new()
        }
    }
}

/// Build the storage row for a profile.
///
/// The caller supplies the row ID and the write time. Upserts keyed on
/// username keep an existing row's ID. `created_at` is preserved when the
/// profile already carries one.
pub fn to_active_model(profile: &Profile, id: Uuid, now: DateTime<Utc>) -> ProfileActiveModel {
    let now = now.fixed_offset();

    ProfileActiveModel {
        id: Set(id),
        external_id: Set(profile.external_id.clone()),
        username: Set(profile.username.clone()),
        name: Set(profile.name.clone()),
        location: Set(profile.location.clone()),
        bio: Set(profile.bio.clone()),
        url: Set(profile.url.clone()),
        email: Set(profile.email.clone()),
        profile_banner_url: Set(profile.profile_banner_url.clone()),
        profile_image_url: Set(profile.profile_image_url.clone()),
        verified: Set(profile.verified),
        protected: Set(profile.protected),
        default_profile: Set(profile.default_profile),
        default_profile_image: Set(profile.default_profile_image),
        followers_count: Set(to_column_count(profile.followers_count)),
        followings_count: Set(to_column_count(profile.followings_count)),
        favourites_count: Set(to_column_count(profile.favourites_count)),
        listed_count: Set(to_column_count(profile.listed_count)),
        posts_count: Set(to_column_count(profile.posts_count)),
        entities: Set(encode_entities(&profile.entities, &profile.username)),
        joined_at: Set(profile.joined_at.map(|t| t.fixed_offset())),
        created_at: Set(profile.created_at.map_or(now, |t| t.fixed_offset())),
        updated_at: Set(now),
    }
}

/// Rehydrate a canonical profile from its storage row.
pub fn from_model(model: ProfileModel) -> Profile {
    let entities = decode_entities_blob(&model.entities, &model.username);

    Profile {
        external_id: model.external_id,
        username: model.username,
        name: model.name,
        location: model.location,
        bio: model.bio,
        url: model.url,
        email: model.email,
        profile_banner_url: model.profile_banner_url,
        profile_image_url: model.profile_image_url,
        verified: model.verified,
        protected: model.protected,
        default_profile: model.default_profile,
        default_profile_image: model.default_profile_image,
        followers_count: non_negative(model.followers_count),
        followings_count: non_negative(model.followings_count),
        favourites_count: non_negative(model.favourites_count),
        listed_count: non_negative(model.listed_count),
        posts_count: non_negative(model.posts_count),
        entities,
        joined_at: model.joined_at.map(|t| t.with_timezone(&Utc)),
        created_at: Some(model.created_at.with_timezone(&Utc)),
        updated_at: Some(model.updated_at.with_timezone(&Utc)),
    }
}

/// Serialize entities for the blob column.
pub fn encode_entities(entities: &Entities, username: &str) -> String {
    serde_json::to_string(entities).unwrap_or_else(|e| {
        tracing::warn!(
            username = %username,
            error = %e,
            "Failed to serialize profile entities"
        );
        "{}".to_string()
    })
}

/// Deserialize the blob column back into entities.
pub fn decode_entities_blob(blob: &str, username: &str) -> Entities {
    if blob.trim().is_empty() {
        return Entities::new();
    }

    match serde_json::from_str::<serde_json::Value>(blob) {
        Ok(serde_json::Value::Object(map)) => map,
        Ok(serde_json::Value::Null) => Entities::new(),
        Ok(other) => {
            tracing::warn!(
                username = %username,
                kind = json_kind(&other),
                "Stored entities are not an object, loading empty entities"
            );
            Entities::new()
        }
        Err(e) => {
            tracing::warn!(
                username = %username,
                error = %e,
                "Failed to deserialize stored profile entities"
            );
            Entities::new()
        }
    }
}

#[inline]
fn non_negative(value: i64) -> u64 {
    u64::try_from(value).unwrap_or(0)
}

#[inline]
fn to_column_count(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "bool",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, TimeZone, Timelike};
    use serde_json::json;
    use tracing_test::traced_test;

    fn raw_user() -> RawUser {
        RawUser {
            id_str: "783214".to_string(),
            name: "Twitter".to_string(),
            screen_name: "twitter".to_string(),
            location: Some("everywhere".to_string()),
            description: Some("What's happening?!".to_string()),
            url: Some("https://t.co/DAtOo6uuHk".to_string()),
            email: None,
            profile_banner_url: Some("https://pbs.twimg.com/banner".to_string()),
            profile_image_url_https: Some("https://pbs.twimg.com/image.jpg".to_string()),
            verified: true,
            protected: false,
            default_profile: false,
            default_profile_image: false,
            followers_count: 56_000_000,
            friends_count: 10,
            favourites_count: 6_000,
            listed_count: 90_000,
            statuses_count: 14_000,
            created_at: "Tue Feb 20 14:35:54 +0000 2007".to_string(),
            entities: json!({
                "url": {"urls": [{"url": "https://t.co/DAtOo6uuHk", "indices": [0, 23]}]},
                "description": {"urls": []}
            }),
        }
    }

    #[test]
    fn test_decode_maps_scalar_fields() {
        let profile = decode_source_user(&raw_user());

        assert_eq!(profile.external_id, "783214");
        assert_eq!(profile.username, "twitter");
        assert_eq!(profile.name, "Twitter");
        assert_eq!(profile.bio, "What's happening?!");
        assert_eq!(profile.profile_image_url, "https://pbs.twimg.com/image.jpg");
        assert_eq!(profile.email, "");
        assert!(profile.verified);
        assert_eq!(profile.followers_count, 56_000_000);
        assert_eq!(profile.followings_count, 10);
        assert_eq!(profile.posts_count, 14_000);
        assert!(profile.created_at.is_none());
        assert!(profile.updated_at.is_none());
    }

    #[test]
    fn test_decode_parses_source_date() {
        let profile = decode_source_user(&raw_user());
        let joined = profile.joined_at.expect("date should parse");

        assert_eq!(joined.year(), 2007);
        assert_eq!(joined.month(), 2);
        assert_eq!(joined.day(), 20);
        assert_eq!(joined.hour(), 14);
    }

    #[test]
    fn test_decode_normalizes_offset_to_utc() {
        let joined = parse_source_date("Mon Jan 02 15:04:05 -0700 2006", "gopher")
            .expect("date should parse");
        assert_eq!(joined, Utc.with_ymd_and_hms(2006, 1, 2, 22, 4, 5).unwrap());
    }

    #[traced_test]
    #[test]
    fn test_decode_bad_date_degrades_to_none() {
        let mut user = raw_user();
        user.created_at = "2007-02-20".to_string();

        let profile = decode_source_user(&user);

        assert!(profile.joined_at.is_none());
        assert_eq!(profile.username, "twitter");
        assert!(logs_contain("Failed to parse account creation date"));
    }

    #[traced_test]
    #[test]
    fn test_decode_malformed_entities_degrades_to_empty() {
        let mut user = raw_user();
        user.entities = json!(["not", "a", "map"]);

        let profile = decode_source_user(&user);

        assert!(profile.entities.is_empty());
        assert_eq!(profile.external_id, "783214");
        assert!(logs_contain("Malformed entities payload"));
    }

    #[traced_test]
    #[test]
    fn test_decode_missing_entities_is_silent() {
        let mut user = raw_user();
        user.entities = serde_json::Value::Null;

        let profile = decode_source_user(&user);

        assert!(profile.entities.is_empty());
        assert!(!logs_contain("Malformed entities payload"));
    }

    #[test]
    fn test_decode_clamps_negative_counters() {
        let mut user = raw_user();
        user.followers_count = -5;

        assert_eq!(decode_source_user(&user).followers_count, 0);
    }

    #[test]
    fn test_entities_round_trip_through_storage_row() {
        let profile = decode_source_user(&raw_user());
        let active = to_active_model(&profile, Uuid::new_v4(), Utc::now());

        let model = ProfileModel {
            id: active.id.clone().unwrap(),
            external_id: active.external_id.clone().unwrap(),
            username: active.username.clone().unwrap(),
            name: active.name.clone().unwrap(),
            location: active.location.clone().unwrap(),
            bio: active.bio.clone().unwrap(),
            url: active.url.clone().unwrap(),
            email: active.email.clone().unwrap(),
            profile_banner_url: active.profile_banner_url.clone().unwrap(),
            profile_image_url: active.profile_image_url.clone().unwrap(),
            verified: active.verified.clone().unwrap(),
            protected: active.protected.clone().unwrap(),
            default_profile: active.default_profile.clone().unwrap(),
            default_profile_image: active.default_profile_image.clone().unwrap(),
            followers_count: active.followers_count.clone().unwrap(),
            followings_count: active.followings_count.clone().unwrap(),
            favourites_count: active.favourites_count.clone().unwrap(),
            listed_count: active.listed_count.clone().unwrap(),
            posts_count: active.posts_count.clone().unwrap(),
            entities: active.entities.clone().unwrap(),
            joined_at: active.joined_at.clone().unwrap(),
            created_at: active.created_at.clone().unwrap(),
            updated_at: active.updated_at.clone().unwrap(),
        };

        let restored = from_model(model);

        let mut expected_keys: Vec<_> = profile.entities.keys().collect();
        let mut restored_keys: Vec<_> = restored.entities.keys().collect();
        expected_keys.sort();
        restored_keys.sort();
        assert_eq!(expected_keys, restored_keys);
        assert_eq!(
            restored.entities["url"]["urls"][0]["url"],
            json!("https://t.co/DAtOo6uuHk")
        );
        assert_eq!(restored.entities["url"]["urls"][0]["indices"][1], json!(23));
        assert_eq!(restored.joined_at, profile.joined_at);
        assert_eq!(restored.followers_count, profile.followers_count);
        assert!(restored.created_at.is_some());
    }

    #[traced_test]
    #[test]
    fn test_decode_entities_blob_degrades_on_garbage() {
        let entities = decode_entities_blob("{not json", "alice");

        assert!(entities.is_empty());
        assert!(logs_contain("Failed to deserialize stored profile entities"));
    }

    #[test]
    fn test_decode_entities_blob_handles_empty_and_null() {
        assert!(decode_entities_blob("", "alice").is_empty());
        assert!(decode_entities_blob("null", "alice").is_empty());
    }

    #[test]
    fn test_to_active_model_preserves_existing_created_at() {
        let mut profile = decode_source_user(&raw_user());
        let created = Utc.with_ymd_and_hms(2020, 5, 1, 0, 0, 0).unwrap();
        profile.created_at = Some(created);

        let active = to_active_model(&profile, Uuid::new_v4(), Utc::now());
        assert_eq!(active.created_at.unwrap(), created.fixed_offset());
    }

    #[test]
    fn test_to_active_model_is_deterministic_for_given_id_and_time() {
        let profile = decode_source_user(&raw_user());
        let id = Uuid::new_v4();
        let now = Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();

        let first = to_active_model(&profile, id, now);
        let second = to_active_model(&profile, id, now);

        assert_eq!(first.entities, second.entities);
        assert_eq!(first.joined_at, second.joined_at);
        assert_eq!(first.id.unwrap(), id);
        assert_eq!(first.created_at.unwrap(), now.fixed_offset());
        assert_eq!(first.updated_at.unwrap(), now.fixed_offset());
    }
}
