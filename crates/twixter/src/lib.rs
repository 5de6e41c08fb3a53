//! twixter - social graph ingestion and follow-graph persistence.
//!
//! Pulls a user's profile, followers, and followings from a cursor-paginated
//! API and stores them as profiles joined by directed follow edges.
//!
//! # Features
//!
//! - `twitter` - reqwest-backed HTTP transport for the v1.1 user endpoints.
//! - `migrate` - embedded migrations via [`connect_and_migrate`].
//! - `sqlite` / `postgres` - database backends.
//!
//! # Example
//!
//! ```ignore
//! use twixter::config::Settings;
//! use twixter::store::{GraphStore, SeaOrmGraphStore};
//! use twixter::sync::sync_user;
//!
//! twixter::logging::init_tracing();
//! let settings = Settings::load()?;
//! let db = twixter::connect_and_migrate(&settings.database.url).await?;
//! let store = SeaOrmGraphStore::new(db);
//! let client = settings.source.build_client()?;
//!
//! sync_user(&client, &store, "alice", &settings.sync.to_options(), None).await?;
//! let top = store.get_top_followers_by_followers("alice", 10).await?;
//! ```

pub mod codec;
pub mod config;
pub mod db;
pub mod entity;
pub mod http;
pub mod logging;
pub mod profile;
pub mod retry;
pub mod source;
pub mod store;
pub mod sync;

#[cfg(feature = "migrate")]
pub mod migration;

pub use db::connect;
#[cfg(feature = "migrate")]
pub use db::connect_and_migrate;
pub use profile::{Entities, Profile, RelationKind};
pub use source::{ProfileSource, SourceError, TwitterClient};
pub use store::{GraphStore, SeaOrmGraphStore, StoreError};
pub use sync::{SyncError, SyncOptions, SyncReport, sync_user, sync_users};
