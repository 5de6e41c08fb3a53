//! SeaORM entity definitions for the twixter database schema.

pub mod follow_edge;
pub mod prelude;
pub mod profile;
