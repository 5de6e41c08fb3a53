//! Common re-exports for convenient entity usage.

pub use super::follow_edge::{
    ActiveModel as FollowEdgeActiveModel, Column as FollowEdgeColumn, Entity as FollowEdge,
    Model as FollowEdgeModel,
};
pub use super::profile::{
    ActiveModel as ProfileActiveModel, Column as ProfileColumn, Entity as ProfileEntity,
    Model as ProfileModel,
};
