pub mod member;
pub mod permission;
pub mod permission_set;
pub mod role;
pub mod time_restriction;
pub mod user;
pub mod user_permission;

pub use permission_set::{Action, ActionPattern, PermissionDetail, PermissionSet};
pub use time_restriction::TimeRestriction;
