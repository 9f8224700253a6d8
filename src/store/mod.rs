//! SQLite-backed stores. Reads are point lookups; writes go through the
//! invalidation queue for any cache entry they affect.

mod catalog;
mod member;
mod role_permission;
mod user;
mod user_override;

pub use catalog::PermissionCatalog;
pub use member::CompanyMemberStore;
pub use role_permission::{fold_rows, parse_legacy, PermissionSource, RolePermissionStore, EFFECT_ALLOW};
pub use user::UserStore;
pub use user_override::UserOverrideStore;
