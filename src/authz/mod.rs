//! Authorization decision core.
//!
//! Answers "may user U perform action A on resource R in scope S?" by
//! combining:
//! - per-user overrides (allow/deny, priority ordered, optionally time-bound)
//! - the super admin bypass
//! - the role held through an active company membership
//! - the user's global role

mod evaluator;
mod principal;
pub mod scope;
mod service;

pub use evaluator::{AuthorizationEvaluator, Decision, DecisionSource, PolicyEvaluator};
pub use principal::{AccessRequest, Principal};
pub use scope::{build_scope, parse_scope, Scope, GLOBAL_SCOPE};
pub use service::AuthzService;

/// Well-known role names
pub mod roles {
    pub const SUPER_ADMIN: &str = "super_admin";
    /// Receives full CRUD on newly registered catalog resources.
    pub const ADMIN: &str = "admin";
    /// Receives read access on newly registered catalog resources.
    pub const USER: &str = "user";
}
