pub mod app;
pub mod authz;
pub mod cache;
pub mod config;
pub mod db;
pub mod docs;
pub mod errors;
pub mod models;
pub mod routes;
pub mod store;
pub mod utils;

pub use app::{create_app, AppState};
pub use authz::{AuthzService, Scope};
