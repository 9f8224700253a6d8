pub mod authz;
pub mod catalog;
pub mod health;
pub mod members;
pub mod overrides;
pub mod roles;

use serde::Deserialize;
use utoipa::IntoParams;

use crate::authz::Scope;
use crate::errors::AppResult;

/// `?scope=` query parameter; absent means global.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ScopeQuery {
    /// `*` or `company:<uuid>`
    pub scope: Option<String>,
}

impl ScopeQuery {
    pub fn parse(&self) -> AppResult<Scope> {
        match self.scope.as_deref() {
            None | Some("") => Ok(Scope::Global),
            Some(token) => token.parse(),
        }
    }
}
