//! Scope tokens: `"*"` for global checks, `"company:<uuid>"` for one company.

use std::fmt;
use std::str::FromStr;

use uuid::Uuid;

use crate::errors::AppError;

pub const GLOBAL_SCOPE: &str = "*";
const COMPANY_PREFIX: &str = "company:";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scope {
    Global,
    Company(Uuid),
}

impl Scope {
    pub fn company_id(&self) -> Option<Uuid> {
        match self {
            Scope::Global => None,
            Scope::Company(id) => Some(*id),
        }
    }
}

impl From<Option<Uuid>> for Scope {
    fn from(company_id: Option<Uuid>) -> Self {
        company_id.map_or(Scope::Global, Scope::Company)
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scope::Global => f.write_str(GLOBAL_SCOPE),
            Scope::Company(id) => write!(f, "{COMPANY_PREFIX}{id}"),
        }
    }
}

impl FromStr for Scope {
    type Err = AppError;

    fn from_str(token: &str) -> Result<Self, Self::Err> {
        if token == GLOBAL_SCOPE {
            return Ok(Scope::Global);
        }
        let raw = token
            .strip_prefix(COMPANY_PREFIX)
            .ok_or_else(|| AppError::invalid_scope(token))?;
        let id = Uuid::parse_str(raw).map_err(|_| AppError::invalid_scope(token))?;
        // Only the canonical hyphenated lower-case form round-trips.
        if id.to_string() != raw {
            return Err(AppError::invalid_scope(token));
        }
        Ok(Scope::Company(id))
    }
}

pub fn build_scope(company_id: Option<Uuid>) -> String {
    Scope::from(company_id).to_string()
}

pub fn parse_scope(token: &str) -> Result<Option<Uuid>, AppError> {
    token.parse::<Scope>().map(|scope| scope.company_id())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn global_token() {
        assert_eq!(build_scope(None), "*");
        assert_eq!(parse_scope("*").unwrap(), None);
    }

    #[test]
    fn company_tokens_round_trip() {
        for _ in 0..32 {
            let id = Uuid::new_v4();
            let token = build_scope(Some(id));
            assert!(token.starts_with("company:"));
            assert_eq!(parse_scope(&token).unwrap(), Some(id));
        }
        assert_eq!(parse_scope(&build_scope(Some(Uuid::nil()))).unwrap(), Some(Uuid::nil()));
    }

    #[test]
    fn malformed_tokens_are_errors() {
        for token in [
            "",
            "**",
            "company:",
            "company:not-a-uuid",
            "tenant:0b8c7f3e-6a54-4d8e-9b52-1f0c8e1a2b3c",
            "0b8c7f3e-6a54-4d8e-9b52-1f0c8e1a2b3c",
            "company:0B8C7F3E-6A54-4D8E-9B52-1F0C8E1A2B3C",
            " company:0b8c7f3e-6a54-4d8e-9b52-1f0c8e1a2b3c",
        ] {
            let err = parse_scope(token).unwrap_err();
            assert!(matches!(err, AppError::InvalidScope(_)), "token {token:?}");
        }
    }
}
