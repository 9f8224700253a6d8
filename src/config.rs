use std::time::Duration;

use crate::errors::AppError;

const DEFAULT_PORT: u16 = 8000;
const DEFAULT_PERMISSION_TTL_SECS: u64 = 3600;
const DEFAULT_MEMBER_TTL_SECS: u64 = 300;
const DEFAULT_CATALOG_TTL_SECS: u64 = 600;
const DEFAULT_QUEUE_CAPACITY: usize = 1024;

/// TTLs applied to each cache layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheTtls {
    pub role_permissions: Duration,
    pub company_members: Duration,
    pub catalog: Duration,
}

impl Default for CacheTtls {
    fn default() -> Self {
        Self {
            role_permissions: Duration::from_secs(DEFAULT_PERMISSION_TTL_SECS),
            company_members: Duration::from_secs(DEFAULT_MEMBER_TTL_SECS),
            catalog: Duration::from_secs(DEFAULT_CATALOG_TTL_SECS),
        }
    }
}

/// Process configuration, read once at startup and passed down explicitly.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub port: u16,
    pub cache_enabled: bool,
    pub cache_ttls: CacheTtls,
    pub invalidation_queue_capacity: usize,
}

impl Config {
    pub fn from_env() -> Result<Self, AppError> {
        let database_url = std::env::var("DATABASE_URL")
            .map_err(|_| AppError::configuration("DATABASE_URL not set"))?;

        let port = parse_var("APP_PORT")?.unwrap_or(DEFAULT_PORT);
        let cache_enabled = match std::env::var("CACHE_ENABLED") {
            Ok(value) => parse_bool("CACHE_ENABLED", &value)?,
            Err(_) => true,
        };

        let cache_ttls = CacheTtls {
            role_permissions: Duration::from_secs(
                parse_var("PERMISSION_CACHE_TTL_SECS")?.unwrap_or(DEFAULT_PERMISSION_TTL_SECS),
            ),
            company_members: Duration::from_secs(
                parse_var("MEMBER_CACHE_TTL_SECS")?.unwrap_or(DEFAULT_MEMBER_TTL_SECS),
            ),
            catalog: Duration::from_secs(
                parse_var("CATALOG_CACHE_TTL_SECS")?.unwrap_or(DEFAULT_CATALOG_TTL_SECS),
            ),
        };

        let invalidation_queue_capacity =
            parse_var("INVALIDATION_QUEUE_CAPACITY")?.unwrap_or(DEFAULT_QUEUE_CAPACITY);
        if invalidation_queue_capacity == 0 {
            return Err(AppError::configuration(
                "INVALIDATION_QUEUE_CAPACITY must be greater than zero",
            ));
        }

        Ok(Self {
            database_url,
            port,
            cache_enabled,
            cache_ttls,
            invalidation_queue_capacity,
        })
    }
}

fn parse_var<T: std::str::FromStr>(name: &str) -> Result<Option<T>, AppError> {
    match std::env::var(name) {
        Ok(raw) if raw.trim().is_empty() => Ok(None),
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| AppError::configuration(format!("{name} has an invalid value: {raw}"))),
        Err(_) => Ok(None),
    }
}

fn parse_bool(name: &str, raw: &str) -> Result<bool, AppError> {
    match raw.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(AppError::configuration(format!("{name} has an invalid value: {raw}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_boolean_spellings() {
        assert!(parse_bool("X", "TRUE").unwrap());
        assert!(parse_bool("X", " on ").unwrap());
        assert!(!parse_bool("X", "0").unwrap());
        assert!(parse_bool("X", "maybe").is_err());
    }

    #[test]
    fn default_ttls_favour_long_lived_role_sets() {
        let ttls = CacheTtls::default();
        assert_eq!(ttls.role_permissions, Duration::from_secs(3600));
        assert!(ttls.company_members < ttls.role_permissions);
    }
}
