use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};

use crate::errors::AppError;

pub fn utc_now() -> DateTime<Utc> {
    Utc::now()
}

/// Lower-cases and trims a resource name so lookups are case-insensitive.
pub fn normalize_resource(resource: &str) -> String {
    resource.trim().to_lowercase()
}

pub fn parse_datetime(s: &str) -> Result<DateTime<Utc>, AppError> {
    let s = s.trim();

    // Try RFC3339 first (e.g. 2025-11-19T12:34:56Z)
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }

    // SQLite default timestamp format: "YYYY-MM-DD HH:MM:SS" (optional fractional seconds)
    if let Ok(naive) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f") {
        return Ok(Utc.from_utc_datetime(&naive));
    }

    if let Ok(naive_date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        let ndt = naive_date
            .and_hms_opt(0, 0, 0)
            .ok_or_else(|| AppError::internal("invalid datetime: date out of range"))?;
        return Ok(Utc.from_utc_datetime(&ndt));
    }

    Err(AppError::internal(format!("invalid datetime: {}", s)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    #[test]
    fn parses_sqlite_and_rfc3339_formats() {
        let a = parse_datetime("2025-03-01T10:15:00Z").unwrap();
        let b = parse_datetime("2025-03-01 10:15:00").unwrap();
        assert_eq!(a, b);

        let c = parse_datetime("2025-03-01").unwrap();
        assert_eq!(c.day(), 1);
        assert_eq!(c.hour(), 0);

        assert!(parse_datetime("yesterday").is_err());
    }

    #[test]
    fn normalizes_resource_names() {
        assert_eq!(normalize_resource("  Invoices "), "invoices");
    }
}
