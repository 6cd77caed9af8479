use chrono::{DateTime, Local, NaiveDate, NaiveDateTime};

/// Parse the timestamp shapes the backend emits: RFC 3339, or a naive
/// `YYYY-MM-DD[ T]HH:MM:SS[.fff]`, or a bare date.
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Local).naive_local());
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(dt);
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

/// `dd/mm/yyyy`, or `-` when missing or unparsable.
pub fn format_date(raw: Option<&str>) -> String {
    raw.and_then(parse_timestamp)
        .map(|dt| dt.format("%d/%m/%Y").to_string())
        .unwrap_or_else(|| "-".to_owned())
}

/// `dd/mm/yyyy HH:MM:SS`, or `-` when missing or unparsable.
pub fn format_datetime(raw: Option<&str>) -> String {
    raw.and_then(parse_timestamp)
        .map(|dt| dt.format("%d/%m/%Y %H:%M:%S").to_string())
        .unwrap_or_else(|| "-".to_owned())
}
