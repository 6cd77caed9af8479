//! Tolerant field decoders for backend rows.
//!
//! The backend serializes PostgreSQL `bigint`/`numeric` columns as strings and
//! leaves nullable text columns as `null`, so every field accepts either form
//! and falls back to `None` instead of failing the whole row.

use serde::{Deserialize, Deserializer};
use serde_json::Value;

pub fn opt_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    })
}

pub fn opt_i64<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => s.trim().parse().ok(),
        Value::Bool(b) => Some(i64::from(b)),
        _ => None,
    })
}

pub fn opt_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
    .filter(|v: &f64| v.is_finite()))
}

/// Any JSON value, with `null` mapped to `None`.
pub fn opt_value<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Null => None,
        other => Some(other),
    })
}

#[cfg(test)]
mod tests {
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Deserialize)]
    struct Row {
        #[serde(default, deserialize_with = "super::opt_string")]
        name: Option<String>,
        #[serde(default, deserialize_with = "super::opt_i64")]
        id: Option<i64>,
        #[serde(default, deserialize_with = "super::opt_f64")]
        lat: Option<f64>,
    }

    #[test]
    fn accepts_numbers_as_strings_and_strings_as_numbers() {
        let row: Row = serde_json::from_value(json!({"name": 15, "id": "42", "lat": "-12.05"}))
            .expect("row should decode");
        assert_eq!(row.name.as_deref(), Some("15"));
        assert_eq!(row.id, Some(42));
        assert_eq!(row.lat, Some(-12.05));
    }

    #[test]
    fn unusable_values_become_none() {
        let row: Row = serde_json::from_value(json!({"name": null, "id": "x", "lat": [1]}))
            .expect("row should decode");
        assert_eq!(row.name, None);
        assert_eq!(row.id, None);
        assert_eq!(row.lat, None);
    }

    #[test]
    fn missing_fields_default_to_none() {
        let row: Row = serde_json::from_value(json!({})).expect("row should decode");
        assert!(row.name.is_none() && row.id.is_none() && row.lat.is_none());
    }
}
