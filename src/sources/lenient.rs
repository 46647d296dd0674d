//! Deserializers for listing fields that arrive as numbers on one page and
//! strings (or null) on the next.

use serde::{Deserialize, Deserializer};
use serde_json::Value;

pub fn number(v: &Value) -> Option<f64> {
    match v {
        Value::Number(n) => n.as_f64(),
        // "2.5", "3+" and similar.
        Value::String(s) => s.trim().trim_end_matches('+').parse().ok(),
        _ => None,
    }
}

pub fn opt_f64<'de, D>(d: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let v = Option::<Value>::deserialize(d)?;
    Ok(v.as_ref().and_then(number))
}

pub fn opt_i64<'de, D>(d: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(opt_f64(d)?.map(|f| f as i64))
}

/// Ids are strings on realtor and zillow, integers on redfin.
pub fn opt_id<'de, D>(d: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let v = Option::<Value>::deserialize(d)?;
    Ok(match v {
        Some(Value::String(s)) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Deserialize)]
    struct Probe {
        #[serde(default, deserialize_with = "opt_f64")]
        baths: Option<f64>,
        #[serde(default, deserialize_with = "opt_id")]
        id: Option<String>,
    }

    #[test]
    fn numbers_and_numeric_strings_both_parse() {
        let a: Probe = serde_json::from_value(json!({"baths": "2.5", "id": 123})).unwrap();
        assert_eq!(a.baths, Some(2.5));
        assert_eq!(a.id.as_deref(), Some("123"));

        let b: Probe = serde_json::from_value(json!({"baths": "3+", "id": " M123 "})).unwrap();
        assert_eq!(b.baths, Some(3.0));
        assert_eq!(b.id.as_deref(), Some("M123"));
    }

    #[test]
    fn missing_null_and_junk_become_none() {
        let p: Probe = serde_json::from_value(json!({"baths": null, "id": ""})).unwrap();
        assert_eq!(p.baths, None);
        assert_eq!(p.id, None);

        let q: Probe = serde_json::from_value(json!({"baths": "lots"})).unwrap();
        assert_eq!(q.baths, None);
    }
}
