//! Vendor export normalizers.
//!
//! Both normalizers accept loosely-typed, schema-drifting JSON structures
//! that exporters have renamed across the years. Each models its accepted
//! inputs as a closed set of shapes resolved by structural probing at the
//! boundary, and converges to [`CanonicalEvent`](crate::models::CanonicalEvent)
//! immediately - the loose shape never leaks past this module.
//!
//! Container keys carry multiple historical aliases; aliases are tried in
//! a fixed order and the first present wins, never merged with another.
//! Records missing a required identifying field or timestamp are skipped,
//! not errored; unroutable top-level keys are silently ignored.

pub mod social;
pub mod takeout;

use serde_json::Value;

/// First present alias on a JSON object, in the given fixed order.
pub(crate) fn first_present<'a>(obj: &'a Value, aliases: &[&str]) -> Option<&'a Value> {
    aliases.iter().find_map(|key| obj.get(key))
}

/// First alias that holds a non-empty string.
pub(crate) fn str_alias<'a>(obj: &'a Value, aliases: &[&str]) -> Option<&'a str> {
    first_present(obj, aliases).and_then(Value::as_str).map(str::trim).filter(|s| !s.is_empty())
}

/// First alias that holds an array.
pub(crate) fn array_alias<'a>(obj: &'a Value, aliases: &[&str]) -> Option<&'a [Value]> {
    first_present(obj, aliases).and_then(Value::as_array).map(Vec::as_slice)
}

/// Render a timestamp-ish JSON value (ISO string, epoch number in any
/// precision the dialect table knows) as a string for date resolution.
pub(crate) fn date_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_first_present_fixed_order() {
        let obj = json!({"connections": [1], "friends": [2]});
        // "friends" is the earlier alias: it wins even though
        // "connections" is also present.
        let hit = first_present(&obj, &["friends", "connections"]).unwrap();
        assert_eq!(hit, &json!([2]));
    }

    #[test]
    fn test_str_alias_skips_empty() {
        let obj = json!({"title": "  ", "summary": "Real"});
        assert_eq!(str_alias(&obj, &["title", "summary"]), None);
        assert_eq!(str_alias(&obj, &["summary", "title"]), Some("Real"));
    }

    #[test]
    fn test_date_string_number() {
        assert_eq!(date_string(&json!(1622894400)), Some("1622894400".to_string()));
        assert_eq!(date_string(&json!(null)), None);
    }
}
