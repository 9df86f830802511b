//! Lenient field access for model-produced JSON.
//!
//! Models rename keys freely ("Founded Year", "founded_year", "yearFounded")
//! and fill gaps with placeholders. Lookups here compare normalized keys
//! against alias lists and turn placeholders into absence.

use serde_json::{Map, Value};

/// Values that mean "no data".
const PLACEHOLDERS: &[&str] = &[
    "",
    "-",
    "n/a",
    "na",
    "none",
    "null",
    "unknown",
    "not available",
    "not found",
    "not disclosed",
    "not publicly available",
    "not specified",
];

/// Lowercase and drop everything but ASCII letters and digits.
pub(crate) fn normalize_key(key: &str) -> String {
    key.chars()
        .filter(char::is_ascii_alphanumeric)
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

/// First value whose normalized key is one of `aliases` (already normalized).
///
/// Aliases are tried in order, so earlier aliases win when several keys match.
pub(crate) fn field<'a>(obj: &'a Map<String, Value>, aliases: &[&str]) -> Option<&'a Value> {
    aliases.iter().find_map(|alias| {
        obj.iter()
            .find(|(key, _)| normalize_key(key) == *alias)
            .map(|(_, value)| value)
    })
}

/// A string or number as trimmed text; placeholders and other types are absent.
pub(crate) fn scalar_text(value: &Value) -> Option<String> {
    let text = match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        _ => return None,
    };
    let lowered = text.to_lowercase();
    let bare = lowered.trim_end_matches('.');
    if PLACEHOLDERS.contains(&bare) {
        None
    } else {
        Some(text)
    }
}

/// [`field`] followed by [`scalar_text`].
pub(crate) fn text_field(obj: &Map<String, Value>, aliases: &[&str]) -> Option<String> {
    field(obj, aliases).and_then(scalar_text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn key_normalization() {
        assert_eq!(normalize_key("Founded Year"), "foundedyear");
        assert_eq!(normalize_key("founded_year"), "foundedyear");
        assert_eq!(normalize_key("Stock Price (if available)"), "stockpriceifavailable");
    }

    #[test]
    fn alias_lookup_is_key_insensitive() {
        let value = json!({"Number of Employees": "1,200", "HQ": "Springfield"});
        let obj = value.as_object().unwrap();
        assert_eq!(
            text_field(obj, &["employeecount", "numberofemployees"]).as_deref(),
            Some("1,200")
        );
        assert_eq!(text_field(obj, &["location", "hq"]).as_deref(), Some("Springfield"));
        assert_eq!(text_field(obj, &["revenue"]), None);
    }

    #[test]
    fn placeholders_become_absent() {
        for placeholder in ["N/A", " unknown ", "Not available.", "", "null"] {
            assert_eq!(scalar_text(&json!(placeholder)), None, "{placeholder:?}");
        }
        assert_eq!(scalar_text(&Value::Null), None);
        assert_eq!(scalar_text(&json!(["a"])), None);
        assert_eq!(scalar_text(&json!(42.5)).as_deref(), Some("42.5"));
        assert_eq!(scalar_text(&json!(" $340M ")).as_deref(), Some("$340M"));
    }
}
