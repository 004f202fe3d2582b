//! Lenient parsing for externally sourced raw values.
//!
//! Values arriving from properties files, environment variables, or free-form
//! CLI strings are parsed with a fallback default instead of an error: a
//! config subsystem that crashes the whole CLI over a typo'd port number is
//! worse than one that falls back sensibly.
//!
//! This is deliberately separate from the strict validation tier in
//! `settings`: merging the two would lose the fail-fast guarantee for
//! programmer errors.

use std::collections::BTreeMap;

use tracing::warn;

/// Parse an optional raw string as a positive `u32`, falling back on
/// malformed or non-positive input.
pub fn positive_int_or(raw: Option<&str>, default: u32) -> u32 {
    match raw.map(str::trim) {
        Some(s) if !s.is_empty() => match s.parse::<u32>() {
            Ok(v) if v > 0 => v,
            _ => {
                warn!("Malformed numeric value {:?}, using default {}", s, default);
                default
            }
        },
        _ => default,
    }
}

/// Parse an optional raw string as a positive `u64` (byte counts), falling
/// back on malformed or non-positive input.
pub fn positive_long_or(raw: Option<&str>, default: u64) -> u64 {
    match raw.map(str::trim) {
        Some(s) if !s.is_empty() => match s.parse::<u64>() {
            Ok(v) if v > 0 => v,
            _ => {
                warn!("Malformed numeric value {:?}, using default {}", s, default);
                default
            }
        },
        _ => default,
    }
}

/// Parse an optional raw string as a TCP port, falling back on malformed input.
pub fn port_or(raw: Option<&str>, default: u16) -> u16 {
    match raw.map(str::trim) {
        Some(s) if !s.is_empty() => s.parse::<u16>().unwrap_or_else(|_| {
            warn!("Malformed port value {:?}, using default {}", s, default);
            default
        }),
        _ => default,
    }
}

/// Parse an optional raw string as a boolean (`true`/`false`, case
/// insensitive), falling back on anything else.
pub fn bool_or(raw: Option<&str>, default: bool) -> bool {
    match raw.map(|s| s.trim().to_ascii_lowercase()) {
        Some(s) if s == "true" => true,
        Some(s) if s == "false" => false,
        Some(s) if !s.is_empty() => {
            warn!("Malformed boolean value {:?}, using default {}", s, default);
            default
        }
        _ => default,
    }
}

/// Flatten a TOML document into a dotted-key string view.
///
/// Nested tables contribute their key path joined with `.`; scalar values
/// are stringified the way they would appear in a properties file. Arrays
/// and datetimes have no properties equivalent and are skipped.
pub fn flatten_properties(table: &toml::Table) -> BTreeMap<String, String> {
    let mut out = BTreeMap::new();
    flatten_into(table, "", &mut out);
    out
}

fn flatten_into(table: &toml::Table, prefix: &str, out: &mut BTreeMap<String, String>) {
    for (key, value) in table {
        let path = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{prefix}.{key}")
        };
        match value {
            toml::Value::Table(inner) => flatten_into(inner, &path, out),
            toml::Value::String(s) => {
                out.insert(path, s.clone());
            }
            toml::Value::Integer(i) => {
                out.insert(path, i.to_string());
            }
            toml::Value::Float(f) => {
                out.insert(path, f.to_string());
            }
            toml::Value::Boolean(b) => {
                out.insert(path, b.to_string());
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_positive_int_parses_valid_values() {
        assert_eq!(positive_int_or(Some("42"), 7), 42);
        assert_eq!(positive_int_or(Some("  42  "), 7), 42);
    }

    #[test]
    fn test_positive_int_falls_back() {
        assert_eq!(positive_int_or(Some("not-a-number"), 7), 7);
        assert_eq!(positive_int_or(Some("0"), 7), 7);
        assert_eq!(positive_int_or(Some("-3"), 7), 7);
        assert_eq!(positive_int_or(Some(""), 7), 7);
        assert_eq!(positive_int_or(None, 7), 7);
    }

    #[test]
    fn test_positive_long_falls_back() {
        assert_eq!(positive_long_or(Some("524288"), 1024), 524_288);
        assert_eq!(positive_long_or(Some("huge"), 1024), 1024);
        assert_eq!(positive_long_or(None, 1024), 1024);
    }

    #[test]
    fn test_port_falls_back() {
        assert_eq!(port_or(Some("5433"), 5432), 5433);
        assert_eq!(port_or(Some("70000"), 5432), 5432);
        assert_eq!(port_or(Some("abc"), 5432), 5432);
        assert_eq!(port_or(None, 5432), 5432);
    }

    #[test]
    fn test_bool_falls_back_on_garbage() {
        assert!(bool_or(Some("true"), false));
        assert!(bool_or(Some("TRUE"), false));
        assert!(!bool_or(Some("false"), true));
        // Unlike a bare `parse`, garbage keeps the caller's default.
        assert!(bool_or(Some("yes"), true));
        assert!(!bool_or(Some("yes"), false));
        assert!(bool_or(None, true));
    }

    #[test]
    fn test_flatten_properties_dotted_keys() {
        let doc = r#"
            verbose = true

            [db]
            type = "postgresql"
            port = 5432

            [search]
            limit = 50
        "#;
        let table: toml::Table = doc.parse().unwrap();
        let props = flatten_properties(&table);

        assert_eq!(props.get("db.type").map(String::as_str), Some("postgresql"));
        assert_eq!(props.get("db.port").map(String::as_str), Some("5432"));
        assert_eq!(props.get("search.limit").map(String::as_str), Some("50"));
        assert_eq!(props.get("verbose").map(String::as_str), Some("true"));
    }

    #[test]
    fn test_flatten_skips_arrays() {
        let table: toml::Table = r#"list = [1, 2, 3]"#.parse().unwrap();
        let props = flatten_properties(&table);
        assert!(props.is_empty());
    }
}
