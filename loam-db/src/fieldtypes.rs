//! Builtin field types used to coerce raw text into typed values.

use chrono::NaiveDate;
use loam_types::{Undefined, Value};
use serde::{Deserialize, Serialize};

/// The closed set of builtin field types.
///
/// A data model declares one of these per field; raw text loaded from disk
/// is coerced through [`FieldType::parse`].  Unparseable values become the
/// undefined sentinel with a deferred "bad value" diagnostic instead of
/// failing the load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    /// Single line of text, surrounding whitespace trimmed.
    #[default]
    String,
    /// Multi-line text kept verbatim.
    Text,
    Integer,
    Float,
    Boolean,
    /// ISO dates (`%Y-%m-%d`).
    Date,
    /// Comma-separated list of strings.
    Strings,
}

impl FieldType {
    /// Coerce raw text into a typed value.
    ///
    /// `field` and `subject` only feed the diagnostic of a failed parse.
    pub fn parse(&self, raw: &str, field: &str, subject: &str) -> Value {
        match self {
            FieldType::String => Value::Text(raw.trim().to_string()),
            FieldType::Text => Value::Text(raw.to_string()),
            FieldType::Integer => match raw.trim().parse::<i64>() {
                Ok(i) => Value::Int(i),
                Err(_) => Value::Undefined(Undefined::bad(field, subject, "not an integer")),
            },
            FieldType::Float => match raw.trim().parse::<f64>() {
                Ok(f) => Value::Float(f),
                Err(_) => Value::Undefined(Undefined::bad(field, subject, "not a float")),
            },
            FieldType::Boolean => match raw.trim().to_lowercase().as_str() {
                "true" | "yes" | "1" => Value::Bool(true),
                "false" | "no" | "0" => Value::Bool(false),
                _ => Value::Undefined(Undefined::bad(field, subject, "not a boolean")),
            },
            FieldType::Date => match NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d") {
                Ok(d) => Value::Date(d),
                Err(_) => Value::Undefined(Undefined::bad(field, subject, "not an ISO date")),
            },
            FieldType::Strings => Value::Strings(
                raw.split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect(),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_string_trims() {
        assert_eq!(
            FieldType::String.parse("  hello \n", "f", "/"),
            Value::Text("hello".into())
        );
    }

    #[test]
    fn test_text_keeps_newlines() {
        assert_eq!(
            FieldType::Text.parse("a\nb", "f", "/"),
            Value::Text("a\nb".into())
        );
    }

    #[test]
    fn test_integer() {
        assert_eq!(FieldType::Integer.parse(" 42 ", "f", "/"), Value::Int(42));
        assert!(FieldType::Integer.parse("4x", "f", "/").is_undefined());
    }

    #[test]
    fn test_float() {
        assert_eq!(FieldType::Float.parse("2.5", "f", "/"), Value::Float(2.5));
    }

    #[test]
    fn test_boolean_spellings() {
        for raw in ["true", "yes", "1", "TRUE"] {
            assert_eq!(FieldType::Boolean.parse(raw, "f", "/"), Value::Bool(true));
        }
        for raw in ["false", "no", "0"] {
            assert_eq!(FieldType::Boolean.parse(raw, "f", "/"), Value::Bool(false));
        }
        assert!(FieldType::Boolean.parse("maybe", "f", "/").is_undefined());
    }

    #[test]
    fn test_date() {
        assert_eq!(
            FieldType::Date.parse("2026-08-30", "f", "/"),
            Value::Date(NaiveDate::from_ymd_opt(2026, 8, 30).unwrap())
        );
        assert!(FieldType::Date.parse("08/30/2026", "f", "/").is_undefined());
    }

    #[test]
    fn test_strings() {
        assert_eq!(
            FieldType::Strings.parse("a, b ,, c", "f", "/"),
            Value::Strings(vec!["a".into(), "b".into(), "c".into()])
        );
    }

    #[test]
    fn test_bad_value_diagnostic() {
        let v = FieldType::Integer.parse("oops", "count", "/blog");
        let Value::Undefined(u) = v else {
            panic!("expected undefined");
        };
        assert!(u.hint().contains("count"));
        assert!(u.hint().contains("/blog"));
    }
}
