//! Coercing total-order comparison for heterogeneous sort keys.

use deunicode::deunicode;
use loam_types::Value;
use std::cmp::Ordering;

/// A sort key wrapper carrying a descending flag.
///
/// Comparison applies a best-effort coercion first: two texts compare by a
/// locale/diacritic-insensitive normalized form, same-kind values compare
/// directly, and when one side is numeric the other side is parsed as that
/// numeric kind.  When nothing coerces, values fall back to a stable
/// kind-rank order so sorting mixed field values never fails.
#[derive(Debug, Clone)]
pub struct SortKey {
    pub value: Value,
    pub reverse: bool,
}

impl SortKey {
    pub fn new(value: Value, reverse: bool) -> Self {
        SortKey { value, reverse }
    }
}

/// Normalized form used for text comparison: lowercased and transliterated
/// to ASCII so diacritics do not affect the sort position.
fn sort_normalize(text: &str) -> String {
    deunicode(&text.to_lowercase())
}

fn numeric(value: &Value) -> Option<f64> {
    match value {
        Value::Int(i) => Some(*i as f64),
        Value::Float(f) => Some(*f),
        _ => None,
    }
}

/// Rank used once coercion fails; gives cross-kind comparisons a stable
/// total order with the undefined sentinel sorting first.
fn kind_rank(value: &Value) -> u8 {
    match value {
        Value::Undefined(_) => 0,
        Value::Bool(_) => 1,
        Value::Int(_) | Value::Float(_) => 2,
        Value::Date(_) => 3,
        Value::Text(_) => 4,
        Value::Strings(_) => 5,
    }
}

fn total_f64(a: f64, b: f64) -> Ordering {
    a.partial_cmp(&b).unwrap_or(Ordering::Equal)
}

/// Compare two field values under the coercion rules.
pub fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Text(x), Value::Text(y)) => sort_normalize(x).cmp(&sort_normalize(y)),
        (Value::Int(x), Value::Int(y)) => x.cmp(y),
        (Value::Float(x), Value::Float(y)) => total_f64(*x, *y),
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::Date(x), Value::Date(y)) => x.cmp(y),
        (Value::Strings(x), Value::Strings(y)) => x.cmp(y),
        (Value::Undefined(_), Value::Undefined(_)) => Ordering::Equal,
        _ => {
            // One numeric side: parse the other as the same kind, keeping
            // the originals when parsing fails.
            if let Some(x) = numeric(a) {
                if let Some(y) = coerce_to_numeric(b) {
                    return total_f64(x, y);
                }
            }
            if let Some(y) = numeric(b) {
                if let Some(x) = coerce_to_numeric(a) {
                    return total_f64(x, y);
                }
            }
            kind_rank(a).cmp(&kind_rank(b))
        }
    }
}

fn coerce_to_numeric(value: &Value) -> Option<f64> {
    match value {
        Value::Int(i) => Some(*i as f64),
        Value::Float(f) => Some(*f),
        Value::Text(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

impl PartialEq for SortKey {
    fn eq(&self, other: &Self) -> bool {
        compare_values(&self.value, &other.value) == Ordering::Equal
    }
}

impl Eq for SortKey {}

impl PartialOrd for SortKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for SortKey {
    fn cmp(&self, other: &Self) -> Ordering {
        let ordering = compare_values(&self.value, &other.value);
        if self.reverse {
            ordering.reverse()
        } else {
            ordering
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(value: impl Into<Value>) -> SortKey {
        SortKey::new(value.into(), false)
    }

    #[test]
    fn test_text_normalized_ordering() {
        // "Ä" must sort by its normalized form, not raw code points.
        assert_eq!(compare_values(&"Ä".into(), &"z".into()), Ordering::Less);
        assert_eq!(compare_values(&"Zebra".into(), &"apple".into()), Ordering::Greater);
    }

    #[test]
    fn test_numeric_coercion_with_text() {
        // "10" as text against the number 5 parses and compares numerically.
        assert_eq!(compare_values(&"10".into(), &5i64.into()), Ordering::Greater);
        assert_eq!(compare_values(&3i64.into(), &"10".into()), Ordering::Less);
    }

    #[test]
    fn test_failed_coercion_falls_back() {
        // Unparseable text against a number must not panic; it falls back
        // to the kind rank (numbers before text).
        assert_eq!(compare_values(&"abc".into(), &5i64.into()), Ordering::Greater);
        assert_eq!(compare_values(&5i64.into(), &"abc".into()), Ordering::Less);
    }

    #[test]
    fn test_cross_numeric() {
        assert_eq!(compare_values(&1i64.into(), &1.5f64.into()), Ordering::Less);
        assert_eq!(compare_values(&2i64.into(), &2.0f64.into()), Ordering::Equal);
    }

    #[test]
    fn test_undefined_sorts_first() {
        let undef = Value::Undefined(loam_types::Undefined::missing("x", "/"));
        assert_eq!(compare_values(&undef, &0i64.into()), Ordering::Less);
        assert_eq!(compare_values(&undef.clone(), &undef), Ordering::Equal);
    }

    #[test]
    fn test_reverse_flag() {
        let a = SortKey::new(1i64.into(), true);
        let b = SortKey::new(2i64.into(), true);
        assert_eq!(a.cmp(&b), Ordering::Greater);
    }

    #[test]
    fn test_sort_key_vectors() {
        let mut keys = vec![vec![key(3i64)], vec![key(1i64)], vec![key(2i64)]];
        keys.sort();
        let order: Vec<i64> = keys
            .iter()
            .map(|k| match k[0].value {
                Value::Int(i) => i,
                _ => unreachable!(),
            })
            .collect();
        assert_eq!(order, vec![1, 2, 3]);
    }
}
