//! Shared types for loam
//!
//! This crate provides the common leaf types used across the loam content
//! database: the typed field [`Value`] with its lazy [`Undefined`] sentinel,
//! record classification tags, and the stable [`GlobalId`].

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Classification of a record within the content tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Classification {
    Page,
    Attachment,
}

impl Classification {
    pub fn as_str(&self) -> &'static str {
        match self {
            Classification::Page => "page",
            Classification::Attachment => "attachment",
        }
    }
}

/// Specialized behavior tag for attachments.
///
/// Attachments form a closed set of variants selected during classification
/// from the attachment-type table; everything without a specialized variant
/// is `Plain`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttachmentKind {
    Plain,
    Image,
}

impl AttachmentKind {
    /// Select the variant for an attachment type name.
    pub fn from_type(attachment_type: Option<&str>) -> Self {
        match attachment_type {
            Some("image") => AttachmentKind::Image,
            _ => AttachmentKind::Plain,
        }
    }
}

/// The sentinel for a missing or unusable field value.
///
/// Construction is cheap: the diagnostic string is only composed when
/// [`Undefined::hint`] is called.
#[derive(Debug, Clone)]
pub struct Undefined {
    field: String,
    subject: String,
    note: Option<String>,
}

impl Undefined {
    /// A value that was simply absent.
    pub fn missing(field: impl Into<String>, subject: impl Into<String>) -> Self {
        Undefined {
            field: field.into(),
            subject: subject.into(),
            note: None,
        }
    }

    /// A value that was present but could not be used.
    pub fn bad(
        field: impl Into<String>,
        subject: impl Into<String>,
        note: impl Into<String>,
    ) -> Self {
        Undefined {
            field: field.into(),
            subject: subject.into(),
            note: Some(note.into()),
        }
    }

    pub fn field(&self) -> &str {
        &self.field
    }

    /// Compose the diagnostic message for this sentinel.
    pub fn hint(&self) -> String {
        match &self.note {
            Some(note) => format!(
                "bad value in field '{}' of '{}': {}",
                self.field, self.subject, note
            ),
            None => format!("missing value in field '{}' of '{}'", self.field, self.subject),
        }
    }
}

/// A typed field value.
///
/// Record attributes are an ordered mapping from name to `Value`.  Lookups
/// of absent fields return [`Value::Undefined`] rather than failing, so the
/// sentinel can flow through expressions and sort keys without raising.
#[derive(Debug, Clone)]
pub enum Value {
    Text(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    Date(NaiveDate),
    Strings(Vec<String>),
    Undefined(Undefined),
}

impl Value {
    pub fn is_undefined(&self) -> bool {
        matches!(self, Value::Undefined(_))
    }

    /// Truthiness, as used by filter expressions: empty text, zero
    /// numbers, empty lists and the undefined sentinel are all false.
    pub fn is_true(&self) -> bool {
        match self {
            Value::Text(s) => !s.is_empty(),
            Value::Int(i) => *i != 0,
            Value::Float(f) => *f != 0.0,
            Value::Bool(b) => *b,
            Value::Date(_) => true,
            Value::Strings(v) => !v.is_empty(),
            Value::Undefined(_) => false,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// The text rendering of this value.  Undefined renders as the empty
    /// string, mirroring how the sentinel behaves in templates.
    pub fn to_text(&self) -> String {
        match self {
            Value::Text(s) => s.clone(),
            Value::Int(i) => i.to_string(),
            Value::Float(f) => f.to_string(),
            Value::Bool(b) => b.to_string(),
            Value::Date(d) => d.format("%Y-%m-%d").to_string(),
            Value::Strings(v) => v.join(", "),
            Value::Undefined(_) => String::new(),
        }
    }

    /// A JSON projection of this value.  Undefined maps to `null`.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Text(s) => serde_json::Value::String(s.clone()),
            Value::Int(i) => serde_json::Value::from(*i),
            Value::Float(f) => serde_json::Value::from(*f),
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Date(d) => serde_json::Value::String(d.format("%Y-%m-%d").to_string()),
            Value::Strings(v) => {
                serde_json::Value::Array(v.iter().cloned().map(serde_json::Value::String).collect())
            }
            Value::Undefined(_) => serde_json::Value::Null,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            // The undefined sentinel never equals anything, itself included.
            (Value::Undefined(_), _) | (_, Value::Undefined(_)) => false,
            (Value::Text(a), Value::Text(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Int(a), Value::Float(b)) | (Value::Float(b), Value::Int(a)) => {
                *a as f64 == *b
            }
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Date(a), Value::Date(b)) => a == b,
            (Value::Strings(a), Value::Strings(b)) => a == b,
            _ => false,
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<NaiveDate> for Value {
    fn from(d: NaiveDate) -> Self {
        Value::Date(d)
    }
}

impl From<Vec<String>> for Value {
    fn from(v: Vec<String>) -> Self {
        Value::Strings(v)
    }
}

/// Stable 128-bit identifier derived from a record's ancestor id chain.
///
/// The chain is hashed most distant first (root down to the record), so the
/// id is a pure function of the path segment chain and survives reloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GlobalId([u8; 16]);

impl GlobalId {
    /// Hash an id chain, root first.
    pub fn from_id_chain<'a, I>(ids: I) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut hasher = blake3::Hasher::new();
        for id in ids {
            hasher.update(id.as_bytes());
            // Separator byte so ("ab", "c") and ("a", "bc") hash apart.
            hasher.update(&[0]);
        }
        let digest = hasher.finalize();
        let mut bytes = [0u8; 16];
        bytes.copy_from_slice(&digest.as_bytes()[..16]);
        GlobalId(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 16] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for GlobalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification_as_str() {
        assert_eq!(Classification::Page.as_str(), "page");
        assert_eq!(Classification::Attachment.as_str(), "attachment");
    }

    #[test]
    fn test_attachment_kind_selection() {
        assert_eq!(AttachmentKind::from_type(Some("image")), AttachmentKind::Image);
        assert_eq!(AttachmentKind::from_type(Some("video")), AttachmentKind::Plain);
        assert_eq!(AttachmentKind::from_type(None), AttachmentKind::Plain);
    }

    #[test]
    fn test_undefined_hint_is_deferred() {
        let undef = Undefined::missing("title", "/blog/post");
        assert_eq!(undef.hint(), "missing value in field 'title' of '/blog/post'");

        let bad = Undefined::bad("count", "/blog", "not an integer");
        assert!(bad.hint().contains("not an integer"));
    }

    #[test]
    fn test_undefined_never_equals() {
        let a = Value::Undefined(Undefined::missing("x", "/"));
        let b = Value::Undefined(Undefined::missing("x", "/"));
        assert_ne!(a, b);
        assert_ne!(a, Value::Text(String::new()));
    }

    #[test]
    fn test_value_truthiness() {
        assert!(!Value::Text(String::new()).is_true());
        assert!(Value::Text("x".into()).is_true());
        assert!(!Value::Int(0).is_true());
        assert!(Value::Int(-3).is_true());
        assert!(!Value::Undefined(Undefined::missing("x", "/")).is_true());
    }

    #[test]
    fn test_cross_numeric_equality() {
        assert_eq!(Value::Int(1), Value::Float(1.0));
        assert_ne!(Value::Int(1), Value::Text("1".into()));
    }

    #[test]
    fn test_global_id_deterministic() {
        let a = GlobalId::from_id_chain(["", "blog", "post-1"]);
        let b = GlobalId::from_id_chain(["", "blog", "post-1"]);
        assert_eq!(a, b);
        assert_eq!(a.to_hex().len(), 32);
    }

    #[test]
    fn test_global_id_separator() {
        let a = GlobalId::from_id_chain(["ab", "c"]);
        let b = GlobalId::from_id_chain(["a", "bc"]);
        assert_ne!(a, b);
    }
}
