//! The record entity: pages and attachments loaded from the content tree.

use crate::cmp::SortKey;
use crate::db::{Database, DbError};
use crate::pad::Pad;
use crate::path;
use crate::query::Query;
use loam_types::{AttachmentKind, Classification, Undefined, Value};
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::rc::Rc;

/// A loaded record: one node of the content tree.
///
/// A record's identity is its canonical path plus its classification tag;
/// the path is immutable after construction.  Attributes live in an ordered
/// mapping behind interior mutability so that records handed out through
/// the cache stay shared.
#[derive(Debug)]
pub struct Record {
    classification: Classification,
    attachment_kind: AttachmentKind,
    path: String,
    data: RefCell<BTreeMap<String, Value>>,
}

impl Record {
    /// Construct a record from processed attribute data.
    ///
    /// The data must carry `_path`; entity construction goes through the
    /// [`Database`](crate::db::Database) loader in normal operation.
    pub fn from_data(
        classification: Classification,
        attachment_kind: AttachmentKind,
        data: BTreeMap<String, Value>,
    ) -> Self {
        let path = data
            .get("_path")
            .and_then(|v| v.as_str())
            .map(path::canonicalize)
            .expect("record data must carry a _path attribute");
        Record {
            classification,
            attachment_kind,
            path,
            data: RefCell::new(data),
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// The final path segment; empty for the root.
    pub fn id(&self) -> String {
        path::basename(&self.path).to_string()
    }

    pub fn classification(&self) -> Classification {
        self.classification
    }

    pub fn is_attachment(&self) -> bool {
        self.classification == Classification::Attachment
    }

    pub fn attachment_kind(&self) -> AttachmentKind {
        self.attachment_kind
    }

    /// Look up a field value.  Absent fields return the undefined sentinel
    /// instead of failing.
    pub fn get(&self, name: &str) -> Value {
        match self.data.borrow().get(name) {
            Some(value) => value.clone(),
            None => Value::Undefined(Undefined::missing(name, &self.path)),
        }
    }

    /// Whether a field is present with a defined value.
    pub fn contains(&self, name: &str) -> bool {
        matches!(self.data.borrow().get(name), Some(v) if !v.is_undefined())
    }

    /// Set a field value.
    ///
    /// A record held only in the ephemeral cache tier is promoted to the
    /// persistent tier before the mutation lands, so an externally observed
    /// mutation always survives cache eviction.
    pub fn set(&self, pad: &Pad, name: impl Into<String>, value: impl Into<Value>) {
        pad.cache_mut().persist_if_cached(self);
        self.data.borrow_mut().insert(name.into(), value.into());
    }

    /// Delete a field, with the same promotion rule as [`Record::set`].
    pub fn delete(&self, pad: &Pad, name: &str) {
        pad.cache_mut().persist_if_cached(self);
        self.data.borrow_mut().remove(name);
    }

    /// Fill a field during postprocessing without touching cache tiers.
    pub(crate) fn init_field(&self, name: impl Into<String>, value: impl Into<Value>) {
        self.data.borrow_mut().insert(name.into(), value.into());
    }

    /// The data model governing this record.
    pub fn datamodel<'a>(&self, db: &'a Database) -> &'a crate::datamodel::DataModel {
        db.model_of(self)
    }

    /// Explicit or model-resolved model name.
    pub fn model_name(&self) -> Option<String> {
        match self.get("_model") {
            Value::Text(s) if !s.is_empty() => Some(s),
            _ => None,
        }
    }

    /// The stable hash-derived identifier spanning the ancestor chain.
    pub fn global_id(&self) -> Option<String> {
        self.get("_gid").as_str().map(|s| s.to_string())
    }

    /// The path segment this record contributes to its URL.
    pub fn slug(&self) -> String {
        self.get("_slug").to_text()
    }

    /// Whether this record is exposed.  An unset flag inherits from the
    /// model default and then from the parent chain, defaulting to true at
    /// the root.
    pub fn is_exposed(&self, pad: &Pad) -> Result<bool, DbError> {
        if let Some(explicit) = self.get("_expose").as_bool() {
            return Ok(explicit);
        }
        if !pad.db().model_of(self).expose {
            return Ok(false);
        }
        match self.parent(pad)? {
            Some(parent) => parent.is_exposed(pad),
            None => Ok(true),
        }
    }

    /// The explicit hidden flag; not inherited, defaults to false.
    pub fn is_hidden(&self) -> bool {
        self.get("_hidden").as_bool().unwrap_or(false)
    }

    /// Exposed and not hidden.
    pub fn is_visible(&self, pad: &Pad) -> Result<bool, DbError> {
        Ok(self.is_exposed(pad)? && !self.is_hidden())
    }

    /// The parent record: the dirname for a page, the owning record for an
    /// attachment.  The root has none.
    pub fn parent(&self, pad: &Pad) -> Result<Option<Rc<Record>>, DbError> {
        let parent_path = if self.is_attachment() {
            match self.get("_attachment_for") {
                Value::Text(p) => p,
                _ => return Ok(None),
            }
        } else {
            let parent = path::dirname(&self.path);
            if parent == self.path {
                return Ok(None);
            }
            parent
        };
        let persist = pad.cache().is_persistent(self);
        pad.get_with_persist(&parent_path, persist)
    }

    /// All records from the root down to this one.
    pub fn record_path(self: &Rc<Self>, pad: &Pad) -> Result<Vec<Rc<Record>>, DbError> {
        let mut chain = vec![Rc::clone(self)];
        while let Some(parent) = chain.last().unwrap().parent(pad)? {
            chain.push(parent);
        }
        chain.reverse();
        Ok(chain)
    }

    /// The URL path: every ancestor's slug, root to leaf.  Pages carry a
    /// trailing slash; attachments do not.
    pub fn url_path(self: &Rc<Self>, pad: &Pad) -> Result<String, DbError> {
        let chain = self.record_path(pad)?;
        let joined = chain
            .iter()
            .map(|r| r.slug())
            .collect::<Vec<_>>()
            .join("/");
        let mut url = format!("/{}", joined.trim_matches('/'));
        if self.classification == Classification::Page && !url.ends_with('/') {
            url.push('/');
        }
        Ok(url)
    }

    /// The generic record label: the model's label template if it expands,
    /// otherwise derived from the id.
    pub fn record_label(&self, db: &Database) -> String {
        let model = db.model_of(self);
        if let Some(label) = model.format_record_label(|name| {
            let value = self.get(name);
            (!value.is_undefined()).then(|| value.to_text())
        }) {
            return label;
        }
        let id = self.id();
        if self.is_attachment() {
            return id;
        }
        if id.is_empty() {
            return "(Index)".to_string();
        }
        title_case(&id.replace(['-', '_'], " "))
    }

    /// Sort keys for the given field specs; a `-` prefix sorts descending,
    /// a `+` prefix is accepted and ignored.
    pub fn sort_key(&self, fields: &[String]) -> Vec<SortKey> {
        fields
            .iter()
            .map(|spec| {
                let (name, reverse) = match spec.strip_prefix('-') {
                    Some(rest) => (rest, true),
                    None => (spec.trim_start_matches('+'), false),
                };
                SortKey::new(self.get(name), reverse)
            })
            .collect()
    }

    /// Whether this record sits at or below the given path.
    pub fn is_child_of(&self, ancestor: &str) -> bool {
        let own_path = path::canonicalize(&self.path);
        let ancestor_path = path::canonicalize(ancestor);
        // Empty segments would make the root an impossible prefix.
        let own: Vec<&str> = own_path.split('/').filter(|s| !s.is_empty()).collect();
        let crumbs: Vec<&str> = ancestor_path
            .split('/')
            .filter(|s| !s.is_empty())
            .collect();
        own.len() >= crumbs.len() && own[..crumbs.len()] == crumbs[..]
    }

    /// A snapshot of all fields and values.
    pub fn to_dict(&self) -> BTreeMap<String, Value> {
        self.data.borrow().clone()
    }

    /// Ordered field iteration over a snapshot.
    pub fn iter_fields(&self) -> Vec<(String, Value)> {
        self.data
            .borrow()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    /// JSON projection of the field data.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::Value::Object(
            self.data
                .borrow()
                .iter()
                .map(|(k, v)| (k.clone(), v.to_json()))
                .collect(),
        )
    }

    /// Every filesystem path this record's contents were read from.  Used
    /// for dependency reporting and incremental rebuild triggering.
    pub fn dependent_filenames(&self, db: &Database) -> Vec<PathBuf> {
        if self.is_attachment() {
            let payload = db.to_fs_path(&self.path);
            let sidecar = db.sidecar_path(&self.path);
            let mut files = Vec::new();
            // The sidecar commonly does not exist for attachments without
            // metadata; only report it when it is actually on disk.
            if sidecar.is_file() {
                files.push(sidecar);
            }
            files.push(payload);
            files
        } else {
            vec![db.content_file_path(&self.path)]
        }
    }

    /// A query over all children, hidden included.
    pub fn all_children<'a>(&self, pad: &'a Pad) -> Query<'a> {
        Query::new(pad, &self.path)
    }

    /// A query over visible children only.
    pub fn children<'a>(&self, pad: &'a Pad) -> Query<'a> {
        self.all_children(pad).visible_only()
    }

    /// A query over the attachments of this record.
    pub fn attachments<'a>(&self, pad: &'a Pad) -> Query<'a> {
        Query::attachments(pad, &self.path)
    }

    /// Direct single-child lookup by id.
    pub fn find_page(&self, pad: &Pad, id: &str) -> Result<Option<Rc<Record>>, DbError> {
        self.all_children(pad).get(id)
    }

    /// Resolve URL segments relative to this record.
    ///
    /// Tries progressively longer joined prefixes against child page slugs
    /// first, then attachment slugs, recursing into the first match; slugs
    /// may span multiple segments.
    pub fn resolve_url_path(
        self: &Rc<Self>,
        pad: &Pad,
        segments: &[&str],
    ) -> Result<Option<Rc<Record>>, DbError> {
        if segments.is_empty() {
            return Ok(Some(Rc::clone(self)));
        }
        if self.is_attachment() {
            return Ok(None);
        }

        for idx in 0..segments.len() {
            let piece = segments[..=idx].join("/");
            let node = match self
                .all_children(pad)
                .filter(crate::expr::F::field("_slug").eq(piece.as_str()))
                .first()?
            {
                Some(child) => child,
                None => match self
                    .attachments(pad)
                    .filter(crate::expr::F::field("_slug").eq(piece.as_str()))
                    .first()?
                {
                    Some(attachment) => attachment,
                    None => continue,
                },
            };

            if let Some(resolved) = node.resolve_url_path(pad, &segments[idx + 1..])? {
                return Ok(Some(resolved));
            }
        }

        Ok(None)
    }
}

fn title_case(text: &str) -> String {
    text.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(path: &str, fields: &[(&str, Value)]) -> Record {
        let mut data = BTreeMap::new();
        data.insert("_path".to_string(), Value::Text(path.into()));
        for (name, value) in fields {
            data.insert(name.to_string(), value.clone());
        }
        Record::from_data(Classification::Page, AttachmentKind::Plain, data)
    }

    #[test]
    fn test_identity() {
        let r = record("/blog/post-1", &[]);
        assert_eq!(r.path(), "/blog/post-1");
        assert_eq!(r.id(), "post-1");
        assert_eq!(r.classification(), Classification::Page);
    }

    #[test]
    fn test_root_id_is_empty() {
        let r = record("/", &[]);
        assert_eq!(r.id(), "");
    }

    #[test]
    fn test_get_missing_is_undefined() {
        let r = record("/blog", &[]);
        let value = r.get("title");
        assert!(value.is_undefined());
        let Value::Undefined(u) = value else { unreachable!() };
        assert!(u.hint().contains("/blog"));
        assert!(!r.contains("title"));
    }

    #[test]
    fn test_is_hidden_defaults_false() {
        let r = record("/blog", &[]);
        assert!(!r.is_hidden());
        let r = record("/blog", &[("_hidden", Value::Bool(true))]);
        assert!(r.is_hidden());
    }

    #[test]
    fn test_sort_key_specs() {
        let r = record("/blog", &[("n", Value::Int(3))]);
        let keys = r.sort_key(&["-n".to_string(), "+n".to_string(), "n".to_string()]);
        assert!(keys[0].reverse);
        assert!(!keys[1].reverse);
        assert!(!keys[2].reverse);
    }

    #[test]
    fn test_is_child_of() {
        let r = record("/blog/post-1", &[]);
        assert!(r.is_child_of("/blog"));
        assert!(r.is_child_of("/blog/post-1"));
        assert!(r.is_child_of("/"));
        assert!(!r.is_child_of("/blog/post-11"));
        assert!(!r.is_child_of("/other"));

        let root = record("/", &[]);
        assert!(root.is_child_of("/"));
        assert!(!root.is_child_of("/blog"));
    }

    #[test]
    fn test_title_case_label_shape() {
        assert_eq!(title_case("hello world"), "Hello World");
        assert_eq!(title_case("a"), "A");
    }

    #[test]
    fn test_to_json_shape() {
        let r = record("/blog", &[("title", Value::Text("T".into()))]);
        let json = r.to_json();
        assert_eq!(json["title"], serde_json::json!("T"));
        assert_eq!(json["_path"], serde_json::json!("/blog"));
    }
}
