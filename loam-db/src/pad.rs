//! The pad: a per-build-session façade over the database.
//!
//! A pad owns the record cache and is meant to be held by exactly one
//! build session at a time; independent pads share nothing but the
//! read-only content on disk.

use crate::assets::Asset;
use crate::cache::RecordCache;
use crate::db::{Database, DbError};
use crate::path;
use crate::query::Query;
use crate::record::Record;
use std::cell::{Ref, RefCell, RefMut};
use std::rc::Rc;

/// The outcome of URL-path resolution: a content record or a static asset.
#[derive(Debug, Clone)]
pub enum Resolved {
    Record(Rc<Record>),
    Asset(Asset),
}

#[derive(Debug)]
pub struct Pad {
    db: Rc<Database>,
    cache: RefCell<RecordCache>,
}

impl Pad {
    pub fn new(db: Rc<Database>) -> Self {
        let cache = RecordCache::new(db.config().ephemeral_record_cache_size);
        Pad {
            db,
            cache: RefCell::new(cache),
        }
    }

    pub fn db(&self) -> &Database {
        &self.db
    }

    pub(crate) fn cache(&self) -> Ref<'_, RecordCache> {
        self.cache.borrow()
    }

    pub(crate) fn cache_mut(&self) -> RefMut<'_, RecordCache> {
        self.cache.borrow_mut()
    }

    /// Whether a record currently sits in the persistent cache tier.
    pub fn is_persistent(&self, record: &Record) -> bool {
        self.cache.borrow().is_persistent(record)
    }

    /// Load a record by path into the persistent cache tier.
    ///
    /// Absence of content at the path is an expected outcome and returns
    /// `Ok(None)`.
    pub fn get(&self, logical: &str) -> Result<Option<Rc<Record>>, DbError> {
        self.get_with_persist(logical, true)
    }

    /// Load a record by path, choosing the cache tier.
    pub fn get_with_persist(
        &self,
        logical: &str,
        persist: bool,
    ) -> Result<Option<Rc<Record>>, DbError> {
        let canonical = path::canonicalize(logical);

        if let Some(record) = self.cache.borrow_mut().lookup(&canonical) {
            tracing::trace!("cache hit for {}", canonical);
            return Ok(Some(record));
        }

        let Some(raw) = self.db.load_raw_data(&canonical)? else {
            return Ok(None);
        };

        let model = self.db.get_datamodel_for_raw_data(&raw, self)?;
        let (classification, attachment_kind) = self.db.get_record_class(&raw);
        let data = self.db.process_raw_data(model, &raw);
        let record = Rc::new(Record::from_data(classification, attachment_kind, data));

        self.db.postprocess_record(&record, self, persist)?;
        self.db.track_record_dependency(&record);

        tracing::debug!(
            "loaded {} {} (persist={})",
            classification.as_str(),
            canonical,
            persist
        );
        Ok(Some(record))
    }

    /// The root page of the content tree.
    pub fn root(&self) -> Result<Option<Rc<Record>>, DbError> {
        self.get("/")
    }

    /// The root of the static asset tree.
    pub fn asset_root(&self) -> Asset {
        Asset::new(self.db.assets_path(), "")
    }

    /// Resolve a URL path to a record, falling back to the asset tree.
    ///
    /// A content match is returned only when it is exposed, unless
    /// `include_invisible` is set.
    pub fn resolve_url_path(
        &self,
        url_path: &str,
        include_invisible: bool,
    ) -> Result<Option<Resolved>, DbError> {
        let canonical = path::canonicalize(url_path);
        let segments: Vec<&str> = canonical
            .split('/')
            .filter(|s| !s.is_empty())
            .collect();

        if let Some(root) = self.root()? {
            if let Some(record) = root.resolve_url_path(self, &segments)? {
                if include_invisible || record.is_exposed(self)? {
                    return Ok(Some(Resolved::Record(record)));
                }
            }
        }

        Ok(self
            .asset_root()
            .resolve_url_path(&segments)
            .map(Resolved::Asset))
    }

    /// A fresh query rooted at the given path.
    pub fn query(&self, logical: &str) -> Query<'_> {
        Query::new(self, logical)
    }
}
