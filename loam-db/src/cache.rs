//! The two-tier record cache.
//!
//! Records live either in the persistent tier (unbounded, explicit
//! membership, survives for the owning pad's lifetime) or the ephemeral
//! tier (bounded, least-recently-used eviction).  A key is never in both
//! tiers at once; promotion moves it.

use crate::record::Record;
use loam_types::Classification;
use lru::LruCache;
use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::rc::Rc;

pub type CacheKey = (Classification, String);

#[derive(Debug)]
pub struct RecordCache {
    persistent: HashMap<CacheKey, Rc<Record>>,
    ephemeral: LruCache<CacheKey, Rc<Record>>,
}

fn key_of(record: &Record) -> CacheKey {
    (record.classification(), record.path().to_string())
}

impl RecordCache {
    pub fn new(ephemeral_size: usize) -> Self {
        let capacity = NonZeroUsize::new(ephemeral_size.max(1)).unwrap();
        RecordCache {
            persistent: HashMap::new(),
            ephemeral: LruCache::new(capacity),
        }
    }

    /// Look up a path in either tier, page first.  Touching the ephemeral
    /// tier refreshes recency.
    pub fn lookup(&mut self, path: &str) -> Option<Rc<Record>> {
        for classification in [Classification::Page, Classification::Attachment] {
            let key = (classification, path.to_string());
            if let Some(record) = self.persistent.get(&key) {
                return Some(Rc::clone(record));
            }
            if let Some(record) = self.ephemeral.get(&key) {
                return Some(Rc::clone(record));
            }
        }
        None
    }

    /// Whether a record is held in the persistent tier.
    pub fn is_persistent(&self, record: &Record) -> bool {
        self.persistent.contains_key(&key_of(record))
    }

    /// Register a record in the ephemeral tier.  A record already cached in
    /// either tier stays where it is.
    pub fn remember(&mut self, record: &Rc<Record>) {
        let key = key_of(record);
        if self.persistent.contains_key(&key) || self.ephemeral.contains(&key) {
            return;
        }
        self.ephemeral.put(key, Rc::clone(record));
    }

    /// Register a record in the persistent tier, removing it from the
    /// ephemeral tier if necessary.
    pub fn persist(&mut self, record: &Rc<Record>) {
        let key = key_of(record);
        self.ephemeral.pop(&key);
        self.persistent.insert(key, Rc::clone(record));
    }

    /// Promote a record to the persistent tier if and only if it currently
    /// sits in the ephemeral tier.  Called before any field mutation so
    /// that observed mutations survive eviction.
    pub fn persist_if_cached(&mut self, record: &Record) {
        let key = key_of(record);
        if let Some(cached) = self.ephemeral.pop(&key) {
            self.persistent.insert(key, cached);
        }
    }

    pub fn persistent_len(&self) -> usize {
        self.persistent.len()
    }

    pub fn ephemeral_len(&self) -> usize {
        self.ephemeral.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use loam_types::{AttachmentKind, Value};
    use std::collections::BTreeMap;

    fn record(path: &str) -> Rc<Record> {
        let mut data = BTreeMap::new();
        data.insert("_path".to_string(), Value::Text(path.into()));
        Rc::new(Record::from_data(
            Classification::Page,
            AttachmentKind::Plain,
            data,
        ))
    }

    #[test]
    fn test_remember_then_lookup() {
        let mut cache = RecordCache::new(4);
        let r = record("/blog");
        cache.remember(&r);
        let hit = cache.lookup("/blog").unwrap();
        assert!(Rc::ptr_eq(&hit, &r));
        assert!(!cache.is_persistent(&r));
    }

    #[test]
    fn test_persist_removes_from_ephemeral() {
        let mut cache = RecordCache::new(4);
        let r = record("/blog");
        cache.remember(&r);
        cache.persist(&r);
        assert!(cache.is_persistent(&r));
        assert_eq!(cache.ephemeral_len(), 0);
        assert_eq!(cache.persistent_len(), 1);
    }

    #[test]
    fn test_tiers_are_exclusive() {
        let mut cache = RecordCache::new(4);
        let r = record("/blog");
        cache.persist(&r);
        // remember after persist must not duplicate into the ephemeral tier
        cache.remember(&r);
        assert_eq!(cache.ephemeral_len(), 0);
        assert!(cache.is_persistent(&r));
    }

    #[test]
    fn test_lru_eviction() {
        let mut cache = RecordCache::new(2);
        let a = record("/a");
        let b = record("/b");
        let c = record("/c");
        cache.remember(&a);
        cache.remember(&b);
        cache.remember(&c);
        assert!(cache.lookup("/a").is_none());
        assert!(cache.lookup("/b").is_some());
        assert!(cache.lookup("/c").is_some());
    }

    #[test]
    fn test_persist_if_cached() {
        let mut cache = RecordCache::new(4);
        let r = record("/blog");
        cache.persist_if_cached(&r);
        // not cached at all: no-op
        assert_eq!(cache.persistent_len(), 0);

        cache.remember(&r);
        cache.persist_if_cached(&r);
        assert!(cache.is_persistent(&r));
        assert_eq!(cache.ephemeral_len(), 0);
    }

    #[test]
    fn test_page_and_attachment_keys_are_distinct() {
        let mut cache = RecordCache::new(4);
        let mut data = BTreeMap::new();
        data.insert("_path".to_string(), Value::Text("/blog/a.jpg".into()));
        let attachment = Rc::new(Record::from_data(
            Classification::Attachment,
            AttachmentKind::Image,
            data,
        ));
        cache.persist(&attachment);
        let page = record("/blog/a.jpg");
        assert!(!cache.is_persistent(&page));
        // lookup still finds the attachment under its path
        assert!(cache.lookup("/blog/a.jpg").is_some());
    }
}
