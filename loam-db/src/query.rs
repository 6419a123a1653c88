//! The lazy filter/order/paginate query pipeline.

use crate::db::DbError;
use crate::expr::{Expr, F};
use crate::pad::Pad;
use crate::path;
use crate::record::Record;
use std::rc::Rc;

/// A query over one directory level of the content tree.
///
/// Queries are immutable builders: every method returns a copy with one
/// field changed and never mutates the original.  Applying any filter,
/// ordering or pagination clears the pristine flag; [`Query::get`] demands
/// a pristine query because it bypasses the pipeline entirely.
#[derive(Debug, Clone)]
pub struct Query<'a> {
    pad: &'a Pad,
    pub path: String,
    include_pages: bool,
    include_attachments: bool,
    order_by: Option<Vec<String>>,
    filters: Vec<Expr>,
    limit: Option<usize>,
    offset: Option<usize>,
    visible_only: bool,
    pristine: bool,
}

impl<'a> Query<'a> {
    /// A fresh query over the children of a path.
    pub fn new(pad: &'a Pad, logical: &str) -> Self {
        Query {
            pad,
            path: path::canonicalize(logical),
            include_pages: true,
            include_attachments: false,
            order_by: None,
            filters: Vec::new(),
            limit: None,
            offset: None,
            visible_only: false,
            pristine: true,
        }
    }

    /// A fresh query over the attachments of a path.
    pub fn attachments(pad: &'a Pad, logical: &str) -> Self {
        let mut query = Query::new(pad, logical);
        query.include_pages = false;
        query.include_attachments = true;
        query
    }

    /// The record this query starts out from.
    pub fn self_record(&self) -> Result<Option<Rc<Record>>, DbError> {
        self.pad.get(&self.path)
    }

    fn dirty_clone(&self) -> Self {
        let mut query = self.clone();
        query.pristine = false;
        query
    }

    /// Add a filter expression; filters apply in the order added.
    pub fn filter(&self, expr: Expr) -> Self {
        let mut query = self.dirty_clone();
        query.filters.push(expr);
        query
    }

    /// Restrict results to visible records.
    pub fn visible_only(&self) -> Self {
        let mut query = self.dirty_clone();
        query.visible_only = true;
        query
    }

    /// Include attachments alongside pages.
    pub fn with_attachments(&self) -> Self {
        let mut query = self.dirty_clone();
        query.include_attachments = true;
        query
    }

    /// Set the ordering fields; a `-` prefix sorts descending.
    pub fn order_by(&self, fields: &[&str]) -> Self {
        let mut query = self.dirty_clone();
        query.order_by = if fields.is_empty() {
            None
        } else {
            Some(fields.iter().map(|f| f.to_string()).collect())
        };
        query
    }

    pub fn offset(&self, offset: usize) -> Self {
        let mut query = self.dirty_clone();
        query.offset = Some(offset);
        query
    }

    pub fn limit(&self, limit: usize) -> Self {
        let mut query = self.dirty_clone();
        query.limit = Some(limit);
        query
    }

    /// Attachments of type `image`.
    pub fn images(&self) -> Self {
        self.filter(F::field("_attachment_type").eq("image"))
    }

    /// Attachments of type `video`.
    pub fn videos(&self) -> Self {
        self.filter(F::field("_attachment_type").eq("video"))
    }

    /// Attachments of type `audio`.
    pub fn audio(&self) -> Self {
        self.filter(F::field("_attachment_type").eq("audio"))
    }

    /// The ordering in effect: the explicit fields if set, otherwise the
    /// starting record's model default for this query's item kind.
    pub fn get_order_by(&self) -> Result<Option<Vec<String>>, DbError> {
        if let Some(fields) = &self.order_by {
            return Ok(Some(fields.clone()));
        }
        let Some(base) = self.self_record()? else {
            return Ok(None);
        };
        let model = self.pad.db().model_of(&base);
        let fields = if self.include_attachments && !self.include_pages {
            &model.attachment_config.order_by
        } else {
            &model.child_config.order_by
        };
        if fields.is_empty() {
            Ok(None)
        } else {
            Ok(Some(fields.clone()))
        }
    }

    fn load_child(&self, id: &str, persist: bool) -> Result<Option<Rc<Record>>, DbError> {
        self.pad
            .get_with_persist(&path::join(&self.path, id), persist)
    }

    /// Lazily scan the directory level, applying inclusion flags,
    /// visibility and filters; ordering and pagination are not applied.
    fn scan(&self) -> Result<RawScan<'_, 'a>, DbError> {
        let items = self.pad.db().iter_items(&self.path)?;
        Ok(RawScan {
            query: self,
            items,
            index: 0,
        })
    }

    /// All matching records, ordered and paginated.
    pub fn all(&self) -> Result<Vec<Rc<Record>>, DbError> {
        let mut records = Vec::new();
        for record in self.scan()? {
            records.push(record?);
        }

        if let Some(fields) = self.get_order_by()? {
            records.sort_by_cached_key(|record| record.sort_key(&fields));
        }

        let offset = self.offset.unwrap_or(0);
        let records: Vec<_> = records
            .into_iter()
            .skip(offset)
            .take(self.limit.unwrap_or(usize::MAX))
            .collect();
        Ok(records)
    }

    /// The first matching record.
    ///
    /// Without ordering or pagination this stops the scan at the first
    /// match instead of materializing the result set.
    pub fn first(&self) -> Result<Option<Rc<Record>>, DbError> {
        let needs_pipeline =
            self.get_order_by()?.is_some() || self.offset.is_some() || self.limit.is_some();
        if needs_pipeline {
            return Ok(self.all()?.into_iter().next());
        }
        match self.scan()?.next() {
            Some(record) => Ok(Some(record?)),
            None => Ok(None),
        }
    }

    /// Count all matching records; ordering and pagination do not change
    /// what is counted, so the scan runs unsorted.
    pub fn count(&self) -> Result<usize, DbError> {
        let mut count = 0;
        for record in self.scan()? {
            record?;
            count += 1;
        }
        Ok(count)
    }

    /// Direct single-child lookup by path segment, bypassing the pipeline.
    ///
    /// # Panics
    ///
    /// Panics when called on a non-pristine query; ignoring applied
    /// filters silently would be a bug in the caller.
    pub fn get(&self, id: &str) -> Result<Option<Rc<Record>>, DbError> {
        assert!(
            self.pristine,
            "Query::get on a non-pristine query for '{}'; get bypasses filters, \
             ordering and pagination and must be called before any are applied",
            self.path
        );
        self.load_child(id, true)
    }

    pub fn is_pristine(&self) -> bool {
        self.pristine
    }
}

/// The lazy scan iterator backing query execution.
struct RawScan<'q, 'a> {
    query: &'q Query<'a>,
    items: Vec<(String, bool)>,
    index: usize,
}

impl Iterator for RawScan<'_, '_> {
    type Item = Result<Rc<Record>, DbError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let (id, is_attachment) = self.items.get(self.index)?.clone();
            self.index += 1;

            let included = if is_attachment {
                self.query.include_attachments
            } else {
                self.query.include_pages
            };
            if !included {
                continue;
            }

            let record = match self.query.load_child(&id, false) {
                Ok(Some(record)) => record,
                // Listed a moment ago but gone now: skip, racing deletes
                // are the build scheduler's problem.
                Ok(None) => continue,
                Err(err) => return Some(Err(err)),
            };

            if self.query.visible_only {
                match record.is_visible(self.query.pad) {
                    Ok(true) => {}
                    Ok(false) => continue,
                    Err(err) => return Some(Err(err)),
                }
            }

            let failed = self
                .query
                .filters
                .iter()
                .any(|filter| !filter.evaluate(&record).is_true());
            if failed {
                continue;
            }

            return Some(Ok(record));
        }
    }
}
