//! # loam-db
//!
//! A flat-file content database: a hierarchy of pages and attachments
//! addressed by slash paths, governed by resolvable data models, queryable
//! through a lazy composable expression pipeline, and cached in explicit
//! persistence tiers.
//!
//! The database is read-only over the source tree.  A build session holds
//! a [`Pad`], loads records through [`Pad::get`] and [`Pad::query`], and
//! reports its read dependencies to an ambient [`context::Context`] when
//! one is entered.

pub mod assets;
pub mod cache;
pub mod cmp;
pub mod config;
pub mod context;
pub mod datamodel;
pub mod db;
pub mod expr;
pub mod fieldtypes;
pub mod metaformat;
pub mod pad;
pub mod path;
pub mod query;
pub mod record;

pub use assets::Asset;
pub use cache::RecordCache;
pub use config::Config;
pub use context::{with_ctx, Context, ContextGuard};
pub use datamodel::{DataModel, DataModels};
pub use db::{Database, DbError, RawData};
pub use expr::{Expr, F};
pub use fieldtypes::FieldType;
pub use loam_types::{AttachmentKind, Classification, GlobalId, Undefined, Value};
pub use pad::{Pad, Resolved};
pub use query::Query;
pub use record::Record;
