//! The database: raw-data loading, data-model resolution and record
//! construction over the content store.

use crate::config::{Config, ConfigError};
use crate::context::with_ctx;
use crate::datamodel::{DataModel, DataModelError, DataModels, NONE_MODEL, PAGE_MODEL};
use crate::fieldtypes::FieldType;
use crate::metaformat;
use crate::pad::Pad;
use crate::path;
use crate::record::Record;
use loam_types::{AttachmentKind, Classification, GlobalId, Value};
use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use thiserror::Error;

/// Name of the page content file inside a record directory.
pub const CONTENT_FILE: &str = "contents.ln";

/// Suffix of attachment metadata sidecar files.
pub const SIDECAR_SUFFIX: &str = ".ln";

#[derive(Error, Debug)]
pub enum DbError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    DataModel(#[from] DataModelError),
}

/// Raw attributes loaded from a single filesystem location.
///
/// Transient: discarded once an entity has been built from it.
#[derive(Debug, Clone)]
pub struct RawData {
    /// Ordered `(key, text)` pairs as read from disk.
    pub values: Vec<(String, String)>,
    /// Canonical logical path.
    pub path: String,
    pub is_attachment: bool,
}

impl RawData {
    fn new(path: String, is_attachment: bool, values: Vec<(String, String)>) -> Self {
        RawData {
            values,
            path,
            is_attachment,
        }
    }

    /// The final path segment.
    pub fn id(&self) -> &str {
        path::basename(&self.path)
    }

    /// The owning record path, for attachments.
    pub fn attachment_for(&self) -> Option<String> {
        self.is_attachment.then(|| path::dirname(&self.path))
    }

    /// The explicitly named data model, if any.
    pub fn model(&self) -> Option<String> {
        self.values
            .iter()
            .find(|(k, _)| k == "_model")
            .map(|(_, v)| v.trim())
            .filter(|v| !v.is_empty())
            .map(|v| v.to_string())
    }
}

/// The stateless-per-call loader over the content store.
#[derive(Debug)]
pub struct Database {
    root_path: PathBuf,
    config: Config,
    datamodels: DataModels,
}

impl Database {
    /// Open a project root: loads `site.yml` and the model files.
    pub fn open(root: impl Into<PathBuf>) -> Result<Rc<Self>, DbError> {
        let root_path = root.into();
        let config = Config::load(&root_path)?;
        let datamodels = DataModels::load(&root_path.join(&config.models_dir))?;
        Ok(Rc::new(Database {
            root_path,
            config,
            datamodels,
        }))
    }

    /// Construct a database from already-built parts.
    pub fn with_parts(root: impl Into<PathBuf>, config: Config, datamodels: DataModels) -> Rc<Self> {
        Rc::new(Database {
            root_path: root.into(),
            config,
            datamodels,
        })
    }

    pub fn root_path(&self) -> &Path {
        &self.root_path
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn datamodels(&self) -> &DataModels {
        &self.datamodels
    }

    /// A fresh pad over this database.
    pub fn new_pad(self: &Rc<Self>) -> Pad {
        Pad::new(Rc::clone(self))
    }

    /// Convert a logical path into its content-store filesystem path.
    pub fn to_fs_path(&self, logical: &str) -> PathBuf {
        self.root_path
            .join(&self.config.content_dir)
            .join(path::to_fs_relative(logical))
    }

    /// The content file of a page at a logical path.
    pub fn content_file_path(&self, logical: &str) -> PathBuf {
        self.to_fs_path(logical).join(CONTENT_FILE)
    }

    /// The metadata sidecar of an attachment at a logical path.
    pub fn sidecar_path(&self, logical: &str) -> PathBuf {
        let mut os_path = self.to_fs_path(logical).into_os_string();
        os_path.push(SIDECAR_SUFFIX);
        PathBuf::from(os_path)
    }

    /// The filesystem root of the static asset tree.
    pub fn assets_path(&self) -> PathBuf {
        self.root_path.join(&self.config.assets_dir)
    }

    fn filename_choices(&self, logical: &str) -> [(PathBuf, bool); 2] {
        // Order matters: attachments can exist without a sidecar, so the
        // page form must probe first or loading would claim the record
        // exists with the wrong shape.
        [
            (self.content_file_path(logical), false),
            (self.sidecar_path(logical), true),
        ]
    }

    /// Load the raw record data for a logical path.
    ///
    /// Probes the page location then the attachment sidecar; an attachment
    /// payload without a sidecar synthesizes empty attributes.  Returns
    /// `None` when neither location yields anything.
    pub fn load_raw_data(&self, logical: &str) -> Result<Option<RawData>, DbError> {
        let canonical = path::canonicalize(logical);

        for (fs_path, is_attachment) in self.filename_choices(&canonical) {
            let text = match std::fs::read_to_string(&fs_path) {
                Ok(text) => text,
                Err(err) if matches!(err.kind(), ErrorKind::NotFound | ErrorKind::NotADirectory) => {
                    if is_attachment && self.to_fs_path(&canonical).is_file() {
                        return Ok(Some(RawData::new(canonical, true, Vec::new())));
                    }
                    continue;
                }
                Err(err) => return Err(err.into()),
            };
            let values = metaformat::tokenize(&text);
            return Ok(Some(RawData::new(canonical, is_attachment, values)));
        }

        Ok(None)
    }

    /// Enumerate the items directly below a path as `(id, is_attachment)`
    /// pairs, in directory enumeration order.
    ///
    /// An attachment path, or a directory without a content file, has no
    /// items.
    pub fn iter_items(&self, logical: &str) -> Result<Vec<(String, bool)>, DbError> {
        let canonical = path::canonicalize(logical);
        let dir = self.to_fs_path(&canonical);
        if !dir.join(CONTENT_FILE).is_file() {
            return Ok(Vec::new());
        }

        let entries = match std::fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(err.into()),
        };

        let mut items = Vec::new();
        for entry in entries {
            let entry = entry?;
            let Ok(name) = entry.file_name().into_string() else {
                continue;
            };
            if name.starts_with('.') || name == CONTENT_FILE {
                continue;
            }
            let child = dir.join(&name);
            if child.join(CONTENT_FILE).is_file() {
                items.push((name, false));
            } else if !name.ends_with(SIDECAR_SUFFIX) && child.is_file() {
                items.push((name, true));
            }
        }
        Ok(items)
    }

    /// Like [`Database::iter_items`], kept for symmetry with callers that
    /// want an owned listing.
    pub fn list_items(&self, logical: &str) -> Result<Vec<(String, bool)>, DbError> {
        self.iter_items(logical)
    }

    /// The attachment type for a path, from the configured extension table.
    pub fn get_attachment_type(&self, logical: &str) -> Option<String> {
        self.config
            .attachment_type_for(logical)
            .map(|t| t.to_string())
    }

    /// Resolve the data model governing raw data.
    ///
    /// If the data names no model, the parent record's configured child or
    /// attachment model is inherited, then the fallback chain applies:
    /// filename-derived name, the generic `page` model, the `none` model.
    ///
    /// # Panics
    ///
    /// Panics when not even the `none` model resolves; that can only
    /// happen with a broken model registry and is a configuration bug,
    /// not a caller error.
    pub fn get_datamodel_for_raw_data(
        &self,
        raw: &RawData,
        pad: &Pad,
    ) -> Result<&DataModel, DbError> {
        let mut name = raw.model();

        if name.is_none() {
            let parent = path::dirname(&raw.path);
            // At the root there is no parent to inherit from.
            if parent != raw.path {
                if let Some(parent_obj) = pad.get(&parent)? {
                    let parent_model = self.model_of(&parent_obj);
                    name = if raw.is_attachment {
                        parent_model.attachment_config.model.clone()
                    } else {
                        parent_model.child_config.model.clone()
                    };
                }
            }
        }

        let mut choices: Vec<String> = Vec::new();
        if let Some(name) = name {
            choices.push(name);
        }
        if !raw.is_attachment {
            choices.push(model_name_from_filename(raw.id()));
        }
        choices.push(PAGE_MODEL.to_string());
        choices.push(NONE_MODEL.to_string());

        for choice in &choices {
            if let Some(model) = self.datamodels.get(choice) {
                tracing::trace!("resolved model '{}' for {}", model.name, raw.path);
                return Ok(model);
            }
        }

        panic!(
            "no data model resolved for '{}' (tried {:?}); the '{}' fallback model \
             is unregistered, which is a configuration bug",
            raw.path, choices, NONE_MODEL
        );
    }

    /// The model governing an already-built record.
    ///
    /// Falls back to the generic page model when the record names an
    /// unregistered model.
    pub fn model_of(&self, record: &Record) -> &DataModel {
        let name = record.model_name();
        self.datamodels
            .get(name.as_deref().unwrap_or(PAGE_MODEL))
            .or_else(|| self.datamodels.get(PAGE_MODEL))
            .unwrap_or_else(|| {
                panic!(
                    "builtin '{}' data model is unregistered, which is a configuration bug",
                    PAGE_MODEL
                )
            })
    }

    /// Select classification and specialization for raw data.
    pub fn get_record_class(&self, raw: &RawData) -> (Classification, AttachmentKind) {
        if !raw.is_attachment {
            return (Classification::Page, AttachmentKind::Plain);
        }
        let explicit = raw
            .values
            .iter()
            .find(|(k, _)| k == "_attachment_type")
            .map(|(_, v)| v.trim().to_string())
            .filter(|v| !v.is_empty());
        let attachment_type = explicit.or_else(|| self.get_attachment_type(&raw.path));
        (
            Classification::Attachment,
            AttachmentKind::from_type(attachment_type.as_deref()),
        )
    }

    /// Coerce raw text attributes into typed values under a model.
    pub fn process_raw_data(&self, model: &DataModel, raw: &RawData) -> BTreeMap<String, Value> {
        let mut data = BTreeMap::new();
        for (key, text) in &raw.values {
            let value = match key.as_str() {
                "_hidden" | "_expose" => FieldType::Boolean.parse(text, key, &raw.path),
                key if key.starts_with('_') => FieldType::String.parse(text, key, &raw.path),
                key => model
                    .field_type(key)
                    .unwrap_or(FieldType::Text)
                    .parse(text, key, &raw.path),
            };
            data.insert(key.clone(), value);
        }

        data.insert("_path".to_string(), Value::Text(raw.path.clone()));
        data.insert("_id".to_string(), Value::Text(raw.id().to_string()));
        data.insert("_model".to_string(), Value::Text(model.name.clone()));
        if let Some(owner) = raw.attachment_for() {
            data.insert("_attachment_for".to_string(), Value::Text(owner));
        }
        data
    }

    /// Fill derived fields and register the record in the pad's cache.
    ///
    /// Idempotent: already-explicit values are left alone.
    pub fn postprocess_record(
        &self,
        record: &Rc<Record>,
        pad: &Pad,
        persist: bool,
    ) -> Result<(), DbError> {
        // Slug: explicit values are trimmed of slashes, everything else
        // takes the parent model's default child slug.
        if record.contains("_slug") {
            let trimmed = record.get("_slug").to_text().trim_matches('/').to_string();
            record.init_field("_slug", trimmed);
        } else {
            let slug = match record.parent(pad)? {
                Some(parent) => {
                    let parent_model = self.model_of(&parent);
                    parent_model.default_child_slug(&record.id(), |name| {
                        let value = record.get(name);
                        (!value.is_undefined()).then(|| value.to_text())
                    })
                }
                None => String::new(),
            };
            record.init_field("_slug", slug);
        }

        if !record.contains("_template") {
            record.init_field("_template", self.model_of(record).default_template_name());
        }

        // Global id: pure function of the ancestor id chain, root first.
        let chain = record.record_path(pad)?;
        let ids: Vec<String> = chain.iter().map(|r| r.id()).collect();
        let gid = GlobalId::from_id_chain(ids.iter().map(|s| s.as_str()));
        record.init_field("_gid", gid.to_hex());

        if record.is_attachment() && !record.contains("_attachment_type") {
            if let Some(attachment_type) = self.get_attachment_type(record.path()) {
                record.init_field("_attachment_type", attachment_type);
            }
        }

        if persist {
            pad.cache_mut().persist(record);
        } else {
            pad.cache_mut().remember(record);
        }
        Ok(())
    }

    /// Report the record's source files to the active build context, if
    /// any; a no-op otherwise.
    pub fn track_record_dependency(&self, record: &Record) {
        with_ctx(|ctx| {
            for filename in record.dependent_filenames(self) {
                ctx.record_dependency(filename);
            }
            if let Some(filename) = &self.model_of(record).filename {
                ctx.record_dependency(filename.clone());
            }
        });
    }
}

/// Derive a model name from a filename: the stem before the first dot,
/// lowercased, with `-` replaced by `_`.
fn model_name_from_filename(id: &str) -> String {
    id.split('.')
        .next()
        .unwrap_or("")
        .to_lowercase()
        .replace('-', "_")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_name_from_filename() {
        assert_eq!(model_name_from_filename("Blog-Post"), "blog_post");
        assert_eq!(model_name_from_filename("photo.tar.gz"), "photo");
        assert_eq!(model_name_from_filename("Übung.txt"), "übung");
        assert_eq!(model_name_from_filename(""), "");
    }

    #[test]
    fn test_raw_data_accessors() {
        let raw = RawData::new(
            "/blog/hello.jpg".to_string(),
            true,
            vec![("_model".to_string(), " photo ".to_string())],
        );
        assert_eq!(raw.id(), "hello.jpg");
        assert_eq!(raw.attachment_for().as_deref(), Some("/blog"));
        assert_eq!(raw.model().as_deref(), Some("photo"));

        let page = RawData::new("/blog".to_string(), false, Vec::new());
        assert_eq!(page.attachment_for(), None);
        assert_eq!(page.model(), None);
    }

    #[test]
    fn test_raw_data_blank_model_is_none() {
        let raw = RawData::new(
            "/a".to_string(),
            false,
            vec![("_model".to_string(), "   ".to_string())],
        );
        assert_eq!(raw.model(), None);
    }
}
