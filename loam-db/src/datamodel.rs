//! Data models: named schemas governing record defaults.
//!
//! Models are YAML files under the project's `models/` directory, merged
//! over the builtin `page` and `none` models.  A model controls the default
//! child/attachment model names, child ordering, slug and template
//! generation, the visibility default, and the record label format.

use crate::fieldtypes::FieldType;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Name of the builtin generic page model.
pub const PAGE_MODEL: &str = "page";

/// Name of the builtin null model, the last resort of model resolution.
pub const NONE_MODEL: &str = "none";

#[derive(Error, Debug)]
pub enum DataModelError {
    #[error("failed to read model file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse model file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_yaml::Error,
    },
}

/// A declared record field.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldDef {
    pub name: String,

    #[serde(rename = "type", default)]
    pub field_type: FieldType,

    #[serde(default)]
    pub label: Option<String>,
}

/// Defaults a model applies to its child pages.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChildConfig {
    /// Model assigned to children without an explicit `_model`.
    #[serde(default)]
    pub model: Option<String>,

    /// Default child ordering; `-field` sorts descending.
    #[serde(default)]
    pub order_by: Vec<String>,

    /// `{field}` template for default child slugs.
    #[serde(default)]
    pub slug_format: Option<String>,
}

/// Defaults a model applies to its attachments.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AttachmentConfig {
    /// Model assigned to attachments without an explicit `_model`.
    #[serde(default)]
    pub model: Option<String>,

    #[serde(default)]
    pub order_by: Vec<String>,
}

/// A named schema resolved for every loaded record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataModel {
    /// Model name; set from the file stem when loaded from disk.
    #[serde(default)]
    pub name: String,

    /// `{field}` template for the record label.
    #[serde(default)]
    pub label: Option<String>,

    /// Visibility default for records without an explicit `_expose`.
    #[serde(default = "default_true")]
    pub expose: bool,

    #[serde(default)]
    pub fields: Vec<FieldDef>,

    #[serde(default)]
    pub child_config: ChildConfig,

    #[serde(default)]
    pub attachment_config: AttachmentConfig,

    /// The file this model was loaded from; builtins have none.
    #[serde(skip)]
    pub filename: Option<PathBuf>,
}

fn default_true() -> bool {
    true
}

impl DataModel {
    fn builtin(name: &str) -> Self {
        DataModel {
            name: name.to_string(),
            label: None,
            expose: true,
            fields: Vec::new(),
            child_config: ChildConfig::default(),
            attachment_config: AttachmentConfig::default(),
            filename: None,
        }
    }

    /// The template used when a record has no explicit `_template`.
    pub fn default_template_name(&self) -> String {
        format!("{}.html", self.name)
    }

    /// Look up the declared type of a field, if any.
    pub fn field_type(&self, name: &str) -> Option<FieldType> {
        self.fields
            .iter()
            .find(|f| f.name == name)
            .map(|f| f.field_type)
    }

    /// Format the record label through this model's label template.
    ///
    /// Returns `None` when no template is configured or the expansion comes
    /// out empty.
    pub fn format_record_label<F>(&self, lookup: F) -> Option<String>
    where
        F: Fn(&str) -> Option<String>,
    {
        let template = self.label.as_deref()?;
        let expanded = expand_template(template, lookup);
        let expanded = expanded.trim();
        if expanded.is_empty() {
            None
        } else {
            Some(expanded.to_string())
        }
    }

    /// The default slug this model assigns to a child record.
    ///
    /// Uses `child_config.slug_format` when configured, falling back to the
    /// child's own id.
    pub fn default_child_slug<F>(&self, child_id: &str, lookup: F) -> String
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(format) = self.child_config.slug_format.as_deref() {
            let slug = expand_template(format, lookup);
            let slug = slug.trim_matches('/').trim();
            if !slug.is_empty() {
                return slug.to_string();
            }
        }
        child_id.to_string()
    }
}

/// Expand a `{field}` template through a lookup.  Unknown fields expand to
/// the empty string.
pub fn expand_template<F>(template: &str, lookup: F) -> String
where
    F: Fn(&str) -> Option<String>,
{
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        match rest[open + 1..].find('}') {
            Some(close) => {
                let name = &rest[open + 1..open + 1 + close];
                if let Some(value) = lookup(name.trim()) {
                    out.push_str(&value);
                }
                rest = &rest[open + close + 2..];
            }
            None => {
                out.push_str(&rest[open..]);
                return out;
            }
        }
    }
    out.push_str(rest);
    out
}

/// The registry of all known data models.
#[derive(Debug, Clone)]
pub struct DataModels {
    models: HashMap<String, DataModel>,
}

impl DataModels {
    /// Only the builtin `page` and `none` models.
    pub fn builtin() -> Self {
        let mut models = HashMap::new();
        models.insert(PAGE_MODEL.to_string(), DataModel::builtin(PAGE_MODEL));
        models.insert(NONE_MODEL.to_string(), DataModel::builtin(NONE_MODEL));
        DataModels { models }
    }

    /// Load project models from `<models_dir>/*.yml` on top of the builtins.
    ///
    /// The model name is the file stem; an explicit `name:` in the file is
    /// overridden.
    pub fn load(models_dir: &Path) -> Result<Self, DataModelError> {
        let mut registry = Self::builtin();

        let entries = match std::fs::read_dir(models_dir) {
            Ok(entries) => entries,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(registry),
            Err(err) => {
                return Err(DataModelError::Read {
                    path: models_dir.to_path_buf(),
                    source: err,
                })
            }
        };

        for entry in entries {
            let entry = entry.map_err(|err| DataModelError::Read {
                path: models_dir.to_path_buf(),
                source: err,
            })?;
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("yml") {
                continue;
            }
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                tracing::warn!("skipping model file with unreadable name: {:?}", path);
                continue;
            };

            let contents = std::fs::read_to_string(&path).map_err(|err| DataModelError::Read {
                path: path.clone(),
                source: err,
            })?;
            let mut model: DataModel =
                serde_yaml::from_str(&contents).map_err(|err| DataModelError::Parse {
                    path: path.clone(),
                    source: err,
                })?;
            model.name = stem.to_string();
            model.filename = Some(path.clone());

            tracing::debug!("loaded data model '{}' from {:?}", model.name, path);
            registry.models.insert(model.name.clone(), model);
        }

        Ok(registry)
    }

    pub fn get(&self, name: &str) -> Option<&DataModel> {
        self.models.get(name)
    }

    pub fn insert(&mut self, model: DataModel) {
        self.models.insert(model.name.clone(), model);
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.models.keys().map(|s| s.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_models_present() {
        let models = DataModels::builtin();
        assert!(models.get(PAGE_MODEL).is_some());
        assert!(models.get(NONE_MODEL).is_some());
        assert!(models.get("blog").is_none());
    }

    #[test]
    fn test_default_template_name() {
        let model = DataModel::builtin("blog-post");
        assert_eq!(model.default_template_name(), "blog-post.html");
    }

    #[test]
    fn test_expand_template() {
        let lookup = |name: &str| match name {
            "title" => Some("Hello".to_string()),
            "year" => Some("2026".to_string()),
            _ => None,
        };
        assert_eq!(expand_template("{year}/{title}", lookup), "2026/Hello");
        assert_eq!(expand_template("{missing}", lookup), "");
        assert_eq!(expand_template("plain", lookup), "plain");
        assert_eq!(expand_template("open {brace", lookup), "open {brace");
    }

    #[test]
    fn test_default_child_slug() {
        let mut model = DataModel::builtin("blog");
        assert_eq!(model.default_child_slug("post-1", |_| None), "post-1");

        model.child_config.slug_format = Some("{year}/{id}".to_string());
        let slug = model.default_child_slug("post-1", |name| match name {
            "year" => Some("2026".to_string()),
            "id" => Some("post-1".to_string()),
            _ => None,
        });
        assert_eq!(slug, "2026/post-1");

        // An empty expansion falls back to the id.
        let slug = model.default_child_slug("post-1", |_| None);
        assert_eq!(slug, "post-1");
    }

    #[test]
    fn test_format_record_label() {
        let mut model = DataModel::builtin("blog");
        assert!(model.format_record_label(|_| None).is_none());

        model.label = Some("{title}".to_string());
        let label = model.format_record_label(|name| {
            (name == "title").then(|| "My Post".to_string())
        });
        assert_eq!(label.as_deref(), Some("My Post"));
        assert!(model.format_record_label(|_| None).is_none());
    }

    #[test]
    fn test_parse_model_yaml() {
        let model: DataModel = serde_yaml::from_str(concat!(
            "label: '{title}'\n",
            "expose: false\n",
            "fields:\n",
            "- name: title\n",
            "- name: sort_key\n",
            "  type: integer\n",
            "child_config:\n",
            "  model: blog-post\n",
            "  order_by: ['-date']\n",
        ))
        .unwrap();
        assert!(!model.expose);
        assert_eq!(model.field_type("sort_key"), Some(FieldType::Integer));
        assert_eq!(model.field_type("title"), Some(FieldType::String));
        assert_eq!(model.child_config.model.as_deref(), Some("blog-post"));
        assert_eq!(model.child_config.order_by, vec!["-date"]);
    }
}
