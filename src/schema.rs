//! Template schemas loaded from TOML
//!
//! A schema declares roots, keys and templates in one document:
//!
//! ```toml
//! [roots.primary]
//! linux = "/mnt/projects/demo"
//! windows = "P:\\demo"
//!
//! [keys.Shot]
//! type = "str"
//! filter_by = "alphanumeric"
//!
//! [keys.version]
//! type = "int"
//! format_spec = "03"
//!
//! [paths]
//! shot_root = "shots/{Shot}"
//! shot_work = { definition = "shots/{Shot}/work/v{version}.ma", root_name = "primary" }
//!
//! [strings]
//! shot_label = { definition = "{Shot} v{version}", validate_with = "shot_work" }
//! ```

use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::Arc;

use serde::Deserialize;
use tracing::debug;

use crate::error::TemplateError;
use crate::keys::{KeyBuilder, KeyOptions, TemplateKey};
use crate::template::{Platform, Template};

/// Root used by path templates that do not name one
pub const DEFAULT_ROOT_NAME: &str = "primary";

/// Deserialized schema document
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Schema {
    /// Root name -> platform name -> root path
    #[serde(default)]
    pub roots: BTreeMap<String, BTreeMap<String, String>>,
    #[serde(default)]
    pub keys: BTreeMap<String, KeyOptions>,
    #[serde(default)]
    pub paths: BTreeMap<String, PathEntry>,
    #[serde(default)]
    pub strings: BTreeMap<String, StringEntry>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum PathEntry {
    Definition(String),
    Full {
        definition: String,
        root_name: Option<String>,
    },
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum StringEntry {
    Definition(String),
    Full {
        definition: String,
        validate_with: Option<String>,
    },
}

impl PathEntry {
    pub fn definition(&self) -> &str {
        match self {
            PathEntry::Definition(definition) | PathEntry::Full { definition, .. } => definition,
        }
    }

    pub fn root_name(&self) -> &str {
        match self {
            PathEntry::Full {
                root_name: Some(root),
                ..
            } => root,
            _ => DEFAULT_ROOT_NAME,
        }
    }
}

impl StringEntry {
    pub fn definition(&self) -> &str {
        match self {
            StringEntry::Definition(definition) | StringEntry::Full { definition, .. } => definition,
        }
    }

    pub fn validate_with(&self) -> Option<&str> {
        match self {
            StringEntry::Full { validate_with, .. } => validate_with.as_deref(),
            StringEntry::Definition(_) => None,
        }
    }
}

impl Schema {
    /// Load a schema from a TOML file
    pub fn from_file(path: &Path) -> Result<Self, TemplateError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_str(&content)
    }

    /// Load a schema from a TOML string
    pub fn from_str(content: &str) -> Result<Self, TemplateError> {
        Ok(toml::from_str(content)?)
    }
}

/// Keys and templates built from a [`Schema`]
#[derive(Debug, Clone)]
pub struct TemplateSet {
    platform: Platform,
    keys: BTreeMap<String, Arc<TemplateKey>>,
    templates: BTreeMap<String, Template>,
}

impl TemplateSet {
    /// Build for the current platform
    pub fn from_schema(schema: &Schema) -> Result<Self, TemplateError> {
        Self::from_schema_for(schema, Platform::current())
    }

    /// Build with path templates rooted for `platform`
    pub fn from_schema_for(schema: &Schema, platform: Platform) -> Result<Self, TemplateError> {
        let keys = schema
            .keys
            .iter()
            .map(|(name, options)| {
                KeyBuilder::from_options(name.as_str(), options.clone())
                    .build()
                    .map(|key| (name.clone(), Arc::new(key)))
            })
            .collect::<Result<BTreeMap<_, _>, _>>()?;

        let roots = parse_roots(&schema.roots)?;
        let mut templates = BTreeMap::new();

        for (name, entry) in &schema.paths {
            let root_name = entry.root_name();
            let platform_roots = roots.get(root_name).ok_or_else(|| {
                TemplateError::configuration(format!(
                    "path template '{}' uses undefined root '{}'",
                    name, root_name
                ))
            })?;
            let root_path = platform_roots.get(&platform).ok_or_else(|| {
                TemplateError::configuration(format!(
                    "root '{}' has no path for platform '{}'",
                    root_name, platform
                ))
            })?;
            let template = Template::path_for(
                platform,
                entry.definition(),
                keys.values().cloned(),
                root_path,
            )
            .map_err(|e| in_template(name, e))?
            .with_name(name.as_str())
            .with_platform_roots(platform_roots.clone());
            templates.insert(name.clone(), template);
        }

        for (name, entry) in &schema.strings {
            if templates.contains_key(name) {
                return Err(TemplateError::configuration(format!(
                    "template name '{}' is used by both a path and a string",
                    name
                )));
            }
            let mut template = Template::string(entry.definition(), keys.values().cloned())
                .map_err(|e| in_template(name, e))?
                .with_name(name.as_str());
            if let Some(target) = entry.validate_with() {
                match templates.get(target) {
                    Some(t) if t.is_path() => {}
                    _ => {
                        return Err(TemplateError::configuration(format!(
                            "string template '{}' validates with unknown path template '{}'",
                            name, target
                        )))
                    }
                }
                template = template.with_validate_with(target);
            }
            templates.insert(name.clone(), template);
        }

        debug!(
            keys = keys.len(),
            templates = templates.len(),
            %platform,
            "template set built"
        );
        Ok(Self {
            platform,
            keys,
            templates,
        })
    }

    pub fn platform(&self) -> Platform {
        self.platform
    }

    pub fn get(&self, name: &str) -> Option<&Template> {
        self.templates.get(name)
    }

    pub fn key(&self, name: &str) -> Option<&Arc<TemplateKey>> {
        self.keys.get(name)
    }

    /// Template names in sorted order
    pub fn names(&self) -> Vec<&str> {
        self.templates.keys().map(String::as_str).collect()
    }

    pub fn templates(&self) -> impl Iterator<Item = &Template> {
        self.templates.values()
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}

fn parse_roots(
    roots: &BTreeMap<String, BTreeMap<String, String>>,
) -> Result<HashMap<String, HashMap<Platform, String>>, TemplateError> {
    roots
        .iter()
        .map(|(root_name, paths)| {
            let paths = paths
                .iter()
                .map(|(platform, path)| {
                    platform
                        .parse::<Platform>()
                        .map(|p| (p, path.clone()))
                        .map_err(|e| {
                            TemplateError::configuration(format!("root '{}': {}", root_name, e))
                        })
                })
                .collect::<Result<HashMap<_, _>, _>>()?;
            Ok((root_name.clone(), paths))
        })
        .collect()
}

/// Prefix configuration messages with the template they came from
fn in_template(name: &str, error: TemplateError) -> TemplateError {
    match error {
        TemplateError::Configuration { message } => {
            TemplateError::configuration(format!("template '{}': {}", name, message))
        }
        other => other,
    }
}
