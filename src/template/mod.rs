//! Templates: bidirectional conversion between fields and paths or strings
//!
//! A [`Template`] owns a definition such as `shots/{Shot}/[{name}_]v{version}.ma`
//! and the keys it references. The definition is parsed once into a token tree
//! and expanded into variations, one per combination of optional sections,
//! ordered most keys first.
//!
//! - [`Template::apply_fields`] renders the first variation whose required keys
//!   are all supplied.
//! - [`Template::get_fields`] parses an input with each variation in turn and
//!   returns the first unambiguous match.
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use path_templates::{Fields, FieldValue, Template, TemplateKey};
//!
//! let keys = vec![
//!     Arc::new(TemplateKey::string("Shot").build().unwrap()),
//!     Arc::new(TemplateKey::integer("version").format_spec("03").build().unwrap()),
//! ];
//! let template = Template::path("shots/{Shot}/v{version}.ma", keys, "/proj").unwrap();
//!
//! let mut fields = Fields::new();
//! fields.insert("Shot".to_string(), FieldValue::from("ABC"));
//! fields.insert("version".to_string(), FieldValue::from(3));
//!
//! let path = template.apply_fields(&fields).unwrap();
//! assert_eq!(template.get_fields(&path, &[]).unwrap(), fields);
//! ```

mod path;
mod resolver;
mod string;
mod variation;

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use tracing::debug;

use crate::error::TemplateError;
use crate::keys::{Fields, TemplateKey};
use crate::parser;

pub use path::{normalize_path, PathRoot, Platform};
pub use string::StringBinding;
pub use variation::Variation;

use path::to_platform_separators;
use resolver::{Mismatch, PathParser};

/// What a template's definition is relative to
#[derive(Debug, Clone, PartialEq)]
pub enum Binding {
    /// Filesystem path below a root
    Path(PathRoot),
    /// Free-standing string
    String(StringBinding),
}

/// Options for [`Template::apply_fields_with`]
#[derive(Debug, Clone)]
pub struct ApplyOptions {
    /// Render a path for another platform's root and separator
    pub platform: Option<Platform>,
    /// Let keys with defaults fall back to them; when false every key must be supplied
    pub skip_defaults: bool,
    /// Keys whose supplied values are written verbatim, such as `*` wildcards
    pub ignore_types: Vec<String>,
}

impl Default for ApplyOptions {
    fn default() -> Self {
        Self {
            platform: None,
            skip_defaults: true,
            ignore_types: Vec::new(),
        }
    }
}

impl ApplyOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_platform(mut self, platform: Platform) -> Self {
        self.platform = Some(platform);
        self
    }

    pub fn with_skip_defaults(mut self, skip_defaults: bool) -> Self {
        self.skip_defaults = skip_defaults;
        self
    }

    pub fn with_ignore_types<S: Into<String>>(mut self, keys: impl IntoIterator<Item = S>) -> Self {
        self.ignore_types = keys.into_iter().map(Into::into).collect();
        self
    }
}

#[derive(Debug, Clone)]
pub struct Template {
    name: String,
    definition: String,
    key_lookup: HashMap<String, Arc<TemplateKey>>,
    variations: Vec<Variation>,
    binding: Binding,
}

impl Template {
    /// Path template below `root_path` on the current platform
    pub fn path(
        definition: &str,
        keys: impl IntoIterator<Item = Arc<TemplateKey>>,
        root_path: &str,
    ) -> Result<Self, TemplateError> {
        Self::path_for(Platform::current(), definition, keys, root_path)
    }

    /// Path template whose `root_path` belongs to `platform`
    pub fn path_for(
        platform: Platform,
        definition: &str,
        keys: impl IntoIterator<Item = Arc<TemplateKey>>,
        root_path: &str,
    ) -> Result<Self, TemplateError> {
        // leading and trailing separators belong to the root, not the definition
        let definition = definition.trim_matches(|c| c == '/' || c == '\\');
        Self::build(
            definition,
            keys,
            Binding::Path(PathRoot::new(platform, root_path)),
        )
    }

    /// String template
    pub fn string(
        definition: &str,
        keys: impl IntoIterator<Item = Arc<TemplateKey>>,
    ) -> Result<Self, TemplateError> {
        Self::build(definition, keys, Binding::String(StringBinding::default()))
    }

    fn build(
        definition: &str,
        keys: impl IntoIterator<Item = Arc<TemplateKey>>,
        binding: Binding,
    ) -> Result<Self, TemplateError> {
        let mut key_lookup: HashMap<String, Arc<TemplateKey>> = HashMap::new();
        for key in keys {
            match key_lookup.get(key.name()) {
                Some(existing) if existing != &key => {
                    return Err(TemplateError::configuration(format!(
                        "two different keys are named '{}'",
                        key.name()
                    )))
                }
                Some(_) => {}
                None => {
                    key_lookup.insert(key.name().to_string(), key);
                }
            }
        }

        let tree = parser::parse(definition).map_err(|errors| {
            match errors.into_iter().next() {
                Some(error) => TemplateError::syntax(definition, error),
                None => TemplateError::configuration(format!("invalid definition '{}'", definition)),
            }
        })?;
        let variations = variation::expand(&tree, &key_lookup)?;
        debug!(
            definition,
            variations = variations.len(),
            optional_sections = tree.optional_count(),
            "template expanded"
        );

        // only keys the definition uses are kept
        let used = tree.key_names();
        key_lookup.retain(|name, _| used.contains(&name.as_str()));

        Ok(Self {
            name: String::new(),
            definition: definition.to_string(),
            key_lookup,
            variations,
            binding,
        })
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Roots used when rendering for other platforms; ignored by string templates
    pub fn with_platform_roots(mut self, roots: HashMap<Platform, String>) -> Self {
        if let Binding::Path(root) = &mut self.binding {
            *root = root.clone().with_platform_roots(roots);
        }
        self
    }

    /// Name of a path template a string template is checked against; ignored by path templates
    pub fn with_validate_with(mut self, name: impl Into<String>) -> Self {
        if let Binding::String(binding) = &mut self.binding {
            binding.set_validate_with(name.into());
        }
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn definition(&self) -> &str {
        &self.definition
    }

    pub fn binding(&self) -> &Binding {
        &self.binding
    }

    pub fn is_path(&self) -> bool {
        matches!(self.binding, Binding::Path(_))
    }

    /// Variations, most keys first
    pub fn variations(&self) -> &[Variation] {
        &self.variations
    }

    /// Keys of the fullest variation
    pub fn keys(&self) -> &HashMap<String, Arc<TemplateKey>> {
        self.longest().keys()
    }

    /// Key occurrences of the fullest variation, in definition order
    pub fn ordered_keys(&self) -> &[Arc<TemplateKey>] {
        self.longest().ordered_keys()
    }

    /// True when the key can be left out, i.e. the shortest variation lacks it
    pub fn is_optional(&self, key_name: &str) -> bool {
        !self.shortest().keys().contains_key(key_name)
    }

    /// Keys still needed to render even the shortest variation
    ///
    /// Keys with a default count as missing unless `skip_defaults` is set.
    pub fn missing_keys(&self, fields: &Fields, skip_defaults: bool) -> Vec<String> {
        self.shortest().missing_keys(fields, skip_defaults)
    }

    pub fn root_path(&self) -> Option<&str> {
        match &self.binding {
            Binding::Path(root) => Some(root.root_path()),
            Binding::String(_) => None,
        }
    }

    pub fn per_platform_roots(&self) -> Option<&HashMap<Platform, String>> {
        match &self.binding {
            Binding::Path(root) => root.per_platform_roots(),
            Binding::String(_) => None,
        }
    }

    pub fn validate_with(&self) -> Option<&str> {
        match &self.binding {
            Binding::String(binding) => binding.validate_with(),
            Binding::Path(_) => None,
        }
    }

    /// Template for the directory one level up, or None at the root
    ///
    /// Only separators outside optional sections are considered.
    pub fn parent(&self) -> Result<Option<Template>, TemplateError> {
        let Binding::Path(root) = &self.binding else {
            return Ok(None);
        };
        let mut depth = 0usize;
        let mut cut = None;
        for (i, c) in self.definition.char_indices() {
            match c {
                '[' => depth += 1,
                ']' => depth = depth.saturating_sub(1),
                '/' | '\\' if depth == 0 => cut = Some(i),
                _ => {}
            }
        }
        let Some(cut) = cut else {
            return Ok(None);
        };

        let keys = self.key_lookup.values().cloned();
        let mut parent = Template::build(&self.definition[..cut], keys, Binding::Path(root.clone()))?;
        if !self.name.is_empty() {
            parent.name = format!("{}_parent", self.name);
        }
        Ok(Some(parent))
    }

    /// Render with default options
    pub fn apply_fields(&self, fields: &Fields) -> Result<String, TemplateError> {
        self.apply_fields_with(fields, &ApplyOptions::default())
    }

    /// Render the fullest variation that `fields` satisfies
    pub fn apply_fields_with(
        &self,
        fields: &Fields,
        options: &ApplyOptions,
    ) -> Result<String, TemplateError> {
        let variation = self
            .variations
            .iter()
            .find(|v| v.missing_keys(fields, options.skip_defaults).is_empty())
            .ok_or_else(|| TemplateError::MissingFields {
                template: self.to_string(),
                missing: self.missing_keys(fields, options.skip_defaults),
            })?;
        debug!(template = %self, variation = variation.definition(), "rendering");

        let values = variation
            .ordered_keys()
            .iter()
            .map(|key| {
                let ignore_type = options.ignore_types.iter().any(|k| k == key.name());
                key.str_from_value(fields.get(key.name()), ignore_type)
            })
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| e.with_template(self.display_name()))?;
        let relative = variation.render(&values);

        match &self.binding {
            Binding::String(_) => Ok(relative),
            Binding::Path(root) => {
                let platform = options.platform.unwrap_or(root.platform());
                let prefix = root.root_for(platform).map_err(|reason| {
                    TemplateError::UnsupportedPlatform {
                        template: self.to_string(),
                        platform: platform.to_string(),
                        reason,
                    }
                })?;
                Ok(PathRoot::join(prefix, &relative, platform))
            }
        }
    }

    /// Recover field values from a path or string
    ///
    /// Keys named in `skip_keys` are matched positionally but neither
    /// validated nor returned.
    pub fn get_fields(&self, input: &str, skip_keys: &[&str]) -> Result<Fields, TemplateError> {
        let (input, separator) = match &self.binding {
            Binding::Path(root) => (normalize_path(input, root.platform()), root.platform().separator()),
            Binding::String(_) => (
                StringBinding::prefixed_input(input),
                Platform::current().separator(),
            ),
        };

        let mut best: Option<Mismatch> = None;
        for variation in &self.variations {
            let tokens = self.parse_tokens(variation);
            let parser = PathParser::new(variation.ordered_keys(), &tokens, separator);
            match parser.parse(&input, skip_keys) {
                Ok(fields) => {
                    debug!(template = %self, variation = variation.definition(), "input matched");
                    return Ok(fields);
                }
                Err(mismatch) => {
                    debug!(variation = variation.definition(), ?mismatch, "variation did not match");
                    if best.as_ref().map_or(true, |b| mismatch.is_more_specific_than(b)) {
                        best = Some(mismatch);
                    }
                }
            }
        }

        let input = match self.binding {
            Binding::String(_) => input[string::STRING_PREFIX.len()..].to_string(),
            Binding::Path(_) => input,
        };
        Err(match best {
            Some(Mismatch::Ambiguous { key, candidates }) => TemplateError::Ambiguous {
                template: self.to_string(),
                input,
                key,
                candidates,
            },
            Some(Mismatch::NoMatch { reason, .. }) => TemplateError::no_match(self.to_string(), input, reason),
            None => TemplateError::no_match(self.to_string(), input, "template has no variations"),
        })
    }

    /// True if `input` parses and agrees with every entry of `fields` it contains
    pub fn validate(&self, input: &str, fields: Option<&Fields>, skip_keys: &[&str]) -> bool {
        self.validate_and_get_fields(input, fields, skip_keys).is_some()
    }

    /// Parse `input`, returning its fields only if they agree with `required_fields`
    pub fn validate_and_get_fields(
        &self,
        input: &str,
        required_fields: Option<&Fields>,
        skip_keys: &[&str],
    ) -> Option<Fields> {
        let fields = match self.get_fields(input, skip_keys) {
            Ok(fields) => fields,
            Err(e) => {
                debug!(error = %e, "validation failed");
                return None;
            }
        };
        if let Some(required) = required_fields {
            for (name, expected) in required {
                if let Some(found) = fields.get(name) {
                    if found.to_string() != expected.to_string() {
                        debug!(key = %name, %found, %expected, "field disagrees");
                        return None;
                    }
                }
            }
        }
        Some(fields)
    }

    fn longest(&self) -> &Variation {
        // expansion always yields at least one variation
        &self.variations[0]
    }

    fn shortest(&self) -> &Variation {
        &self.variations[self.variations.len() - 1]
    }

    fn display_name(&self) -> &str {
        if self.name.is_empty() {
            &self.definition
        } else {
            &self.name
        }
    }

    /// Static tokens as they appear in a normalized input
    fn parse_tokens(&self, variation: &Variation) -> Vec<String> {
        let mut tokens: Vec<String> = variation.pieces().to_vec();
        match &self.binding {
            Binding::Path(root) => {
                let platform = root.platform();
                let separator = platform.separator();
                for token in &mut tokens {
                    *token = to_platform_separators(token, platform);
                }
                // root and definition meet at a separator unless either is empty
                let root_path = root.root_path();
                if variation.definition().is_empty() {
                    tokens[0] = root_path.to_string();
                } else if !root_path.is_empty() {
                    let mut first = root_path.trim_end_matches(separator).to_string();
                    first.push(separator);
                    first.push_str(&tokens[0]);
                    tokens[0] = first;
                }
            }
            Binding::String(_) => {
                tokens[0] = StringBinding::leading_token(&tokens[0]);
            }
        }
        tokens
    }
}

impl PartialEq for Template {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.definition == other.definition
            && self.binding == other.binding
            && self.key_lookup == other.key_lookup
    }
}

impl fmt::Display for Template {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.binding {
            Binding::Path(_) => "TemplatePath",
            Binding::String(_) => "TemplateString",
        };
        if self.name.is_empty() {
            write!(f, "<{} {}>", kind, self.definition)
        } else {
            write!(f, "<{} {}: {}>", kind, self.name, self.definition)
        }
    }
}
