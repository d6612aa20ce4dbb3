//! Typed template keys
//!
//! A key is a named placeholder with validation rules and a string form. Keys
//! are built once, through [`KeyBuilder`] or from a schema, and are immutable
//! afterwards. Every check returns its error instead of storing it.
//!
//! Choice and exclusion comparison is case-insensitive: `"MA"` and `"ma"` count
//! as the same value.

mod integer;
mod sequence;
mod string;
mod timestamp;
mod value;

use std::borrow::Cow;
use std::fmt;

use serde::Deserialize;

use crate::error::TemplateError;

pub use integer::{IntegerRules, Padding};
pub use sequence::{resolve_frame_spec, SequenceRules, FORMAT_INDICATOR, FORMAT_STRINGS};
pub use string::StringRules;
pub use timestamp::{TimestampRules, DEFAULT_TIMESTAMP_FORMAT};
pub use value::{DefaultProvider, FieldValue, Fields, KeyDefault};

/// Key type names as used in schemas
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
pub enum KeyType {
    #[default]
    #[serde(rename = "str")]
    Str,
    #[serde(rename = "int")]
    Int,
    #[serde(rename = "sequence")]
    Sequence,
    #[serde(rename = "timestamp")]
    Timestamp,
}

impl fmt::Display for KeyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            KeyType::Str => "str",
            KeyType::Int => "int",
            KeyType::Sequence => "sequence",
            KeyType::Timestamp => "timestamp",
        })
    }
}

/// Allowed values, either a plain list or a value -> label table
///
/// Labelled tables keep the order they were declared in.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum ChoiceOptions {
    List(Vec<FieldValue>),
    Labelled(#[serde(deserialize_with = "deserialize_labels")] Vec<(String, String)>),
}

/// Read a value -> label table as pairs, in document order
fn deserialize_labels<'de, D>(deserializer: D) -> Result<Vec<(String, String)>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::de;

    struct LabelsVisitor;

    impl<'de> de::Visitor<'de> for LabelsVisitor {
        type Value = Vec<(String, String)>;

        fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
            formatter.write_str("a table of choice labels")
        }

        fn visit_map<A: de::MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
            let mut labels = Vec::with_capacity(map.size_hint().unwrap_or(0));
            while let Some((value, label)) = map.next_entry::<String, String>()? {
                labels.push((value, label));
            }
            Ok(labels)
        }
    }

    deserializer.deserialize_map(LabelsVisitor)
}

/// Raw key options, shared by schema documents and [`KeyBuilder`]
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct KeyOptions {
    #[serde(rename = "type", default)]
    pub key_type: KeyType,
    pub default: Option<FieldValue>,
    pub choices: Option<ChoiceOptions>,
    #[serde(default)]
    pub exclusions: Vec<FieldValue>,
    #[serde(rename = "abstract", default)]
    pub is_abstract: bool,
    pub length: Option<usize>,
    pub filter_by: Option<String>,
    pub subset: Option<String>,
    pub subset_format: Option<String>,
    pub format_spec: Option<String>,
    pub strict_matching: Option<bool>,
}

/// Type-specific rules of a key
#[derive(Debug, Clone, PartialEq)]
pub enum KeyKind {
    String(StringRules),
    Integer(IntegerRules),
    Sequence(SequenceRules),
    Timestamp(TimestampRules),
}

/// A typed, named placeholder
#[derive(Debug, Clone, PartialEq)]
pub struct TemplateKey {
    name: String,
    default: Option<KeyDefault>,
    choices: Vec<(FieldValue, String)>,
    exclusions: Vec<FieldValue>,
    is_abstract: bool,
    length: Option<usize>,
    kind: KeyKind,
}

impl TemplateKey {
    /// Start building a string key
    pub fn string(name: impl Into<String>) -> KeyBuilder {
        KeyBuilder::new(name, KeyType::Str)
    }

    /// Start building an integer key
    pub fn integer(name: impl Into<String>) -> KeyBuilder {
        KeyBuilder::new(name, KeyType::Int)
    }

    /// Start building a frame sequence key
    pub fn sequence(name: impl Into<String>) -> KeyBuilder {
        KeyBuilder::new(name, KeyType::Sequence)
    }

    /// Start building a timestamp key
    pub fn timestamp(name: impl Into<String>) -> KeyBuilder {
        KeyBuilder::new(name, KeyType::Timestamp)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn default(&self) -> Option<&KeyDefault> {
        self.default.as_ref()
    }

    pub fn has_default(&self) -> bool {
        self.default.is_some()
    }

    /// Allowed values, in declaration order
    pub fn choices(&self) -> Vec<&FieldValue> {
        self.choices.iter().map(|(value, _)| value).collect()
    }

    /// Allowed values with their display labels
    pub fn labelled_choices(&self) -> &[(FieldValue, String)] {
        &self.choices
    }

    pub fn exclusions(&self) -> &[FieldValue] {
        &self.exclusions
    }

    /// Abstract keys stand for a whole class of values, like every frame of a sequence
    pub fn is_abstract(&self) -> bool {
        self.is_abstract
    }

    pub fn length(&self) -> Option<usize> {
        self.length
    }

    pub fn kind(&self) -> &KeyKind {
        &self.kind
    }

    pub fn key_type(&self) -> KeyType {
        match self.kind {
            KeyKind::String(_) => KeyType::Str,
            KeyKind::Integer(_) => KeyType::Int,
            KeyKind::Sequence(_) => KeyType::Sequence,
            KeyKind::Timestamp(_) => KeyType::Timestamp,
        }
    }

    /// Integer rules for integer and sequence keys
    pub fn integer_rules(&self) -> Option<&IntegerRules> {
        match &self.kind {
            KeyKind::Integer(rules) => Some(rules),
            KeyKind::Sequence(rules) => Some(rules.integer()),
            _ => None,
        }
    }

    /// Check a value against this key
    pub fn validate(&self, value: &FieldValue) -> Result<(), TemplateError> {
        let settled = self
            .validate_kind(value)
            .map_err(|reason| self.invalid(value, reason))?;
        if settled {
            return Ok(());
        }
        self.validate_common(value, &self.comparable(value))
    }

    pub fn is_valid(&self, value: &FieldValue) -> bool {
        self.validate(value).is_ok()
    }

    /// Render a value, falling back to the default when `value` is None
    ///
    /// With `ignore_type` a supplied value is written out as-is, skipping
    /// validation; this is how wildcards stand in for real values.
    pub fn str_from_value(
        &self,
        value: Option<&FieldValue>,
        ignore_type: bool,
    ) -> Result<String, TemplateError> {
        let value = match value {
            Some(value) if ignore_type => return Ok(value.to_string()),
            Some(value) => Cow::Borrowed(value),
            None => match &self.default {
                Some(default) => Cow::Owned(default.resolve()),
                None => {
                    return Err(TemplateError::validation(
                        &self.name,
                        "",
                        "no value provided and no default available",
                    ))
                }
            },
        };
        self.validate(&value)?;
        self.as_string(&value)
            .map_err(|reason| self.invalid(&value, reason))
    }

    /// Validate a string and convert it to this key's value type
    pub fn value_from_str(&self, value: &str) -> Result<FieldValue, TemplateError> {
        let raw = FieldValue::Str(value.to_string());
        self.validate(&raw)?;
        self.as_value(value)
            .map_err(|reason| self.invalid(&raw, reason))
    }

    fn invalid(&self, value: &FieldValue, reason: impl Into<String>) -> TemplateError {
        TemplateError::validation(&self.name, value.to_string(), reason)
    }

    /// Type rules; Ok(true) means the value is accepted without the common checks
    fn validate_kind(&self, value: &FieldValue) -> Result<bool, String> {
        match &self.kind {
            KeyKind::String(rules) => rules.validate(&value.to_string()).map(|_| false),
            KeyKind::Integer(rules) => rules.validate(value).map(|_| false),
            KeyKind::Sequence(rules) => rules.validate(value),
            KeyKind::Timestamp(rules) => rules.validate(value).map(|_| false),
        }
    }

    /// Integer-like keys compare choices and exclusions by number, so `"007"` is 7
    fn comparable<'a>(&self, value: &'a FieldValue) -> Cow<'a, FieldValue> {
        let (rules, s) = match (&self.kind, value) {
            (KeyKind::Integer(rules), FieldValue::Str(s)) => (rules, s),
            (KeyKind::Sequence(rules), FieldValue::Str(s)) => (rules.integer(), s),
            _ => return Cow::Borrowed(value),
        };
        rules
            .parse_str(s)
            .map(|n| Cow::Owned(FieldValue::Int(n)))
            .unwrap_or(Cow::Borrowed(value))
    }

    /// Exclusions, choices and length; `comparable` is the value used for the first two
    fn validate_common(
        &self,
        value: &FieldValue,
        comparable: &FieldValue,
    ) -> Result<(), TemplateError> {
        let folded = comparable.folded();
        if self.exclusions.iter().any(|x| x.folded() == folded) {
            return Err(self.invalid(value, "value is forbidden for this key"));
        }
        if !self.choices.is_empty() && !self.choices.iter().any(|(c, _)| c.folded() == folded) {
            let choices: Vec<String> = self.choices.iter().map(|(c, _)| c.to_string()).collect();
            return Err(self.invalid(value, format!("not in choices [{}]", choices.join(", "))));
        }
        if let Some(length) = self.length {
            if value.to_string().chars().count() != length {
                return Err(self.invalid(
                    value,
                    format!("does not have a length of {} characters", length),
                ));
            }
        }
        Ok(())
    }

    fn as_string(&self, value: &FieldValue) -> Result<String, String> {
        match &self.kind {
            KeyKind::String(rules) => rules.as_string(&value.to_string()),
            KeyKind::Integer(rules) => rules.as_string(value),
            KeyKind::Sequence(rules) => rules.as_string(value),
            KeyKind::Timestamp(rules) => rules.as_string(value),
        }
    }

    fn as_value(&self, value: &str) -> Result<FieldValue, String> {
        match &self.kind {
            // subset extraction is output-only and not reversible
            KeyKind::String(_) => Ok(FieldValue::Str(value.to_string())),
            KeyKind::Integer(rules) => rules.parse_str(value).map(FieldValue::Int),
            KeyKind::Sequence(rules) => rules.as_value(value),
            KeyKind::Timestamp(rules) => rules.as_value(value),
        }
    }
}

impl fmt::Display for TemplateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let type_name = match self.kind {
            KeyKind::String(_) => "StringKey",
            KeyKind::Integer(_) => "IntegerKey",
            KeyKind::Sequence(_) => "SequenceKey",
            KeyKind::Timestamp(_) => "TimestampKey",
        };
        write!(f, "<{} {}>", type_name, self.name)
    }
}

/// Builder collecting key options before validation
#[derive(Debug, Clone)]
pub struct KeyBuilder {
    name: String,
    options: KeyOptions,
    provider: Option<DefaultProvider>,
}

impl KeyBuilder {
    pub fn new(name: impl Into<String>, key_type: KeyType) -> Self {
        Self {
            name: name.into(),
            options: KeyOptions {
                key_type,
                ..KeyOptions::default()
            },
            provider: None,
        }
    }

    /// Start from options read out of a schema
    pub fn from_options(name: impl Into<String>, options: KeyOptions) -> Self {
        Self {
            name: name.into(),
            options,
            provider: None,
        }
    }

    pub fn default_value(mut self, value: impl Into<FieldValue>) -> Self {
        self.options.default = Some(value.into());
        self
    }

    /// Compute the default on every render instead of fixing it at construction
    pub fn default_provider(mut self, f: impl Fn() -> FieldValue + Send + Sync + 'static) -> Self {
        self.provider = Some(DefaultProvider::new(f));
        self
    }

    pub fn choices<V: Into<FieldValue>>(mut self, choices: impl IntoIterator<Item = V>) -> Self {
        self.options.choices = Some(ChoiceOptions::List(
            choices.into_iter().map(Into::into).collect(),
        ));
        self
    }

    pub fn labelled_choices<V: fmt::Display, L: Into<String>>(
        mut self,
        choices: impl IntoIterator<Item = (V, L)>,
    ) -> Self {
        self.options.choices = Some(ChoiceOptions::Labelled(
            choices
                .into_iter()
                .map(|(value, label)| (value.to_string(), label.into()))
                .collect(),
        ));
        self
    }

    pub fn exclusions<V: Into<FieldValue>>(
        mut self,
        exclusions: impl IntoIterator<Item = V>,
    ) -> Self {
        self.options.exclusions = exclusions.into_iter().map(Into::into).collect();
        self
    }

    pub fn is_abstract(mut self, is_abstract: bool) -> Self {
        self.options.is_abstract = is_abstract;
        self
    }

    pub fn length(mut self, length: usize) -> Self {
        self.options.length = Some(length);
        self
    }

    pub fn filter_by(mut self, filter_by: impl Into<String>) -> Self {
        self.options.filter_by = Some(filter_by.into());
        self
    }

    pub fn subset(mut self, subset: impl Into<String>) -> Self {
        self.options.subset = Some(subset.into());
        self
    }

    pub fn subset_format(mut self, subset_format: impl Into<String>) -> Self {
        self.options.subset_format = Some(subset_format.into());
        self
    }

    pub fn format_spec(mut self, format_spec: impl Into<String>) -> Self {
        self.options.format_spec = Some(format_spec.into());
        self
    }

    pub fn strict_matching(mut self, strict_matching: bool) -> Self {
        self.options.strict_matching = Some(strict_matching);
        self
    }

    /// Validate the options and produce the key
    pub fn build(self) -> Result<TemplateKey, TemplateError> {
        let KeyBuilder {
            name,
            options,
            provider,
        } = self;
        reject_unsupported(&name, &options)?;

        let kind = match options.key_type {
            KeyType::Str => KeyKind::String(StringRules::new(
                &name,
                options.filter_by.as_deref(),
                options.subset.as_deref(),
                options.subset_format.as_deref(),
            )?),
            KeyType::Int => KeyKind::Integer(IntegerRules::new(
                &name,
                options.format_spec.as_deref(),
                options.strict_matching,
            )?),
            KeyType::Sequence => {
                KeyKind::Sequence(SequenceRules::new(&name, options.format_spec.as_deref())?)
            }
            KeyType::Timestamp => {
                KeyKind::Timestamp(TimestampRules::new(&name, options.format_spec.as_deref())?)
            }
        };

        let default = match (provider, options.default, &kind) {
            (Some(provider), _, _) => Some(KeyDefault::Dynamic(provider)),
            (None, Some(value), KeyKind::Timestamp(rules)) => Some(rules.default_from(&name, value)?),
            (None, Some(value), _) => Some(KeyDefault::Fixed(value)),
            (None, None, KeyKind::Sequence(rules)) => {
                Some(KeyDefault::Fixed(FieldValue::Str(rules.default_frame_spec())))
            }
            (None, None, _) => None,
        };

        let is_abstract = options.is_abstract || matches!(kind, KeyKind::Sequence(_));
        if is_abstract && default.is_none() {
            return Err(TemplateError::configuration(format!(
                "abstract key '{}' needs a default value",
                name
            )));
        }

        let exclusions = options
            .exclusions
            .into_iter()
            .map(|v| normalize_choice(&kind, v))
            .collect();

        let choices = match options.choices {
            None => Vec::new(),
            Some(ChoiceOptions::List(values)) => values
                .into_iter()
                .map(|v| {
                    let label = v.to_string();
                    (normalize_choice(&kind, v), label)
                })
                .collect(),
            Some(ChoiceOptions::Labelled(table)) => table
                .into_iter()
                .map(|(v, label)| (normalize_choice(&kind, FieldValue::Str(v)), label))
                .collect(),
        };

        let key = TemplateKey {
            name,
            default,
            choices,
            exclusions,
            is_abstract,
            length: options.length,
            kind,
        };

        for (choice, _) in &key.choices {
            key.validate_kind(choice).map_err(|reason| {
                TemplateError::configuration(format!(
                    "invalid choice '{}' for key '{}': {}",
                    choice, key.name, reason
                ))
            })?;
        }

        if let Some(value) = key.default.as_ref().and_then(KeyDefault::fixed) {
            key.validate(value).map_err(|e| {
                TemplateError::configuration(format!(
                    "invalid default for key '{}': {}",
                    key.name, e
                ))
            })?;
        }

        Ok(key)
    }
}

/// Integer-like keys store numeric choices as integers
fn normalize_choice(kind: &KeyKind, value: FieldValue) -> FieldValue {
    match (kind, &value) {
        (KeyKind::Integer(_) | KeyKind::Sequence(_), FieldValue::Str(s)) => {
            s.trim().parse::<i64>().map(FieldValue::Int).unwrap_or(value)
        }
        _ => value,
    }
}

fn reject_unsupported(name: &str, options: &KeyOptions) -> Result<(), TemplateError> {
    let given = [
        ("filter_by", options.filter_by.is_some()),
        ("subset", options.subset.is_some()),
        ("subset_format", options.subset_format.is_some()),
        ("format_spec", options.format_spec.is_some()),
        ("strict_matching", options.strict_matching.is_some()),
    ];
    let supported: &[&str] = match options.key_type {
        KeyType::Str => &["filter_by", "subset", "subset_format"],
        KeyType::Int => &["format_spec", "strict_matching"],
        KeyType::Sequence | KeyType::Timestamp => &["format_spec"],
    };
    for (option, set) in given {
        if set && !supported.contains(&option) {
            return Err(TemplateError::configuration(format!(
                "option '{}' is not supported by {} key '{}'",
                option, options.key_type, name
            )));
        }
    }
    Ok(())
}
