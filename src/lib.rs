//! Path Templates - bidirectional conversion between field values and paths
//!
//! A template definition such as `shots/{Shot}/[{name}_]v{version}.{ext}` is
//! made of literal text, `{key}` placeholders and non-nesting `[...]` optional
//! sections. Each placeholder names a typed [`TemplateKey`] that validates,
//! renders and parses its values.
//!
//! The same template renders fields into a path ([`Template::apply_fields`])
//! and recovers fields from a path ([`Template::get_fields`]), rejecting inputs
//! that could be split in more than one way.
//!
//! # Example
//!
//! ```rust
//! use path_templates::{Fields, FieldValue, Schema, TemplateSet};
//!
//! let schema = Schema::from_str(r#"
//! [roots.primary]
//! linux = "/proj"
//! mac = "/proj"
//! windows = "P:\\proj"
//!
//! [keys.Shot]
//! type = "str"
//!
//! [keys.name]
//! type = "str"
//! filter_by = "alphanumeric"
//!
//! [strings]
//! shot_label = "{Shot}[_{name}]"
//! "#).unwrap();
//! let set = TemplateSet::from_schema(&schema).unwrap();
//! let template = set.get("shot_label").unwrap();
//!
//! let mut fields = Fields::new();
//! fields.insert("Shot".to_string(), FieldValue::from("ABC"));
//! assert_eq!(template.apply_fields(&fields).unwrap(), "ABC");
//!
//! fields.insert("name".to_string(), FieldValue::from("key"));
//! assert_eq!(template.apply_fields(&fields).unwrap(), "ABC_key");
//! assert_eq!(template.get_fields("ABC_key", &[]).unwrap(), fields);
//! ```

pub mod error;
pub mod keys;
pub mod parser;
pub mod schema;
pub mod template;

pub use error::{DefinitionError, ErrorKind, TemplateError};
pub use keys::{
    FieldValue, Fields, KeyBuilder, KeyDefault, KeyKind, KeyOptions, KeyType, TemplateKey,
};
pub use schema::{Schema, TemplateSet};
pub use template::{ApplyOptions, Binding, Platform, Template};
