//! Sequence key rules: integers plus frame-spec tokens

use regex::Regex;
use std::sync::OnceLock;

use crate::error::TemplateError;

use super::integer::{IntegerRules, Padding};
use super::value::FieldValue;

/// Prefix of a value that asks for a frame spec by its generic form
pub const FORMAT_INDICATOR: &str = "FORMAT:";

/// Generic frame-spec forms accepted after [`FORMAT_INDICATOR`]
pub const FORMAT_STRINGS: [&str; 6] = ["%d", "#", "@", "$F", "<UDIM>", "$UDIM"];

fn range_literal() -> &'static Regex {
    static RANGE: OnceLock<Regex> = OnceLock::new();
    RANGE.get_or_init(|| Regex::new(r"^\[[0-9]+-[0-9]+\]$").expect("range literal regex is valid"))
}

#[derive(Debug, Clone, PartialEq)]
pub struct SequenceRules {
    integer: IntegerRules,
    frame_specs: Vec<String>,
}

impl SequenceRules {
    pub(crate) fn new(key: &str, format_spec: Option<&str>) -> Result<Self, TemplateError> {
        let integer = IntegerRules::new(key, Some(format_spec.unwrap_or("01")), None)?;
        let frame_specs = FORMAT_STRINGS
            .iter()
            .map(|f| resolve_frame_spec(f, integer.padding()))
            .collect();
        Ok(Self {
            integer,
            frame_specs,
        })
    }

    /// Integer rules shared with plain integer keys
    pub fn integer(&self) -> &IntegerRules {
        &self.integer
    }

    /// Frame specs this key recognizes verbatim, resolved for its padding
    pub fn frame_specs(&self) -> &[String] {
        &self.frame_specs
    }

    /// Default value of a sequence key: the `%d` form for its padding
    pub(crate) fn default_frame_spec(&self) -> String {
        resolve_frame_spec("%d", self.integer.padding())
    }

    /// Classify a string value; returns true for tokens that bypass integer rules
    pub(crate) fn is_frame_token(&self, value: &str) -> Result<bool, String> {
        if let Some(pattern) = format_directive(value) {
            if FORMAT_STRINGS.contains(&pattern) {
                return Ok(true);
            }
            return Err(self.illegal_value_message());
        }
        Ok(self.frame_specs.iter().any(|s| s == value) || range_literal().is_match(value))
    }

    pub(crate) fn validate(&self, value: &FieldValue) -> Result<bool, String> {
        match value {
            FieldValue::Str(s) => {
                if self.is_frame_token(s)? {
                    return Ok(true);
                }
                self.integer
                    .check_str(s)
                    .map(|_| false)
                    .map_err(|_| self.illegal_value_message())
            }
            FieldValue::Int(_) => Ok(false),
            FieldValue::Timestamp(_) => Err(self.illegal_value_message()),
        }
    }

    pub(crate) fn as_string(&self, value: &FieldValue) -> Result<String, String> {
        if let FieldValue::Str(s) = value {
            if let Some(pattern) = format_directive(s) {
                return Ok(resolve_frame_spec(pattern, self.integer.padding()));
            }
            if self.is_frame_token(s)? {
                return Ok(s.clone());
            }
        }
        self.integer.as_string(value)
    }

    pub(crate) fn as_value(&self, value: &str) -> Result<FieldValue, String> {
        if self.is_frame_token(value)? {
            return Ok(FieldValue::Str(value.to_string()));
        }
        self.integer.parse_str(value).map(FieldValue::Int)
    }

    fn illegal_value_message(&self) -> String {
        let full_format_strings: Vec<String> = FORMAT_STRINGS
            .iter()
            .map(|f| format!("{} {}", FORMAT_INDICATOR, f))
            .collect();
        format!(
            "expected an integer, a frame spec or a format spec; valid frame specs: [{}]; \
             valid format strings: [{}]",
            self.frame_specs.join(", "),
            full_format_strings.join(", ")
        )
    }
}

/// `"FORMAT: %d"` -> `Some("%d")`
fn format_directive(value: &str) -> Option<&str> {
    value
        .strip_prefix(FORMAT_INDICATOR)
        .map(|rest| rest.trim())
}

/// Expand a generic frame-spec form for the given padding
pub fn resolve_frame_spec(format_string: &str, padding: Option<Padding>) -> String {
    let (width, zero) = padding
        .map(|p| (p.width, p.is_zero_padded()))
        .unwrap_or((1, true));
    match format_string {
        "%d" if width <= 1 => "%d".to_string(),
        "%d" if zero => format!("%0{}d", width),
        "%d" => format!("%{}d", width),
        "#" => "#".repeat(width.max(1)),
        "@" => "@".repeat(width.max(1)),
        "$F" if width <= 1 => "$F".to_string(),
        "$F" => format!("$F{}", width),
        other => other.to_string(),
    }
}
