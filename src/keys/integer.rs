//! Integer key rules: padding, strict and loose string recognition

use crate::error::TemplateError;

use super::value::FieldValue;

/// Padding derived from a `format_spec` such as `"03"` or `"3"`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Padding {
    pub fill: char,
    pub width: usize,
}

impl Padding {
    /// Parse `"N"`, `"0N"` or `" N"`
    pub fn parse(format_spec: &str) -> Option<Self> {
        let (fill, digits) = match format_spec.chars().next() {
            Some(c @ ('0' | ' ')) if format_spec.len() > 1 => (c, &format_spec[1..]),
            _ => (' ', format_spec),
        };
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        let width = digits.parse().ok()?;
        Some(Self { fill, width })
    }

    pub fn is_zero_padded(&self) -> bool {
        self.fill == '0'
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct IntegerRules {
    format_spec: Option<String>,
    padding: Option<Padding>,
    strict_matching: bool,
}

impl IntegerRules {
    pub(crate) fn new(
        key: &str,
        format_spec: Option<&str>,
        strict_matching: Option<bool>,
    ) -> Result<Self, TemplateError> {
        let padding = match format_spec {
            None => None,
            Some("") => {
                return Err(TemplateError::configuration(format!(
                    "format_spec for key '{}' can't be empty",
                    key
                )))
            }
            Some(spec) => Some(Padding::parse(spec).ok_or_else(|| {
                TemplateError::configuration(format!(
                    "format_spec '{}' for key '{}' has to either be a number (3) or a number \
                     prefixed with a zero or a space (03)",
                    spec, key
                ))
            })?),
        };

        let strict_matching = match (strict_matching, padding) {
            (Some(true), None) => {
                return Err(TemplateError::configuration(format!(
                    "strict_matching can't be set on key '{}' without a format_spec",
                    key
                )))
            }
            (Some(strict), _) => strict,
            (None, padding) => padding.is_some(),
        };

        Ok(Self {
            format_spec: format_spec.map(str::to_string),
            padding,
            strict_matching,
        })
    }

    pub fn format_spec(&self) -> Option<&str> {
        self.format_spec.as_deref()
    }

    pub fn padding(&self) -> Option<Padding> {
        self.padding
    }

    pub fn strict_matching(&self) -> bool {
        self.strict_matching
    }

    /// Check that a string is recognized as an integer by this key
    pub(crate) fn check_str(&self, value: &str) -> Result<(), String> {
        let recognized = match (self.strict_matching, self.padding) {
            (true, Some(padding)) => strict_match(value, padding),
            _ => loose_match(value, self.padding),
        };
        if !recognized {
            let rule = match (self.strict_matching, &self.format_spec) {
                (true, Some(spec)) => format!("expected an integer strictly matching format '{}'", spec),
                _ => "expected an integer".to_string(),
            };
            return Err(rule);
        }
        Ok(())
    }

    /// Convert an already recognized string to an integer
    pub(crate) fn parse_str(&self, value: &str) -> Result<i64, String> {
        let fill = self.padding.map(|p| p.fill).unwrap_or(' ');
        let digits = value.trim_start_matches(fill);
        if digits.is_empty() {
            return Ok(0);
        }
        digits
            .parse::<i64>()
            .map_err(|e| format!("cannot convert '{}' to an integer: {}", value, e))
    }

    pub(crate) fn format_int(&self, n: i64) -> String {
        match self.padding {
            Some(Padding { fill: '0', width }) => format!("{:0width$}", n, width = width),
            Some(Padding { width, .. }) => format!("{:>width$}", n, width = width),
            None => n.to_string(),
        }
    }

    pub(crate) fn validate(&self, value: &FieldValue) -> Result<(), String> {
        match value {
            FieldValue::Int(_) => Ok(()),
            FieldValue::Str(s) => self.check_str(s),
            FieldValue::Timestamp(_) => Err("expected an integer, got a timestamp".to_string()),
        }
    }

    pub(crate) fn as_string(&self, value: &FieldValue) -> Result<String, String> {
        match value {
            FieldValue::Int(n) => Ok(self.format_int(*n)),
            FieldValue::Str(s) => self.parse_str(s).map(|n| self.format_int(n)),
            FieldValue::Timestamp(_) => Err("expected an integer, got a timestamp".to_string()),
        }
    }
}

/// Exact width with the configured padding, or wider without any padding
fn strict_match(value: &str, padding: Padding) -> bool {
    if !value.bytes().all(|b| b.is_ascii_digit() || b == b' ') {
        return false;
    }
    let len = value.len();
    if len == padding.width {
        let digits = value.trim_start_matches(padding.fill);
        if digits.is_empty() {
            return padding.is_zero_padded();
        }
        is_clean_number(digits)
    } else if len > padding.width {
        is_clean_number(value)
    } else {
        false
    }
}

/// Any run of digits once leading padding is removed
fn loose_match(value: &str, padding: Option<Padding>) -> bool {
    if value.is_empty() {
        return false;
    }
    let digits = match padding {
        Some(p) => value.trim_start_matches(p.fill),
        None => value,
    };
    if digits.is_empty() {
        return padding.map(|p| p.is_zero_padded()).unwrap_or(false);
    }
    digits.bytes().all(|b| b.is_ascii_digit())
}

/// `"0"` or digits without a leading zero
fn is_clean_number(digits: &str) -> bool {
    if digits == "0" {
        return true;
    }
    let mut bytes = digits.bytes();
    matches!(bytes.next(), Some(b'1'..=b'9')) && bytes.all(|b| b.is_ascii_digit())
}
