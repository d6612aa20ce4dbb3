//! Timestamp key rules

use std::fmt::Write;

use chrono::format::{Item, StrftimeItems};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

use crate::error::TemplateError;

use super::value::{FieldValue, KeyDefault};

pub const DEFAULT_TIMESTAMP_FORMAT: &str = "%Y-%m-%d-%H-%M-%S";

#[derive(Debug, Clone, PartialEq)]
pub struct TimestampRules {
    format_spec: String,
}

impl TimestampRules {
    pub(crate) fn new(key: &str, format_spec: Option<&str>) -> Result<Self, TemplateError> {
        let format_spec = format_spec.unwrap_or(DEFAULT_TIMESTAMP_FORMAT);
        if StrftimeItems::new(format_spec).any(|item| matches!(item, Item::Error)) {
            return Err(TemplateError::configuration(format!(
                "invalid format_spec '{}' for timestamp key '{}'",
                format_spec, key
            )));
        }
        Ok(Self {
            format_spec: format_spec.to_string(),
        })
    }

    pub fn format_spec(&self) -> &str {
        &self.format_spec
    }

    /// Interpret a configured default: `now`, `utc_now`, or a literal in `format_spec`
    pub(crate) fn default_from(
        &self,
        key: &str,
        value: FieldValue,
    ) -> Result<KeyDefault, TemplateError> {
        match value {
            FieldValue::Str(s) if s == "now" => Ok(KeyDefault::CurrentLocalTime),
            FieldValue::Str(s) if s == "utc_now" => Ok(KeyDefault::CurrentUtcTime),
            FieldValue::Str(s) => self
                .parse(&s)
                .map(|t| KeyDefault::Fixed(FieldValue::Timestamp(t)))
                .ok_or_else(|| {
                    TemplateError::configuration(format!(
                        "invalid default '{}' for timestamp key '{}': does not match '{}'",
                        s, key, self.format_spec
                    ))
                }),
            FieldValue::Timestamp(t) => Ok(KeyDefault::Fixed(FieldValue::Timestamp(t))),
            FieldValue::Int(n) => Err(TemplateError::configuration(format!(
                "default for timestamp key '{}' must be a string, got {}",
                key, n
            ))),
        }
    }

    /// Parse with `format_spec`; missing date parts become 1900-01-01, missing time midnight
    pub(crate) fn parse(&self, value: &str) -> Option<NaiveDateTime> {
        if let Ok(t) = NaiveDateTime::parse_from_str(value, &self.format_spec) {
            return Some(t);
        }
        if let Ok(d) = NaiveDate::parse_from_str(value, &self.format_spec) {
            return d.and_hms_opt(0, 0, 0);
        }
        if let Ok(t) = NaiveTime::parse_from_str(value, &self.format_spec) {
            return NaiveDate::from_ymd_opt(1900, 1, 1).map(|d| d.and_time(t));
        }
        None
    }

    pub(crate) fn validate(&self, value: &FieldValue) -> Result<(), String> {
        match value {
            FieldValue::Timestamp(_) => Ok(()),
            FieldValue::Str(s) => match self.parse(s) {
                Some(_) => Ok(()),
                None => Err(format!("invalid string: does not match '{}'", self.format_spec)),
            },
            FieldValue::Int(_) => {
                Err("invalid type: expecting a string or a timestamp, not an integer".to_string())
            }
        }
    }

    pub(crate) fn as_string(&self, value: &FieldValue) -> Result<String, String> {
        let timestamp = match value {
            FieldValue::Timestamp(t) => *t,
            FieldValue::Str(s) => return Ok(s.clone()),
            FieldValue::Int(_) => return Err("expected a timestamp".to_string()),
        };
        let mut out = String::new();
        write!(out, "{}", timestamp.format(&self.format_spec))
            .map_err(|_| format!("cannot format timestamp with '{}'", self.format_spec))?;
        Ok(out)
    }

    pub(crate) fn as_value(&self, value: &str) -> Result<FieldValue, String> {
        self.parse(value)
            .map(FieldValue::Timestamp)
            .ok_or_else(|| format!("invalid string: does not match '{}'", self.format_spec))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, min, s)
            .unwrap()
    }

    #[test]
    fn test_default_format_round_trip() {
        let r = TimestampRules::new("now", None).expect("valid rules");
        let t = at(2024, 1, 31, 13, 5, 9);
        let text = r.as_string(&FieldValue::Timestamp(t)).unwrap();
        assert_eq!(text, "2024-01-31-13-05-09");
        assert_eq!(r.as_value(&text), Ok(FieldValue::Timestamp(t)));
    }

    #[test]
    fn test_date_only_format() {
        let r = TimestampRules::new("day", Some("%Y_%m_%d")).expect("valid rules");
        assert_eq!(r.parse("2024_02_29"), Some(at(2024, 2, 29, 0, 0, 0)));
        assert!(r.validate(&FieldValue::from("2024-02-29")).is_err());
    }

    #[test]
    fn test_time_only_format() {
        let r = TimestampRules::new("time", Some("%H.%M")).expect("valid rules");
        assert_eq!(r.parse("10.30"), Some(at(1900, 1, 1, 10, 30, 0)));
    }

    #[test]
    fn test_sentinel_defaults() {
        let r = TimestampRules::new("t", None).expect("valid rules");
        assert_eq!(
            r.default_from("t", FieldValue::from("now")).unwrap(),
            KeyDefault::CurrentLocalTime
        );
        assert_eq!(
            r.default_from("t", FieldValue::from("utc_now")).unwrap(),
            KeyDefault::CurrentUtcTime
        );
        assert!(r.default_from("t", FieldValue::from("yesterday")).is_err());
        assert!(r.default_from("t", FieldValue::from(3)).is_err());
    }

    #[test]
    fn test_invalid_format_spec() {
        assert!(TimestampRules::new("t", Some("%Q")).is_err());
    }

    #[test]
    fn test_integer_rejected() {
        let r = TimestampRules::new("t", None).expect("valid rules");
        assert!(r.validate(&FieldValue::from(3)).is_err());
    }
}
