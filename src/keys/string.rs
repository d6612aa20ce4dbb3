//! String key rules: character filters and output-only subset extraction

use regex::Regex;

use crate::error::TemplateError;

/// How `filter_by` restricts the characters of a value
#[derive(Debug, Clone)]
enum Filter {
    /// Value is rejected if the regex finds any disallowed character
    Exclude(Regex),
    /// Value must match the regex from its first character
    Include(Regex),
}

#[derive(Debug, Clone)]
struct Subset {
    regex: Regex,
    format: Option<String>,
}

#[derive(Debug, Clone)]
pub struct StringRules {
    filter_by: Option<String>,
    filter: Option<Filter>,
    subset_pattern: Option<String>,
    subset: Option<Subset>,
}

impl PartialEq for StringRules {
    fn eq(&self, other: &Self) -> bool {
        self.filter_by == other.filter_by
            && self.subset_pattern == other.subset_pattern
            && self.subset_format() == other.subset_format()
    }
}

impl StringRules {
    pub(crate) fn new(
        key: &str,
        filter_by: Option<&str>,
        subset: Option<&str>,
        subset_format: Option<&str>,
    ) -> Result<Self, TemplateError> {
        // \W is unicode aware, underscores and digits are added explicitly
        let filter = match filter_by {
            None => None,
            Some("alphanumeric") => Some(Filter::Exclude(compile(key, "filter_by", r"[\W_]")?)),
            Some("alpha") => Some(Filter::Exclude(compile(key, "filter_by", r"[\W_0-9]")?)),
            Some(pattern) => Some(Filter::Include(compile(
                key,
                "filter_by",
                &format!("^(?:{})", pattern),
            )?)),
        };

        let subset = match (subset, subset_format) {
            (None, Some(_)) => {
                return Err(TemplateError::configuration(format!(
                    "key '{}' cannot specify subset_format without subset",
                    key
                )))
            }
            (None, None) => None,
            (Some(pattern), format) => {
                let regex = compile(key, "subset", &format!("^(?:{})", pattern))?;
                if let Some(format) = format {
                    let groups = vec![String::new(); regex.captures_len() - 1];
                    format_positional(format, &groups).map_err(|e| {
                        TemplateError::configuration(format!(
                            "invalid subset_format '{}' for key '{}': {}",
                            format, key, e
                        ))
                    })?;
                }
                Some(Subset {
                    regex,
                    format: format.map(str::to_string),
                })
            }
        };

        Ok(Self {
            filter_by: filter_by.map(str::to_string),
            filter,
            subset_pattern: subset.as_ref().map(|s| s.regex.as_str().to_string()),
            subset,
        })
    }

    pub fn filter_by(&self) -> Option<&str> {
        self.filter_by.as_deref()
    }

    /// Subset regex as compiled (anchored at the start of the value)
    pub fn subset(&self) -> Option<&str> {
        self.subset_pattern.as_deref()
    }

    pub fn subset_format(&self) -> Option<&str> {
        self.subset.as_ref().and_then(|s| s.format.as_deref())
    }

    pub(crate) fn validate(&self, value: &str) -> Result<(), String> {
        let filtered = match &self.filter {
            Some(Filter::Exclude(regex)) => !regex.is_match(value),
            Some(Filter::Include(regex)) => regex.is_match(value),
            None => true,
        };
        if !filtered {
            return Err(format!(
                "does not fit filter_by '{}'",
                self.filter_by.as_deref().unwrap_or_default()
            ));
        }
        if let Some(subset) = &self.subset {
            if !subset.regex.is_match(value) {
                return Err(format!(
                    "does not fit subset expression '{}'",
                    subset.regex.as_str()
                ));
            }
        }
        Ok(())
    }

    /// Output form of a value: the subset extraction when configured, else the value itself
    pub(crate) fn as_string(&self, value: &str) -> Result<String, String> {
        let Some(subset) = &self.subset else {
            return Ok(value.to_string());
        };
        let captures = subset.regex.captures(value).ok_or_else(|| {
            format!("does not fit subset expression '{}'", subset.regex.as_str())
        })?;
        let groups: Vec<String> = captures
            .iter()
            .skip(1)
            .map(|m| m.map(|m| m.as_str().to_string()).unwrap_or_default())
            .collect();
        match &subset.format {
            Some(format) => format_positional(format, &groups),
            None => Ok(groups.concat()),
        }
    }
}

fn compile(key: &str, option: &str, pattern: &str) -> Result<Regex, TemplateError> {
    Regex::new(pattern).map_err(|e| {
        TemplateError::configuration(format!("invalid {} regex for key '{}': {}", option, key, e))
    })
}

/// Fill `{}` and `{N}` placeholders from capture groups; `{{` and `}}` are literal braces
fn format_positional(format: &str, groups: &[String]) -> Result<String, String> {
    let mut out = String::new();
    let mut next_auto = 0;
    let mut chars = format.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '{' if chars.peek() == Some(&'{') => {
                chars.next();
                out.push('{');
            }
            '}' if chars.peek() == Some(&'}') => {
                chars.next();
                out.push('}');
            }
            '{' => {
                let mut index = String::new();
                loop {
                    match chars.next() {
                        Some('}') => break,
                        Some(d) if d.is_ascii_digit() => index.push(d),
                        Some(other) => return Err(format!("unexpected '{}' in placeholder", other)),
                        None => return Err("unterminated placeholder".to_string()),
                    }
                }
                let index = if index.is_empty() {
                    next_auto += 1;
                    next_auto - 1
                } else {
                    index.parse::<usize>().map_err(|e| e.to_string())?
                };
                let group = groups
                    .get(index)
                    .ok_or_else(|| format!("no capture group {}", index))?;
                out.push_str(group);
            }
            '}' => return Err("single '}' encountered".to_string()),
            other => out.push(other),
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rules(filter_by: Option<&str>) -> StringRules {
        StringRules::new("name", filter_by, None, None).expect("valid rules")
    }

    #[test]
    fn test_alphanumeric_filter() {
        let r = rules(Some("alphanumeric"));
        assert!(r.validate("abc123").is_ok());
        assert!(r.validate("äbc").is_ok());
        assert!(r.validate("a_b").is_err());
        assert!(r.validate("a-b").is_err());
        assert!(r.validate("a b").is_err());
    }

    #[test]
    fn test_alpha_filter() {
        let r = rules(Some("alpha"));
        assert!(r.validate("abcÉ").is_ok());
        assert!(r.validate("abc1").is_err());
    }

    #[test]
    fn test_custom_regex_filter() {
        let r = rules(Some(r"[a-z]+_\d+"));
        assert!(r.validate("abc_12").is_ok());
        assert!(r.validate("ABC_12").is_err());
        assert!(r.validate("_12").is_err());
    }

    #[test]
    fn test_subset_extraction() {
        let r = StringRules::new("initials", None, Some(r"(\S)\S* (\S)\S*"), Some("{0}{1}"))
            .expect("valid rules");
        assert_eq!(r.as_string("John Smith"), Ok("JS".to_string()));
        assert!(r.validate("John").is_err());
    }

    #[test]
    fn test_subset_without_format_joins_groups() {
        let r = StringRules::new("code", None, Some(r"(\w{3})\w*"), None).expect("valid rules");
        assert_eq!(r.as_string("abcdef"), Ok("abc".to_string()));
    }

    #[test]
    fn test_subset_format_requires_subset() {
        assert!(StringRules::new("code", None, None, Some("{0}")).is_err());
    }

    #[test]
    fn test_subset_format_checked_against_groups() {
        assert!(StringRules::new("code", None, Some(r"(\w)"), Some("{1}")).is_err());
        assert!(StringRules::new("code", None, Some(r"(\w)"), Some("{0}-{}")).is_ok());
    }

    #[test]
    fn test_invalid_regex() {
        assert!(StringRules::new("code", Some("(unclosed"), None, None).is_err());
    }

    #[test]
    fn test_format_positional_escapes() {
        let groups = vec!["a".to_string(), "b".to_string()];
        assert_eq!(format_positional("{{{1}}}", &groups), Ok("{b}".to_string()));
        assert_eq!(format_positional("{}{}", &groups), Ok("ab".to_string()));
        assert!(format_positional("{", &groups).is_err());
    }
}
