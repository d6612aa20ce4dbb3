//! Error types for template construction, validation and resolution

use ariadne::{Color, Label, Report, ReportKind, Source};
use thiserror::Error;

use crate::parser::lexer::Token;

/// Byte range in source text
pub type Span = std::ops::Range<usize>;

/// Coarse classification of a [`TemplateError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed definition, key options or schema
    Configuration,
    /// A value rejected by its key
    Validation,
    /// No variation could be rendered or parsed, or the parse was ambiguous
    Resolution,
}

/// A single syntax problem found while parsing a definition string
#[derive(Debug, Clone, PartialEq)]
pub struct DefinitionError {
    pub span: Span,
    pub message: String,
    pub expected: Vec<String>,
}

#[derive(Debug, Error)]
pub enum TemplateError {
    /// Definition string could not be parsed into keys and optional sections
    #[error("invalid definition '{definition}' at {span:?}: {message}")]
    Syntax {
        definition: String,
        span: Span,
        message: String,
        expected: Vec<String>,
    },

    /// Inconsistent key options, unknown keys, bad defaults or choices
    #[error("configuration error: {message}")]
    Configuration { message: String },

    /// A value failed the rules of its key
    #[error("invalid value '{value}' for key '{key}'{}: {reason}", in_template(.template))]
    Validation {
        key: String,
        template: Option<String>,
        value: String,
        reason: String,
    },

    /// No variation can be rendered from the supplied fields
    #[error("cannot resolve {template}: missing required fields [{}]", .missing.join(", "))]
    MissingFields {
        template: String,
        missing: Vec<String>,
    },

    /// No variation parses the input
    #[error("'{input}' does not match {template}: {reason}")]
    NoMatch {
        template: String,
        input: String,
        reason: String,
    },

    /// More than one split of the input satisfies the template
    #[error(
        "ambiguous match of '{input}' against {template}: key '{key}' could be any of [{}]",
        .candidates.join(", ")
    )]
    Ambiguous {
        template: String,
        input: String,
        key: String,
        candidates: Vec<String>,
    },

    /// A path was requested for a platform without a configured root
    #[error("{template} cannot resolve a path for platform '{platform}': {reason}")]
    UnsupportedPlatform {
        template: String,
        platform: String,
        reason: String,
    },

    #[error("failed to read schema file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse schema TOML: {0}")]
    Toml(#[from] toml::de::Error),
}

fn in_template(template: &Option<String>) -> String {
    match template {
        Some(name) => format!(" in template '{}'", name),
        None => String::new(),
    }
}

impl TemplateError {
    /// Create a configuration error
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Create a validation error for a key that is not yet attached to a template
    pub fn validation(
        key: impl Into<String>,
        value: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::Validation {
            key: key.into(),
            template: None,
            value: value.into(),
            reason: reason.into(),
        }
    }

    /// Create a syntax error for a definition string
    pub fn syntax(definition: impl Into<String>, error: DefinitionError) -> Self {
        Self::Syntax {
            definition: definition.into(),
            span: error.span,
            message: error.message,
            expected: error.expected,
        }
    }

    /// Create a no-match error
    pub fn no_match(
        template: impl Into<String>,
        input: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::NoMatch {
            template: template.into(),
            input: input.into(),
            reason: reason.into(),
        }
    }

    /// Attach a template name to a validation error raised by one of its keys
    pub fn with_template(self, name: &str) -> Self {
        match self {
            Self::Validation {
                key,
                template: None,
                value,
                reason,
            } => Self::Validation {
                key,
                template: Some(name.to_string()),
                value,
                reason,
            },
            other => other,
        }
    }

    /// Classify this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Syntax { .. } | Self::Configuration { .. } | Self::Io(_) | Self::Toml(_) => {
                ErrorKind::Configuration
            }
            Self::Validation { .. } => ErrorKind::Validation,
            Self::MissingFields { .. }
            | Self::NoMatch { .. }
            | Self::Ambiguous { .. }
            | Self::UnsupportedPlatform { .. } => ErrorKind::Resolution,
        }
    }

    /// Get the definition span if available
    pub fn span(&self) -> Option<&Span> {
        match self {
            Self::Syntax { span, .. } => Some(span),
            _ => None,
        }
    }

    /// Format a syntax error with the definition as source context using ariadne
    ///
    /// Returns None for errors that do not point into a definition.
    pub fn report(&self, source_name: &str) -> Option<String> {
        let Self::Syntax {
            definition,
            span,
            message,
            expected,
        } = self
        else {
            return None;
        };

        let expected_str = if expected.is_empty() {
            String::new()
        } else {
            format!("\nExpected: {}", expected.join(", "))
        };

        let mut buf = Vec::new();
        let written = Report::build(ReportKind::Error, source_name, span.start)
            .with_message(message)
            .with_label(
                Label::new((source_name, span.clone()))
                    .with_message(format!("{}{}", message, expected_str))
                    .with_color(Color::Red),
            )
            .finish()
            .write((source_name, Source::from(definition.as_str())), &mut buf);

        match written {
            Ok(()) => Some(String::from_utf8_lossy(&buf).into_owned()),
            Err(_) => Some(self.to_string()),
        }
    }
}

impl<'a> From<chumsky::error::Rich<'a, Token>> for DefinitionError {
    fn from(err: chumsky::error::Rich<'a, Token>) -> Self {
        use chumsky::error::RichReason;

        let message = match err.reason() {
            RichReason::ExpectedFound { found, .. } => match found {
                Some(tok) if **tok == Token::OpenOptional => {
                    "optional sections cannot be nested".to_string()
                }
                Some(tok) if **tok == Token::CloseOptional => {
                    "']' without a matching '['".to_string()
                }
                Some(tok) => format!("Unexpected {}", format_token(tok)),
                None => "unterminated optional section".to_string(),
            },
            RichReason::Custom(msg) => msg.to_string(),
        };

        let expected: Vec<String> = err
            .expected()
            .filter_map(|e| match e {
                chumsky::error::RichPattern::Token(tok) => Some(format_token(tok)),
                chumsky::error::RichPattern::Label(label) => Some(label.to_string()),
                chumsky::error::RichPattern::EndOfInput => Some("end of definition".to_string()),
                chumsky::error::RichPattern::Identifier(s) => Some(format!("identifier '{}'", s)),
                chumsky::error::RichPattern::Any => Some("any token".to_string()),
                chumsky::error::RichPattern::SomethingElse => None,
            })
            .collect();

        DefinitionError {
            span: err.span().into_range(),
            message,
            expected,
        }
    }
}

/// Format a token for human-readable error messages
fn format_token(tok: &Token) -> String {
    match tok {
        Token::Key(name) => format!("key '{{{}}}'", name),
        Token::Literal(text) => format!("text \"{}\"", text),
        Token::OpenOptional => "'['".to_string(),
        Token::CloseOptional => "']'".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_display_with_template() {
        let err = TemplateError::validation("Shot", "a/b", "contains a path separator")
            .with_template("shot_work");
        let text = err.to_string();
        assert!(text.contains("'Shot'"));
        assert!(text.contains("in template 'shot_work'"));
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[test]
    fn test_with_template_keeps_existing_name() {
        let err = TemplateError::validation("Shot", "x", "bad")
            .with_template("first")
            .with_template("second");
        assert!(err.to_string().contains("'first'"));
    }

    #[test]
    fn test_missing_fields_display() {
        let err = TemplateError::MissingFields {
            template: "<TemplatePath shot: {Shot}>".to_string(),
            missing: vec!["Shot".to_string(), "version".to_string()],
        };
        assert!(err.to_string().contains("[Shot, version]"));
        assert_eq!(err.kind(), ErrorKind::Resolution);
    }

    #[test]
    fn test_report_only_for_syntax_errors() {
        let err = TemplateError::configuration("bad");
        assert!(err.report("definition").is_none());

        let err = TemplateError::syntax(
            "a/[b]",
            DefinitionError {
                span: 2..5,
                message: "optional section must contain a key".to_string(),
                expected: vec![],
            },
        );
        let report = err.report("definition").expect("syntax errors have reports");
        assert!(report.contains("optional section must contain a key"));
        assert_eq!(err.span(), Some(&(2..5)));
    }
}
