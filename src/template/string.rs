//! Binding for templates that describe plain strings rather than paths

/// Synthetic prefix put in front of string inputs so they parse like rooted paths
pub(crate) const STRING_PREFIX: &str = "@";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct StringBinding {
    validate_with: Option<String>,
}

impl StringBinding {
    pub fn new(validate_with: Option<String>) -> Self {
        Self { validate_with }
    }

    /// Name of the path template consumers check this string against
    pub fn validate_with(&self) -> Option<&str> {
        self.validate_with.as_deref()
    }

    pub(crate) fn set_validate_with(&mut self, name: String) {
        self.validate_with = Some(name);
    }

    /// Static text of the first token, as the parser sees it
    pub(crate) fn leading_token(first_piece: &str) -> String {
        format!("{}{}", STRING_PREFIX, first_piece)
    }

    pub(crate) fn prefixed_input(input: &str) -> String {
        format!("{}{}", STRING_PREFIX, input)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prefix_applied_to_both_sides() {
        assert_eq!(StringBinding::leading_token("v"), "@v");
        assert_eq!(StringBinding::prefixed_input("v003"), "@v003");
    }
}
