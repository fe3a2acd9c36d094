//! Pattern and length limits on request fields.

use super::error::ValidationErrorKind;
use crate::text::utf16_len;
use regex::Regex;

/// Longest accepted image URI, in bytes (exclusive).
pub const MAX_URI_BYTES: usize = 2048;

/// Longest accepted named range name, in UTF-16 units.
pub const MAX_NAME_UNITS: u32 = 256;

#[derive(Debug, Clone)]
pub(super) struct Rules {
    uri: Regex,
    email: Regex,
    strict_uris: bool,
}

impl Rules {
    pub fn new(strict_uris: bool) -> Self {
        Self {
            uri: Regex::new(r"(?i)^https?://[^\s/?#]+[^\s]*$").unwrap(),
            email: Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").unwrap(),
            strict_uris,
        }
    }

    pub fn check_uri(&self, uri: &str) -> Result<(), ValidationErrorKind> {
        if uri.is_empty() {
            return Err(ValidationErrorKind::MissingField("uri"));
        }
        if uri.len() >= MAX_URI_BYTES {
            return Err(ValidationErrorKind::InvalidField {
                field: "uri",
                reason: format!("{} bytes exceeds the 2 KiB limit", uri.len()),
            });
        }
        if self.strict_uris && !self.uri.is_match(uri) {
            return Err(ValidationErrorKind::InvalidField {
                field: "uri",
                reason: "must be a public http or https URL".to_string(),
            });
        }
        Ok(())
    }

    pub fn check_email(&self, email: &str) -> Result<(), ValidationErrorKind> {
        if email.is_empty() {
            return Err(ValidationErrorKind::MissingField("personProperties.email"));
        }
        if !self.email.is_match(email) {
            return Err(ValidationErrorKind::InvalidField {
                field: "personProperties.email",
                reason: format!("{:?} is not an e-mail address", email),
            });
        }
        Ok(())
    }

    pub fn check_name(&self, name: &str) -> Result<(), ValidationErrorKind> {
        let len = utf16_len(name);
        if len == 0 || len > MAX_NAME_UNITS {
            return Err(ValidationErrorKind::NameLength { len });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uri_rules() {
        let rules = Rules::new(true);
        assert!(rules.check_uri("https://example.com/a.png").is_ok());
        assert!(rules.check_uri("HTTP://example.com").is_ok());
        assert!(rules.check_uri("ftp://example.com/a.png").is_err());
        assert_eq!(rules.check_uri(""), Err(ValidationErrorKind::MissingField("uri")));

        let long = format!("https://example.com/{}", "a".repeat(MAX_URI_BYTES));
        assert!(rules.check_uri(&long).is_err());
        assert!(Rules::new(false).check_uri("ftp://example.com").is_ok());
    }

    #[test]
    fn test_email_rules() {
        let rules = Rules::new(true);
        assert!(rules.check_email("ada@example.com").is_ok());
        assert!(rules.check_email("ada").is_err());
        assert!(rules.check_email("a b@example.com").is_err());
    }

    #[test]
    fn test_name_length() {
        let rules = Rules::new(true);
        assert!(rules.check_name("intro").is_ok());
        assert_eq!(rules.check_name(""), Err(ValidationErrorKind::NameLength { len: 0 }));
        assert!(rules.check_name(&"x".repeat(256)).is_ok());
        assert!(rules.check_name(&"😀".repeat(129)).is_err());
    }
}
