use std::collections::BTreeMap;
use std::sync::OnceLock;

use config_tree_core::{TreePath, ValueGuard};
use regex::Regex;

use crate::error::ReconcileError;

/// Characters that never appear in plain text fields.
const UNSAFE: &[char] = &['\'', '"', '\\', ';', '$', '`', '\0', '\r', '\n'];

/// What a field may contain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldClass {
    /// Anything but the unsafe set.
    Text,
    /// Group and account names.
    Name,
    /// Identifiers, interface names, protocols.
    Token,
    /// Certificates, keys and raw daemon configs.
    Base64,
    /// Passwords: printable, no control characters.
    Secret,
    /// Configuration keys.
    Key,
}

struct Patterns {
    name: Regex,
    token: Regex,
    base64: Regex,
    key: Regex,
}

fn patterns() -> Result<&'static Patterns, String> {
    static PATTERNS: OnceLock<Result<Patterns, regex::Error>> = OnceLock::new();
    let compiled = PATTERNS.get_or_init(|| {
        Ok(Patterns {
            name: Regex::new(r"^[a-zA-Z0-9_.][a-zA-Z0-9_.-]{0,30}[a-zA-Z0-9_.$-]$")?,
            token: Regex::new(r"^[A-Za-z0-9_.:/-]*$")?,
            base64: Regex::new(r"^[A-Za-z0-9+/=\r\n]*$")?,
            key: Regex::new(r"^[A-Za-z0-9_.-]+$")?,
        })
    });
    compiled
        .as_ref()
        .map_err(|err| format!("validation pattern unavailable: {err}"))
}

impl FieldClass {
    /// Check `value`, returning a human-readable reason on failure.
    pub fn check(self, value: &str) -> Result<(), String> {
        let matched = match self {
            FieldClass::Text => {
                return match value.chars().find(|c| UNSAFE.contains(c)) {
                    Some(c) => Err(format!("contains disallowed character {c:?}")),
                    None => Ok(()),
                }
            }
            FieldClass::Secret => {
                return match value.chars().find(|c| c.is_control()) {
                    Some(c) => Err(format!("contains control character {c:?}")),
                    None => Ok(()),
                }
            }
            FieldClass::Name => patterns()?.name.is_match(value),
            FieldClass::Token => patterns()?.token.is_match(value),
            FieldClass::Base64 => patterns()?.base64.is_match(value),
            FieldClass::Key => patterns()?.key.is_match(value),
        };
        if matched {
            Ok(())
        } else {
            Err(format!("does not look like a {}", self.label()))
        }
    }

    fn label(self) -> &'static str {
        match self {
            FieldClass::Text => "plain text value",
            FieldClass::Name => "name",
            FieldClass::Token => "identifier",
            FieldClass::Base64 => "base64 blob",
            FieldClass::Secret => "secret",
            FieldClass::Key => "configuration key",
        }
    }
}

/// Maps field names to classes; unknown fields are [`FieldClass::Text`].
#[derive(Debug, Clone, Default)]
pub struct FieldValidator {
    classes: BTreeMap<String, FieldClass>,
}

impl FieldValidator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, field: &str, class: FieldClass) -> Self {
        self.classes.insert(field.to_string(), class);
        self
    }

    pub fn with_all(mut self, fields: &[&str], class: FieldClass) -> Self {
        for field in fields {
            self.classes.insert((*field).to_string(), class);
        }
        self
    }

    pub fn class_of(&self, field: &str) -> FieldClass {
        self.classes.get(field).copied().unwrap_or(FieldClass::Text)
    }

    /// Validate a single named parameter.
    pub fn check(&self, field: &str, value: &str) -> Result<(), ReconcileError> {
        self.class_of(field)
            .check(value)
            .map_err(|reason| ReconcileError::validation(field, reason))
    }
}

impl ValueGuard for FieldValidator {
    fn check_value(&self, _path: &TreePath, field: &str, value: &str) -> Result<(), String> {
        self.class_of(field).check(value)
    }

    fn check_key(&self, _path: &TreePath, key: &str) -> Result<(), String> {
        FieldClass::Key.check(key)
    }
}

#[cfg(test)]
mod tests {
    use super::{FieldClass, FieldValidator};

    #[test]
    fn text_rejects_shell_and_php_metacharacters() {
        for bad in ["a'b", "a;b", "$x", "a`id`", "a\\b", "line\nbreak", "q\"q"] {
            assert!(FieldClass::Text.check(bad).is_err(), "{bad:?} should fail");
        }
        assert!(FieldClass::Text.check("rack 4, row b").is_ok());
    }

    #[test]
    fn group_names_follow_pfsense_rules() {
        assert!(FieldClass::Name.check("admins").is_ok());
        assert!(FieldClass::Name.check("svc-backup$").is_ok());
        assert!(FieldClass::Name.check("-lead").is_err());
        assert!(FieldClass::Name.check("a").is_err());
        assert!(FieldClass::Name.check(&"x".repeat(33)).is_err());
    }

    #[test]
    fn base64_accepts_pem_bodies() {
        assert!(FieldClass::Base64.check("TUlJQ2R6Q0NB\r\nQWdBd0lCQWdJ=").is_ok());
        assert!(FieldClass::Base64.check("abc;def").is_err());
    }

    #[test]
    fn secrets_allow_quotes_but_not_newlines() {
        assert!(FieldClass::Secret.check("p@ss'w\"rd$").is_ok());
        assert!(FieldClass::Secret.check("pass\nword").is_err());
    }

    #[test]
    fn validator_routes_fields_to_classes() {
        let validator = FieldValidator::new().with("crt", FieldClass::Base64);
        assert!(validator.check("crt", "QUJD").is_ok());
        assert!(validator.check("crt", "not base64!").is_err());
        assert!(validator.check("descr", "web server").is_ok());
    }
}
