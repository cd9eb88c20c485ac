//! Validation of resolved secrets.
//!
//! Only what the OS cannot represent is rejected: a variable name must be
//! non-empty and free of `=` and NUL, a value must be free of NUL. Anything
//! else (lowercase, dots, ...) is passed through as the provider returned it.

use crate::core::types::{ProviderLocator, SecretMap};
use crate::error::{ProviderError, Result};

/// Validate an environment variable name.
///
/// Returns the reason the name is unusable, if any.
pub fn check_key(key: &str) -> Option<&'static str> {
    if key.is_empty() {
        Some("empty name")
    } else if key.contains('=') {
        Some("name contains '='")
    } else if key.contains('\0') {
        Some("name contains a NUL byte")
    } else {
        None
    }
}

/// Validate an environment variable value.
pub fn check_value(value: &str) -> Option<&'static str> {
    value.contains('\0').then_some("value contains a NUL byte")
}

/// Validate every entry returned for `locator`.
///
/// # Errors
///
/// Returns `ProviderError::InvalidKey` naming the first offending key.
pub fn validate_secrets(locator: &ProviderLocator, secrets: &SecretMap) -> Result<()> {
    for (key, value) in secrets {
        if let Some(reason) = check_key(key).or_else(|| check_value(value)) {
            return Err(ProviderError::InvalidKey {
                provider: locator.kind(),
                locator: locator.identifier().to_string(),
                key: key.clone(),
                reason: reason.to_string(),
            }
            .into());
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_keys() {
        assert_eq!(check_key("DATABASE_URL"), None);
        assert_eq!(check_key("_PRIVATE"), None);
        assert_eq!(check_key("lower.case"), None);
        assert_eq!(check_key("1ST"), None);
    }

    #[test]
    fn test_invalid_keys() {
        assert!(check_key("").is_some());
        assert!(check_key("A=B").is_some());
        assert!(check_key("A\0B").is_some());
    }

    #[test]
    fn test_values() {
        assert_eq!(check_value(""), None);
        assert_eq!(check_value("a=b c"), None);
        assert!(check_value("nul\0byte").is_some());
    }

    #[test]
    fn test_validate_secrets_names_offending_key() {
        let locator = ProviderLocator::aws("arn");
        let secrets = SecretMap::from([
            ("GOOD".to_string(), "1".to_string()),
            ("".to_string(), "2".to_string()),
        ]);
        let err = validate_secrets(&locator, &secrets).unwrap_err();
        assert!(err.to_string().contains("empty name"), "{err}");
    }
}
