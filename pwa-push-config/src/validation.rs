// Settings validation

use crate::{ConfigError, Result};

/// Trait for validating loaded settings
pub trait Validate {
    fn validate(&self) -> Result<()>;
}

/// Field-level checks shared by settings types
pub struct ConfigValidator;

impl ConfigValidator {
    /// Reject empty or whitespace-only values
    pub fn not_empty(value: &str, field: &str) -> Result<()> {
        if value.trim().is_empty() {
            return Err(ConfigError::ValidationError(format!(
                "{} cannot be empty",
                field
            )));
        }
        Ok(())
    }

    /// Reject values below `min`
    pub fn at_least<T: PartialOrd + std::fmt::Display>(value: T, min: T, field: &str) -> Result<()> {
        if value < min {
            return Err(ConfigError::ValidationError(format!(
                "{} must be at least {}, got {}",
                field, min, value
            )));
        }
        Ok(())
    }

    /// Accept an email address or a `mailto:` / `https:` contact URI
    pub fn is_contact(value: &str, field: &str) -> Result<()> {
        let value = value.trim();
        if value.starts_with("https:") {
            return Ok(());
        }

        let address = value.strip_prefix("mailto:").unwrap_or(value);
        match address.split_once('@') {
            Some((user, domain)) if !user.is_empty() && !domain.is_empty() => Ok(()),
            _ => Err(ConfigError::ValidationError(format!(
                "{} must be an email address or contact URI",
                field
            ))),
        }
    }

    /// Parse a value with its `FromStr` implementation
    pub fn parses<T>(value: &str, field: &str) -> Result<T>
    where
        T: std::str::FromStr<Err = String>,
    {
        value
            .parse()
            .map_err(|e| ConfigError::ValidationError(format!("{}: {}", field, e)))
    }
}
