//! Custom validation functions for configuration.
//!
//! Provides shared validation logic used across multiple configuration
//! modules and the settings registry.

use validator::ValidationError;

/// Validate a tracing log level name.
pub fn validate_log_level(level: &str) -> Result<(), ValidationError> {
    let valid = ["trace", "debug", "info", "warn", "error"]
        .contains(&level.to_lowercase().as_str());
    if valid {
        Ok(())
    } else {
        Err(ValidationError::new("invalid_log_level"))
    }
}

/// Validate that the matcher depth bounds are ordered (min <= max).
pub fn validate_depth_order(config: &crate::MatcherConfig) -> Result<(), ValidationError> {
    if config.ac_min_depth <= config.ac_max_depth {
        Ok(())
    } else {
        Err(ValidationError::new("depth_bounds_unordered"))
    }
}

/// Validate a PUA category list: comma-separated dotted category names, or
/// empty for "all categories".
pub fn validate_pua_categories(categories: &str) -> Result<(), ValidationError> {
    if categories.is_empty() {
        return Ok(());
    }
    let re = regex::Regex::new("^[A-Za-z0-9._-]+(,[A-Za-z0-9._-]+)*$")
        .map_err(|_| ValidationError::new("invalid_regex"))?;
    if re.is_match(categories) {
        Ok(())
    } else {
        Err(ValidationError::new("invalid_pua_categories"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_levels() {
        assert!(validate_log_level("info").is_ok());
        assert!(validate_log_level("WARN").is_ok());
        assert!(validate_log_level("verbose").is_err());
    }

    #[test]
    fn pua_categories() {
        assert!(validate_pua_categories("").is_ok());
        assert!(validate_pua_categories("Win.Tool,Andr.Adware").is_ok());
        assert!(validate_pua_categories("Win.Tool,,").is_err());
    }
}
