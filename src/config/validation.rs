//! Configuration validation logic.

use crate::config::loader::Config;
use crate::error::{Error, Result};
use regex::Regex;

/// Upper bound for concurrent downloads.
const MAX_CONCURRENCY: usize = 32;

/// Upper bound for attempts per request.
const MAX_RETRIES: u32 = 20;

/// Maximum profile id length.
const MAX_PROFILE_LENGTH: usize = 64;

/// Validate the entire configuration.
pub fn validate_config(config: &Config) -> Result<()> {
    validate_api_key(&config.api.api_key)?;
    validate_api_host(&config.api.api_host)?;
    validate_options(config)?;

    Ok(())
}

/// Validate the API key.
pub fn validate_api_key(api_key: &str) -> Result<()> {
    if api_key.trim().is_empty() {
        return Err(Error::MissingConfig("api_key".to_string()));
    }

    // Check for placeholder values
    let key_lower = api_key.to_lowercase();
    if key_lower.contains("replaceme") || key_lower.contains("your_api_key") {
        return Err(Error::ConfigValidation {
            field: "api_key".to_string(),
            message: "API key appears to be a placeholder. Please provide your actual key."
                .to_string(),
        });
    }

    Ok(())
}

/// Validate the API host.
pub fn validate_api_host(api_host: &str) -> Result<()> {
    let host = api_host.trim();
    if host.is_empty() {
        return Err(Error::MissingConfig("api_host".to_string()));
    }

    if host.contains(char::is_whitespace) {
        return Err(Error::ConfigValidation {
            field: "api_host".to_string(),
            message: format!("API host '{}' contains whitespace", api_host),
        });
    }

    Ok(())
}

/// Validate numeric download options.
pub fn validate_options(config: &Config) -> Result<()> {
    let options = &config.options;

    if !(1..=MAX_CONCURRENCY).contains(&options.max_concurrency) {
        return Err(Error::ConfigValidation {
            field: "max_concurrency".to_string(),
            message: format!(
                "Must be between 1 and {} (got {})",
                MAX_CONCURRENCY, options.max_concurrency
            ),
        });
    }

    if !(1..=MAX_RETRIES).contains(&options.max_retries) {
        return Err(Error::ConfigValidation {
            field: "max_retries".to_string(),
            message: format!(
                "Must be between 1 and {} (got {})",
                MAX_RETRIES, options.max_retries
            ),
        });
    }

    if options.base_delay_ms > options.max_delay_ms {
        return Err(Error::ConfigValidation {
            field: "base_delay_ms".to_string(),
            message: format!(
                "Base delay ({} ms) exceeds max delay ({} ms)",
                options.base_delay_ms, options.max_delay_ms
            ),
        });
    }

    if config.api.page_size == 0 {
        return Err(Error::ConfigValidation {
            field: "page_size".to_string(),
            message: "Page size must be at least 1".to_string(),
        });
    }

    if options.max_items == Some(0) {
        return Err(Error::ConfigValidation {
            field: "max_items".to_string(),
            message: "Item limit must be at least 1".to_string(),
        });
    }

    Ok(())
}

/// Validate a profile id and return it without a leading `@`.
///
/// The id doubles as a folder name, so only ASCII letters, digits,
/// underscores, and hyphens are accepted.
pub fn validate_profile_id(profile: &str) -> Result<&str> {
    let clean = profile.trim().trim_start_matches('@');

    if clean.is_empty() {
        return Err(Error::MissingConfig("profile".to_string()));
    }

    if clean.len() > MAX_PROFILE_LENGTH {
        return Err(Error::ConfigValidation {
            field: "profile".to_string(),
            message: format!(
                "Profile '{}' is too long (maximum {} characters)",
                profile, MAX_PROFILE_LENGTH
            ),
        });
    }

    let profile_pattern = Regex::new(r"^[A-Za-z0-9_-]+$").unwrap();
    if !profile_pattern.is_match(clean) {
        return Err(Error::ConfigValidation {
            field: "profile".to_string(),
            message: format!(
                "Profile '{}' contains invalid characters. Only alphanumeric, hyphens, and underscores allowed.",
                profile
            ),
        });
    }

    Ok(clean)
}
