//! Application configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check identity fields needed to derive storage keys
//! - Validate store endpoints, timeouts and key prefix shape
//! - Validate logging settings
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: AppConfig → Result<(), Vec<ValidationError>>

use thiserror::Error;

use crate::config::schema::AppConfig;

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];
const LOG_FORMATS: &[&str] = &["text", "json"];

/// A single semantic problem in the application config.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{0} is required")]
    Required(&'static str),

    #[error("store endpoint #{0} is empty")]
    EmptyEndpoint(usize),

    #[error("store dial timeout must be greater than 0")]
    ZeroDialTimeout,

    #[error("store prefix '{0}' must start with '/' and not end with '/'")]
    BadPrefix(String),

    #[error("unknown log level '{0}'")]
    UnknownLogLevel(String),

    #[error("unknown log format '{0}'")]
    UnknownLogFormat(String),

    #[error("tls {0} path is required when tls is configured")]
    TlsPathMissing(&'static str),
}

/// Check `config` and collect every problem found.
pub fn validate_config(config: &AppConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.name.trim().is_empty() {
        errors.push(ValidationError::Required("app name"));
    }
    if config.env.trim().is_empty() {
        errors.push(ValidationError::Required("environment"));
    }

    let store = &config.store;
    if store.endpoints.is_empty() {
        errors.push(ValidationError::Required("store endpoints"));
    }
    for (i, endpoint) in store.endpoints.iter().enumerate() {
        if endpoint.trim().is_empty() {
            errors.push(ValidationError::EmptyEndpoint(i));
        }
    }
    if store.dial_timeout_secs == 0 {
        errors.push(ValidationError::ZeroDialTimeout);
    }
    if !store.prefix.starts_with('/') || (store.prefix.len() > 1 && store.prefix.ends_with('/')) {
        errors.push(ValidationError::BadPrefix(store.prefix.clone()));
    }
    if let Some(tls) = &store.tls {
        if tls.cert_file.is_empty() {
            errors.push(ValidationError::TlsPathMissing("cert_file"));
        }
        if tls.key_file.is_empty() {
            errors.push(ValidationError::TlsPathMissing("key_file"));
        }
    }

    let level = config.logger.level.to_ascii_lowercase();
    if !LOG_LEVELS.contains(&level.as_str()) {
        errors.push(ValidationError::UnknownLogLevel(config.logger.level.clone()));
    }
    let format = config.logger.format.to_ascii_lowercase();
    if !LOG_FORMATS.contains(&format.as_str()) {
        errors.push(ValidationError::UnknownLogFormat(config.logger.format.clone()));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
