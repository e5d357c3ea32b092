//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (capacities >= 1, timeouts > 0)
//! - Check cross-field constraints (request timeout outlives dispatch timeout)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: GatewayConfig → Result<(), Vec<ValidationError>>
//! - Malformed allow-list entries are not errors; the allow-list skips them

use std::net::SocketAddr;

use axum::http::HeaderName;

use crate::config::schema::{BucketConfig, GatewayConfig};

/// A single semantic problem with a configuration.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("listener.bind_address '{0}' is not a socket address")]
    BindAddress(String),

    #[error("rate_limit.{0}.capacity must be at least 1")]
    BucketCapacity(&'static str),

    #[error("rate_limit.{0}.refill_per_second must be a positive number")]
    BucketRefill(&'static str),

    #[error("{0} must be greater than zero")]
    ZeroTimeout(&'static str),

    #[error("timeouts.request_secs ({request}) must exceed scripts.run_timeout_secs ({run})")]
    RequestTimeoutTooShort { request: u64, run: u64 },

    #[error("auth.header_name '{0}' is not a valid header name")]
    HeaderName(String),

    #[error("auth.api_keys must contain at least one non-empty key")]
    NoApiKeys,

    #[error("scripts.directory must not be empty")]
    ScriptsDirectory,
}

/// Check a parsed configuration, collecting every violation.
pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::BindAddress(
            config.listener.bind_address.clone(),
        ));
    }

    check_bucket("execution", &config.rate_limit.execution, &mut errors);
    check_bucket("standard", &config.rate_limit.standard, &mut errors);

    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::ZeroTimeout("timeouts.request_secs"));
    }
    if config.scripts.run_timeout_secs == 0 {
        errors.push(ValidationError::ZeroTimeout("scripts.run_timeout_secs"));
    }
    if config.scripts.help_timeout_secs == 0 {
        errors.push(ValidationError::ZeroTimeout("scripts.help_timeout_secs"));
    }
    if config.timeouts.request_secs <= config.scripts.run_timeout_secs {
        errors.push(ValidationError::RequestTimeoutTooShort {
            request: config.timeouts.request_secs,
            run: config.scripts.run_timeout_secs,
        });
    }

    if HeaderName::from_bytes(config.auth.header_name.as_bytes()).is_err() {
        errors.push(ValidationError::HeaderName(config.auth.header_name.clone()));
    }
    if config.auth.api_keys.is_empty() || config.auth.api_keys.iter().any(|k| k.is_empty()) {
        errors.push(ValidationError::NoApiKeys);
    }

    if config.scripts.directory.trim().is_empty() {
        errors.push(ValidationError::ScriptsDirectory);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_bucket(name: &'static str, bucket: &BucketConfig, errors: &mut Vec<ValidationError>) {
    if bucket.capacity < 1 {
        errors.push(ValidationError::BucketCapacity(name));
    }
    if !(bucket.refill_per_second.is_finite() && bucket.refill_per_second > 0.0) {
        errors.push(ValidationError::BucketRefill(name));
    }
}
