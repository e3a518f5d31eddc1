//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check that aliases can form a path segment
//! - Check that base URLs are absolute `http://` or `https://` URIs
//! - Validate listener and metrics addresses
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ProxyConfig → Result<(), Vec<ValidationError>>
//! - Blank base URLs are legal; they mean "no mapping" at runtime

use std::net::SocketAddr;

use axum::http::Uri;

use crate::config::schema::ProxyConfig;

/// A single semantic problem found in a configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// An alias in `hosts_urls` is empty.
    EmptyAlias,
    /// An alias starts or ends with `/`, which would never match a segment.
    AliasSlash(String),
    /// A base URL is not an absolute `http://` or `https://` URI.
    InvalidBaseUrl { alias: String, url: String, reason: String },
    /// A content rule has an empty media type.
    EmptyMediaType(String),
    /// The listener bind address is not a socket address.
    InvalidBindAddress(String),
    /// The metrics bind address is not a socket address.
    InvalidMetricsAddress(String),
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationError::EmptyAlias => write!(f, "hosts_urls contains an empty alias"),
            ValidationError::AliasSlash(alias) => {
                write!(f, "alias '{}' must not start or end with '/'", alias)
            }
            ValidationError::InvalidBaseUrl { alias, url, reason } => {
                write!(f, "alias '{}' has invalid base URL '{}': {}", alias, url, reason)
            }
            ValidationError::EmptyMediaType(rule) => {
                write!(f, "content rule '{}' has an empty media type", rule)
            }
            ValidationError::InvalidBindAddress(addr) => {
                write!(f, "invalid listener bind address '{}'", addr)
            }
            ValidationError::InvalidMetricsAddress(addr) => {
                write!(f, "invalid metrics address '{}'", addr)
            }
        }
    }
}

impl std::error::Error for ValidationError {}

/// Validate a parsed configuration, collecting every problem.
pub fn validate_config(config: &ProxyConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    for (alias, url) in &config.hosts_urls {
        if alias.is_empty() {
            errors.push(ValidationError::EmptyAlias);
        } else if alias.starts_with('/') || alias.ends_with('/') {
            errors.push(ValidationError::AliasSlash(alias.clone()));
        }

        if url.trim().is_empty() {
            continue;
        }
        if let Err(reason) = check_base_url(url) {
            errors.push(ValidationError::InvalidBaseUrl {
                alias: alias.clone(),
                url: url.clone(),
                reason,
            });
        }
    }

    for (rule, media_type) in &config.content_of_type {
        if media_type.trim().is_empty() {
            errors.push(ValidationError::EmptyMediaType(rule.clone()));
        }
    }

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidBindAddress(
            config.listener.bind_address.clone(),
        ));
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::InvalidMetricsAddress(
            config.observability.metrics_address.clone(),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_base_url(url: &str) -> Result<(), String> {
    let uri: Uri = url.parse().map_err(|e: axum::http::uri::InvalidUri| e.to_string())?;
    match uri.scheme_str() {
        Some("http") | Some("https") => {}
        Some(other) => return Err(format!("unsupported scheme '{}'", other)),
        None => return Err("missing scheme".to_string()),
    }
    if uri.host().is_none() {
        return Err("missing host".to_string());
    }
    Ok(())
}
