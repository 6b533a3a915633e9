//! Error types for the migration engine
//!
//! Only fatal conditions are errors here:
//! - the source group is missing and auto-creation was not requested
//! - a lookup call failed (never retried by the engine)
//!
//! Unmanaged accounts and flagged dependencies are not errors; they are
//! recorded in the [`MigrationResult`](sgm_model::MigrationResult).

use sgm_lookup::LookupError;
use std::path::PathBuf;

/// Main migration error type
#[derive(Debug, thiserror::Error)]
pub enum MigrationError {
    /// Source group absent and the caller disallowed auto-creation
    #[error("security group {name} does not exist in {account}/{region}")]
    MissingSource {
        /// Source account name
        account: String,
        /// Source region
        region: String,
        /// Source group name
        name: String,
    },

    /// Request is missing information the engine needs
    #[error("invalid location: {0}")]
    InvalidLocation(String),

    /// Lookup capability failure
    #[error("lookup error: {0}")]
    Lookup(#[from] LookupError),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl MigrationError {
    /// Check if the source group was missing
    #[inline]
    #[must_use]
    pub fn is_missing_source(&self) -> bool {
        matches!(self, Self::MissingSource { .. })
    }

    /// Check if error came from the provider transport
    #[inline]
    #[must_use]
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Lookup(e) if e.is_transport())
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Config file unreadable
    #[error("io error reading {}: {source}", path.display())]
    Io {
        /// File path
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// Malformed TOML
    #[error("parse error: {0}")]
    Parse(#[from] toml::de::Error),

    /// Value out of range
    #[error("invalid value: {0}")]
    Invalid(String),
}

/// Tracing setup errors
#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    /// Filter directive could not be parsed
    #[error("invalid log filter: {0}")]
    Filter(String),

    /// A global subscriber is already installed
    #[error("failed to install tracing subscriber: {0}")]
    Install(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_source_display() {
        let err = MigrationError::MissingSource {
            account: "test".to_string(),
            region: "us-east-1".to_string(),
            name: "app".to_string(),
        };
        assert_eq!(err.to_string(), "security group app does not exist in test/us-east-1");
        assert!(err.is_missing_source());
        assert!(!err.is_transport());
    }

    #[test]
    fn lookup_error_converts() {
        let err: MigrationError = LookupError::transport("DescribeSecurityGroups", "timeout").into();
        assert!(err.is_transport());
        assert!(err.to_string().contains("timeout"));
    }
}
