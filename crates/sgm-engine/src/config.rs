//! Migration engine configuration
//!
//! Loaded from TOML; every field has a default so partial files work:
//!
//! ```toml
//! platform_name = "Spinnaker"
//! infrastructure_applications = ["infra", "nf"]
//! ```

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::Path;
use std::time::Duration;

/// Pseudo account id the provider uses for load-balancer owned groups
pub const DEFAULT_ELB_ACCOUNT_ID: &str = "amazon-elb";

/// Engine configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MigrationConfig {
    /// Name used in "does not manage the account" explanations
    pub platform_name: String,
    /// Applications whose groups are shared infrastructure, never created
    pub infrastructure_applications: BTreeSet<String>,
    /// Account id marking load-balancer owned groups
    pub elb_account_id: String,
    /// Entries per account-identity cache
    pub lookup_cache_capacity: u64,
    /// Lifetime of cached account-identity answers
    pub lookup_cache_ttl_secs: u64,
}

impl MigrationConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With platform name
    #[inline]
    #[must_use]
    pub fn with_platform_name(mut self, name: impl Into<String>) -> Self {
        self.platform_name = name.into();
        self
    }

    /// With infrastructure applications
    #[must_use]
    pub fn with_infrastructure_applications<I, S>(mut self, applications: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.infrastructure_applications = applications.into_iter().map(Into::into).collect();
        self
    }

    /// Parse from TOML text
    ///
    /// # Errors
    /// Returns [`ConfigError`] on malformed TOML or invalid values.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse a TOML file
    ///
    /// # Errors
    /// Returns [`ConfigError`] when the file cannot be read or parsed.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Check value constraints
    ///
    /// # Errors
    /// Returns [`ConfigError::Invalid`] naming the offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.platform_name.trim().is_empty() {
            return Err(ConfigError::Invalid("platform_name must not be empty".to_string()));
        }
        if self.elb_account_id.trim().is_empty() {
            return Err(ConfigError::Invalid("elb_account_id must not be empty".to_string()));
        }
        if self.lookup_cache_capacity == 0 {
            return Err(ConfigError::Invalid(
                "lookup_cache_capacity must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Lifetime of cached account-identity answers
    #[inline]
    #[must_use]
    pub fn lookup_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.lookup_cache_ttl_secs)
    }
}

impl Default for MigrationConfig {
    fn default() -> Self {
        Self {
            platform_name: "Spinnaker".to_string(),
            infrastructure_applications: BTreeSet::new(),
            elb_account_id: DEFAULT_ELB_ACCOUNT_ID.to_string(),
            lookup_cache_capacity: 1_000,
            lookup_cache_ttl_secs: 300,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn partial_toml_keeps_defaults() {
        let config = MigrationConfig::from_toml_str(
            r#"
            infrastructure_applications = ["infra", "nf"]
            "#,
        )
        .unwrap();

        assert_eq!(config.platform_name, "Spinnaker");
        assert_eq!(config.elb_account_id, "amazon-elb");
        assert!(config.infrastructure_applications.contains("infra"));
        assert_eq!(config.lookup_cache_ttl(), Duration::from_secs(300));
    }

    #[test]
    fn invalid_values_rejected() {
        let err = MigrationConfig::from_toml_str("platform_name = \"\"").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));

        let err = MigrationConfig::from_toml_str("lookup_cache_capacity = 0").unwrap_err();
        assert!(err.to_string().contains("lookup_cache_capacity"));
    }

    #[test]
    fn malformed_toml_rejected() {
        let err = MigrationConfig::from_toml_str("platform_name = ").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn loads_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "platform_name = \"Deck\"").unwrap();

        let config = MigrationConfig::from_file(file.path()).unwrap();
        assert_eq!(config.platform_name, "Deck");
    }

    #[test]
    fn missing_file_reports_path() {
        let err = MigrationConfig::from_file("/nonexistent/sgm.toml").unwrap_err();
        assert!(err.to_string().contains("/nonexistent/sgm.toml"));
    }

    #[test]
    fn builder_sets_infrastructure_applications() {
        let config = MigrationConfig::new()
            .with_platform_name("Deck")
            .with_infrastructure_applications(["infra"]);
        assert_eq!(config.platform_name, "Deck");
        assert_eq!(config.infrastructure_applications.len(), 1);
    }
}
