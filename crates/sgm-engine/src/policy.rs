//! Overridable migration policy
//!
//! Two decisions are left to the deployment:
//! - which applications are shared infrastructure (reused, never created)
//! - which missing dependencies must hard-fail instead of being created
//!
//! Both are composed into [`DefaultMigrationPolicy`] rather than obtained by
//! subclassing the orchestrator.

use crate::config::MigrationConfig;
use sgm_model::{ReferenceKey, SecurityGroupReference};
use std::collections::{BTreeSet, HashSet};
use std::fmt;
use std::sync::Arc;

/// Policy hooks consulted by the reference resolver
pub trait MigrationPolicy: Send + Sync {
    /// Whether `application` owns shared infrastructure groups
    fn is_infrastructure_application(&self, application: &str) -> bool;

    /// Subset of `references` that must hard-fail when missing in the target
    ///
    /// Receives every distinct reference of the run at once.
    fn should_error(&self, references: &[SecurityGroupReference]) -> HashSet<ReferenceKey>;
}

type ShouldErrorFn = dyn Fn(&[SecurityGroupReference]) -> HashSet<ReferenceKey> + Send + Sync;

/// Config-driven policy: infra applications from configuration, never errors
/// unless an error classifier is composed in
#[derive(Clone, Default)]
pub struct DefaultMigrationPolicy {
    infrastructure_applications: BTreeSet<String>,
    should_error: Option<Arc<ShouldErrorFn>>,
}

impl DefaultMigrationPolicy {
    /// Create policy with no infrastructure applications
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create policy from configuration
    #[must_use]
    pub fn from_config(config: &MigrationConfig) -> Self {
        Self {
            infrastructure_applications: config.infrastructure_applications.clone(),
            should_error: None,
        }
    }

    /// With an error classifier
    #[must_use]
    pub fn with_should_error<F>(mut self, classifier: F) -> Self
    where
        F: Fn(&[SecurityGroupReference]) -> HashSet<ReferenceKey> + Send + Sync + 'static,
    {
        self.should_error = Some(Arc::new(classifier));
        self
    }
}

impl fmt::Debug for DefaultMigrationPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DefaultMigrationPolicy")
            .field("infrastructure_applications", &self.infrastructure_applications)
            .field("should_error", &self.should_error.is_some())
            .finish()
    }
}

impl MigrationPolicy for DefaultMigrationPolicy {
    fn is_infrastructure_application(&self, application: &str) -> bool {
        self.infrastructure_applications.contains(application)
    }

    fn should_error(&self, references: &[SecurityGroupReference]) -> HashSet<ReferenceKey> {
        self.should_error
            .as_ref()
            .map(|classifier| classifier(references))
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reference(account_id: &str, group_id: &str, name: &str) -> SecurityGroupReference {
        SecurityGroupReference {
            account_id: account_id.to_string(),
            group_id: group_id.to_string(),
            group_name: Some(name.to_string()),
            port_range: None,
            protocol: "tcp".to_string(),
        }
    }

    #[test]
    fn default_never_errors() {
        let policy = DefaultMigrationPolicy::new();
        let references = vec![reference("111", "sg-2", "db")];
        assert!(policy.should_error(&references).is_empty());
        assert!(!policy.is_infrastructure_application("infra"));
    }

    #[test]
    fn infrastructure_applications_from_config() {
        let config = MigrationConfig::new().with_infrastructure_applications(["infra"]);
        let policy = DefaultMigrationPolicy::from_config(&config);
        assert!(policy.is_infrastructure_application("infra"));
        assert!(!policy.is_infrastructure_application("api"));
    }

    #[test]
    fn composed_classifier_sees_all_references() {
        let policy = DefaultMigrationPolicy::new().with_should_error(|references| {
            references
                .iter()
                .filter(|r| r.group_name.as_deref() == Some("db"))
                .map(SecurityGroupReference::key)
                .collect()
        });

        let references = vec![reference("111", "sg-2", "db"), reference("111", "sg-3", "cache")];
        let flagged = policy.should_error(&references);

        assert_eq!(flagged.len(), 1);
        assert!(flagged.contains(&ReferenceKey::new("111", "sg-2")));
        assert!(format!("{policy:?}").contains("should_error: true"));
    }
}
