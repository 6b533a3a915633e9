//! Reference Resolver
//!
//! Decides, for one referenced group, whether the migration reuses an
//! existing target group, creates one, or leaves the reference behind.
//!
//! # Policy (in order)
//! 1. Unmanaged account (not the ELB pseudo account): warn, no action
//! 2. ELB-owned group: skip silently
//! 3. Infrastructure application: reuse if present in the target, else skip
//! 4. Ordinary group: reuse if present, else error when the policy flags it,
//!    else plan a creation
//!
//! The resolver never mutates anything; creations are only planned here.

use crate::config::MigrationConfig;
use crate::policy::MigrationPolicy;
use sgm_lookup::{LookupError, SecurityGroupLookup};
use sgm_model::{
    application_name, AccountCredentials, PlannedGroup, ReferenceKey, ResolutionOutcome,
    ResolvedReference, SecurityGroup, SecurityGroupDescriptor, SecurityGroupLocation,
    SecurityGroupReference, TargetGroupRef, ALL_PROTOCOLS,
};
use std::collections::HashSet;

/// Resolves references for one migration run
pub struct ReferenceResolver<'a> {
    config: &'a MigrationConfig,
    policy: &'a dyn MigrationPolicy,
    source: &'a SecurityGroupLocation,
    target: &'a SecurityGroupLocation,
    source_lookup: &'a dyn SecurityGroupLookup,
    target_lookup: &'a dyn SecurityGroupLookup,
}

impl<'a> ReferenceResolver<'a> {
    /// Create resolver for one source/target pair
    #[must_use]
    pub fn new(
        config: &'a MigrationConfig,
        policy: &'a dyn MigrationPolicy,
        source: &'a SecurityGroupLocation,
        target: &'a SecurityGroupLocation,
        source_lookup: &'a dyn SecurityGroupLookup,
        target_lookup: &'a dyn SecurityGroupLookup,
    ) -> Self {
        Self {
            config,
            policy,
            source,
            target,
            source_lookup,
            target_lookup,
        }
    }

    /// Resolve one reference cited by the source group
    ///
    /// `flagged` is the policy's hard-fail subset for this run.
    ///
    /// # Errors
    /// Propagates lookup failures unchanged.
    pub async fn resolve(
        &self,
        reference: &SecurityGroupReference,
        flagged: &HashSet<ReferenceKey>,
    ) -> Result<ResolvedReference, LookupError> {
        let account_id = reference.account_id.as_str();
        let is_elb = account_id == self.config.elb_account_id;

        if !is_elb && !self.target_lookup.account_id_exists(account_id).await? {
            let reason = format!(
                "{} does not manage the account {account_id}",
                self.config.platform_name
            );
            tracing::warn!(group = %reference.group_id, account = account_id, "{reason}");
            return Ok(ResolvedReference::new(
                reference.clone(),
                account_id,
                ResolutionOutcome::Warned { reason },
            ));
        }

        if is_elb {
            tracing::debug!(group = reference.display_name(), "skipping load balancer group");
            return Ok(ResolvedReference::new(
                reference.clone(),
                reference.display_name(),
                ResolutionOutcome::Skipped {
                    reason: format!("{account_id} groups are managed by the load balancer"),
                },
            ));
        }

        let Some(name) = reference.group_name.as_deref() else {
            let reason = format!(
                "group {} in account {account_id} has no name",
                reference.group_id
            );
            tracing::warn!(group = %reference.group_id, account = account_id, "{reason}");
            return Ok(ResolvedReference::new(
                reference.clone(),
                reference.group_id.as_str(),
                ResolutionOutcome::Warned { reason },
            ));
        };

        let account = self.target_account_for(account_id).await?;
        let existing = self.find_in_target(&account, name).await?;

        let outcome = if self.policy.is_infrastructure_application(application_name(name)) {
            self.infrastructure_outcome(&account, name, existing)
        } else {
            match existing {
                Some(group) => ResolutionOutcome::Reused(group),
                None if flagged.contains(&reference.key()) => {
                    let reason = format!(
                        "security group {name} does not exist in {}/{} and will not be created",
                        account.name, self.target.region
                    );
                    tracing::warn!(group = name, "{reason}");
                    ResolutionOutcome::Errored { reason }
                }
                None => {
                    let description = self.source_description(account_id, name).await?;
                    ResolutionOutcome::Created(self.plan_creation(&account, name, description))
                }
            }
        };

        tracing::debug!(
            group = name,
            account = %account,
            outcome = outcome.kind(),
            "resolved reference"
        );
        Ok(ResolvedReference::new(reference.clone(), name, outcome))
    }

    /// Resolve the migration target itself
    ///
    /// Uses the infrastructure and ordinary rules only: the target always
    /// lives in the target account and is never subject to `should_error`.
    ///
    /// # Errors
    /// Propagates lookup failures unchanged.
    pub async fn resolve_target(
        &self,
        source_name: &str,
        source_group: Option<&SecurityGroup>,
    ) -> Result<ResolvedReference, LookupError> {
        let name = self.target.name.as_deref().unwrap_or(source_name);
        let reference = SecurityGroupReference {
            account_id: self.source.account_id().to_string(),
            group_id: source_group
                .map(|g| g.id.clone())
                .or_else(|| self.source.group_id.clone())
                .unwrap_or_default(),
            group_name: Some(source_name.to_string()),
            port_range: None,
            protocol: ALL_PROTOCOLS.to_string(),
        };

        let account = &self.target.credentials;
        let existing = self.find_in_target(account, name).await?;

        let outcome = if self.policy.is_infrastructure_application(application_name(name)) {
            self.infrastructure_outcome(account, name, existing)
        } else {
            match existing {
                Some(group) => ResolutionOutcome::Reused(group),
                None => {
                    let description = source_group
                        .map(|g| g.description.clone())
                        .filter(|d| !d.is_empty())
                        .unwrap_or_else(|| default_description(name));
                    ResolutionOutcome::Created(self.plan_creation(account, name, description))
                }
            }
        };

        tracing::debug!(group = name, outcome = outcome.kind(), "resolved target");
        Ok(ResolvedReference::new(reference, source_name, outcome))
    }

    fn infrastructure_outcome(
        &self,
        account: &AccountCredentials,
        name: &str,
        existing: Option<SecurityGroup>,
    ) -> ResolutionOutcome {
        match existing {
            Some(group) => ResolutionOutcome::Reused(group),
            None => ResolutionOutcome::Skipped {
                reason: format!(
                    "infrastructure group {name} does not exist in {}/{}",
                    account.name, self.target.region
                ),
            },
        }
    }

    /// Account a referenced group lives in on the target side
    ///
    /// Groups from the source's own account move with the source into the
    /// target account; groups from other accounts stay in their account.
    async fn target_account_for(&self, account_id: &str) -> Result<AccountCredentials, LookupError> {
        if account_id == self.source.account_id() {
            return Ok(self.target.credentials.clone());
        }
        match self.target_lookup.get_credentials_for_id(account_id).await? {
            Some(credentials) => Ok(credentials),
            None => {
                let name = self.target_lookup.get_account_name_for_id(account_id).await?;
                Ok(AccountCredentials::new(name, account_id))
            }
        }
    }

    async fn find_in_target(
        &self,
        account: &AccountCredentials,
        name: &str,
    ) -> Result<Option<SecurityGroup>, LookupError> {
        self.target_lookup
            .get_security_group_by_name(&account.name, name, self.target.vpc_id.as_deref())
            .await
    }

    async fn source_description(&self, account_id: &str, name: &str) -> Result<String, LookupError> {
        let account_name = if account_id == self.source.account_id() {
            self.source.account_name().to_string()
        } else {
            self.source_lookup.get_account_name_for_id(account_id).await?
        };
        let source_group = self
            .source_lookup
            .get_security_group_by_name(&account_name, name, self.source.vpc_id.as_deref())
            .await?;

        Ok(source_group
            .map(|g| g.description)
            .filter(|d| !d.is_empty())
            .unwrap_or_else(|| default_description(name)))
    }

    fn plan_creation(
        &self,
        account: &AccountCredentials,
        name: &str,
        description: String,
    ) -> PlannedGroup {
        PlannedGroup::new(
            TargetGroupRef::planned(account.account_id.clone(), name),
            SecurityGroupDescriptor {
                account_name: account.name.clone(),
                name: name.to_string(),
                region: self.target.region.clone(),
                vpc_id: self.target.vpc_id.clone(),
                description,
            },
        )
    }
}

fn default_description(name: &str) -> String {
    format!("Security group {name}")
}
