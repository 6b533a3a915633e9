//! Migration Orchestrator
//!
//! Drives one migration run:
//! 1. Look up the source group (fail fast if missing and not auto-created)
//! 2. Resolve the target group itself
//! 3. Resolve every distinct reference in the source's ingress
//! 4. Halt with a partial result if any reference errored
//! 5. Create planned groups, reconcile ingress, apply net-new rules
//!
//! Steps 1-4 issue no mutating call. Step 5 mutates only outside dry runs,
//! so an errored or dry run never creates a group or adds a rule.
//!
//! Lookups all happen before any creation, so two references can plan the
//! same target slot (account, name, VPC). The first plan, the target's own
//! when it is involved, creates the group; later plans share it.

use crate::config::MigrationConfig;
use crate::error::MigrationError;
use crate::policy::{DefaultMigrationPolicy, MigrationPolicy};
use crate::reconciler::IngressReconciler;
use crate::resolver::ReferenceResolver;
use sgm_lookup::{CachedLookup, LookupError, SecurityGroupLookup, VpcDescriber};
use sgm_model::{
    collect_references, GroupSlot, IngressUpdates, MigrationResult, ResolutionOutcome,
    ResolvedReference, SecurityGroup, SecurityGroupLocation, TargetGroupRef,
};
use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use tracing::Instrument;

/// Parameters of one migration run
#[derive(Clone, Copy)]
pub struct MigrationRequest<'a> {
    /// Where the group comes from
    pub source: &'a SecurityGroupLocation,
    /// Where the group goes
    pub target: &'a SecurityGroupLocation,
    /// Lookup scoped to the source region
    pub source_lookup: &'a dyn SecurityGroupLookup,
    /// Lookup scoped to the target region
    pub target_lookup: &'a dyn SecurityGroupLookup,
    /// Create the target even when the source group does not exist
    pub create_if_source_missing: bool,
    /// Plan only; issue no mutating call
    pub dry_run: bool,
}

impl<'a> MigrationRequest<'a> {
    /// Create request (no auto-creation, not a dry run)
    #[must_use]
    pub fn new(
        source: &'a SecurityGroupLocation,
        target: &'a SecurityGroupLocation,
        source_lookup: &'a dyn SecurityGroupLookup,
        target_lookup: &'a dyn SecurityGroupLookup,
    ) -> Self {
        Self {
            source,
            target,
            source_lookup,
            target_lookup,
            create_if_source_missing: false,
            dry_run: false,
        }
    }

    /// Set auto-creation of the target when the source is missing
    #[inline]
    #[must_use]
    pub fn create_if_source_missing(mut self, create: bool) -> Self {
        self.create_if_source_missing = create;
        self
    }

    /// Set dry-run mode
    #[inline]
    #[must_use]
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }
}

impl fmt::Debug for MigrationRequest<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MigrationRequest")
            .field("source", &self.source)
            .field("target", &self.target)
            .field("create_if_source_missing", &self.create_if_source_missing)
            .field("dry_run", &self.dry_run)
            .finish_non_exhaustive()
    }
}

/// Security group migration orchestrator
///
/// Holds configuration and policy; each call to
/// [`generate_results`](Self::generate_results) is an independent run.
pub struct SecurityGroupMigrator {
    config: MigrationConfig,
    policy: Arc<dyn MigrationPolicy>,
    vpc_describer: Option<Arc<dyn VpcDescriber>>,
}

impl SecurityGroupMigrator {
    /// Create migrator with the config-driven default policy
    #[must_use]
    pub fn new(config: MigrationConfig) -> Self {
        let policy = DefaultMigrationPolicy::from_config(&config);
        Self {
            config,
            policy: Arc::new(policy),
            vpc_describer: None,
        }
    }

    /// Create migrator from a TOML configuration file
    ///
    /// # Errors
    /// Returns [`MigrationError::Config`] when the file cannot be read,
    /// parsed or validated.
    pub fn from_config_file(path: impl AsRef<Path>) -> Result<Self, MigrationError> {
        let config = MigrationConfig::from_file(path)?;
        Ok(Self::new(config))
    }

    /// Replace the policy
    #[must_use]
    pub fn with_policy(mut self, policy: impl MigrationPolicy + 'static) -> Self {
        self.policy = Arc::new(policy);
        self
    }

    /// Describe target VPCs in log output
    #[must_use]
    pub fn with_vpc_describer(mut self, describer: Arc<dyn VpcDescriber>) -> Self {
        self.vpc_describer = Some(describer);
        self
    }

    /// Engine configuration
    #[inline]
    #[must_use]
    pub fn config(&self) -> &MigrationConfig {
        &self.config
    }

    /// Wrap a lookup with the configured account-identity cache
    #[must_use]
    pub fn cached<L: SecurityGroupLookup>(&self, lookup: L) -> CachedLookup<L> {
        CachedLookup::with_ttl(
            lookup,
            self.config.lookup_cache_capacity,
            self.config.lookup_cache_ttl(),
        )
    }

    /// Run one migration
    ///
    /// # Errors
    /// - [`MigrationError::MissingSource`] when the source group is absent
    ///   and `create_if_source_missing` is false
    /// - [`MigrationError::InvalidLocation`] when the source has no name
    /// - [`MigrationError::Lookup`] for any lookup failure
    ///
    /// Flagged dependencies are not errors: they are returned in
    /// `MigrationResult::errors` with nothing migrated.
    pub async fn generate_results(
        &self,
        request: MigrationRequest<'_>,
    ) -> Result<MigrationResult, MigrationError> {
        let span = tracing::info_span!(
            "migrate_security_group",
            source = %request.source,
            target = %request.target,
            dry_run = request.dry_run,
        );
        self.run(request).instrument(span).await
    }

    async fn run(&self, request: MigrationRequest<'_>) -> Result<MigrationResult, MigrationError> {
        let MigrationRequest {
            source,
            target,
            source_lookup,
            target_lookup,
            create_if_source_missing,
            dry_run,
        } = request;

        let source_name = source.name.as_deref().ok_or_else(|| {
            MigrationError::InvalidLocation("source location has no group name".to_string())
        })?;

        let source_group = source_lookup
            .get_security_group_by_name(source.account_name(), source_name, source.vpc_id.as_deref())
            .await?;
        if source_group.is_none() && !create_if_source_missing {
            return Err(MigrationError::MissingSource {
                account: source.account_name().to_string(),
                region: source.region.clone(),
                name: source_name.to_string(),
            });
        }

        tracing::info!(source_exists = source_group.is_some(), "starting migration");
        self.log_target_vpc(target).await;

        let resolver = ReferenceResolver::new(
            &self.config,
            self.policy.as_ref(),
            source,
            target,
            source_lookup,
            target_lookup,
        );

        let mut target_resolution = resolver
            .resolve_target(source_name, source_group.as_ref())
            .await?;
        if matches!(target_resolution.outcome, ResolutionOutcome::Skipped { .. }) {
            tracing::info!(group = source_name, "target is a missing infrastructure group, nothing to migrate");
            return Ok(MigrationResult::from_resolution(
                target_resolution,
                Vec::new(),
                IngressUpdates::new(),
            ));
        }

        let references = source_group
            .as_ref()
            .map(collect_references)
            .unwrap_or_default();
        let flagged = self.policy.should_error(&references);

        let mut resolved = Vec::with_capacity(references.len());
        for reference in &references {
            resolved.push(resolver.resolve(reference, &flagged).await?);
        }
        share_planned_slots(&mut target_resolution, &mut resolved);

        let errored = resolved.iter().filter(|r| r.outcome.is_errored()).count();
        if errored > 0 {
            tracing::warn!(errors = errored, "unresolved dependencies, nothing migrated");
            return Ok(MigrationResult::from_resolution(
                target_resolution,
                resolved,
                IngressUpdates::new(),
            ));
        }

        if !dry_run {
            let mut created = HashMap::new();
            create_planned(target_lookup, &mut target_resolution, &mut created).await?;
            for reference in &mut resolved {
                create_planned(target_lookup, reference, &mut created).await?;
            }
        }

        let updates = source_group
            .as_ref()
            .map(|group| IngressReconciler::reconcile(group, &resolved, &target_resolution))
            .unwrap_or_default();

        if !dry_run {
            apply_ingress(target_lookup, target, &target_resolution, &updates).await?;
        }

        let result = MigrationResult::from_resolution(target_resolution, resolved, updates);
        tracing::info!(
            created = result.created.len(),
            reused = result.reused.len(),
            skipped = result.skipped.len(),
            warnings = result.warnings.len(),
            ingress_rules = result.ingress_update_count(),
            "migration complete"
        );
        Ok(result)
    }

    async fn log_target_vpc(&self, target: &SecurityGroupLocation) {
        let (Some(describer), Some(vpc_id)) = (&self.vpc_describer, target.vpc_id.as_deref()) else {
            return;
        };
        match describer.vpc_name(vpc_id).await {
            Ok(name) => tracing::info!(
                vpc = vpc_id,
                vpc_name = name.as_deref().unwrap_or("<unnamed>"),
                "target VPC"
            ),
            Err(e) => tracing::debug!(vpc = vpc_id, error = %e, "could not describe target VPC"),
        }
    }
}

impl fmt::Debug for SecurityGroupMigrator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecurityGroupMigrator")
            .field("config", &self.config)
            .field("vpc_describer", &self.vpc_describer.is_some())
            .finish_non_exhaustive()
    }
}

/// Point every plan for an already-claimed slot at the first claimant
fn share_planned_slots(target: &mut ResolvedReference, references: &mut [ResolvedReference]) {
    let mut claimed: HashMap<GroupSlot, TargetGroupRef> = HashMap::new();

    for resolved in std::iter::once(target).chain(references.iter_mut()) {
        let ResolutionOutcome::Created(planned) = &mut resolved.outcome else {
            continue;
        };
        let slot = planned.slot();
        if let Some(first) = claimed.get(&slot) {
            tracing::debug!(
                group = %slot.name,
                account = %slot.account_name,
                "slot already planned, sharing creation"
            );
            planned.share(first);
        } else {
            claimed.insert(slot, planned.target.clone());
        }
    }
}

async fn create_planned(
    lookup: &dyn SecurityGroupLookup,
    resolved: &mut ResolvedReference,
    created: &mut HashMap<GroupSlot, SecurityGroup>,
) -> Result<(), LookupError> {
    let ResolutionOutcome::Created(planned) = &mut resolved.outcome else {
        return Ok(());
    };
    if planned.shared {
        if let Some(group) = created.get(&planned.slot()) {
            planned.mark_created(group.clone());
        }
        return Ok(());
    }
    let group = lookup.create_security_group(&planned.descriptor).await?;
    created.insert(planned.slot(), group.clone());
    tracing::info!(
        group = %group.id,
        name = %group.name,
        account = %planned.descriptor.account_name,
        "created security group"
    );
    planned.mark_created(group);
    Ok(())
}

async fn apply_ingress(
    lookup: &dyn SecurityGroupLookup,
    target: &SecurityGroupLocation,
    target_resolution: &ResolvedReference,
    updates: &IngressUpdates,
) -> Result<(), LookupError> {
    let Some(group) = target_resolution.outcome.group() else {
        return Ok(());
    };
    let handle = group.target_ref();

    for (target_ref, rules) in updates.iter() {
        if !target_ref.same_group(&handle) {
            tracing::warn!(group = %target_ref, "no handle for ingress update");
            continue;
        }
        tracing::info!(group = %target_ref, rules = rules.len(), "adding ingress rules");
        lookup.add_ingress(target.account_name(), group, rules).await?;
    }
    Ok(())
}
