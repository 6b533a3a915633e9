//! Aggregate outcome of one migration run

use crate::outcome::{ResolutionOutcome, ResolvedReference};
use crate::rule::{IngressRule, TargetGroupRef};
use indexmap::IndexMap;
use serde::ser::Serializer;
use serde::Serialize;

/// A group that was reused or created in the target
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MigratedGroup {
    /// Source-side group id
    pub source_id: String,
    /// Source-side display name
    pub source_name: String,
    /// Target-side identity
    pub target: TargetGroupRef,
    /// Target VPC
    pub vpc_id: Option<String>,
}

/// A reference that was silently not replicated
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedGroup {
    /// Source-side group id
    pub source_id: String,
    /// Originating account id
    pub account_id: String,
    /// Group name, or id when the name is unknown
    pub display_name: String,
    /// Why it was skipped
    pub reason: String,
}

/// A reference that was not replicated and is reported to the caller
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MigrationWarning {
    /// Source-side group id
    pub source_id: String,
    /// Originating account id
    pub account_id: String,
    /// Explanation
    pub explanation: String,
}

/// A reference that could not be migrated
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MigrationFailure {
    /// Source-side display name
    pub source_name: String,
    /// Why it failed
    pub reason: String,
}

/// Net-new ingress rules per target group, in encounter order
///
/// Groups with no net-new rules are never present.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IngressUpdates(IndexMap<TargetGroupRef, Vec<IngressRule>>);

impl IngressUpdates {
    /// Create empty updates
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record rules for `target`; an empty list is ignored
    pub fn insert(&mut self, target: TargetGroupRef, rules: Vec<IngressRule>) {
        if rules.is_empty() {
            return;
        }
        self.0.entry(target).or_default().extend(rules);
    }

    /// Rules for `target`
    #[must_use]
    pub fn get(&self, target: &TargetGroupRef) -> Option<&[IngressRule]> {
        self.0.get(target).map(Vec::as_slice)
    }

    /// Iterate `(target, rules)` pairs
    pub fn iter(&self) -> impl Iterator<Item = (&TargetGroupRef, &[IngressRule])> {
        self.0.iter().map(|(target, rules)| (target, rules.as_slice()))
    }

    /// Number of target groups with updates
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether no group needs updates
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Total number of rules across all groups
    #[must_use]
    pub fn rule_count(&self) -> usize {
        self.0.values().map(Vec::len).sum()
    }
}

impl Serialize for IngressUpdates {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        #[derive(Serialize)]
        struct Entry<'a> {
            target: &'a TargetGroupRef,
            rules: &'a [IngressRule],
        }

        serializer.collect_seq(self.0.iter().map(|(target, rules)| Entry { target, rules }))
    }
}

/// Result of one migration run
///
/// The target's own outcome is recorded both in `target` and in the list
/// matching its kind. A reference sharing another plan's slot is not
/// listed again.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MigrationResult {
    /// Outcome for the migrated group itself
    pub target: ResolvedReference,
    /// Every distinct reference, in encounter order
    pub references: Vec<ResolvedReference>,
    /// Groups created (or planned for creation in a dry run)
    ///
    /// One entry per target slot. Empty when the run halted on an error,
    /// since a halted run creates nothing; the planned creations are still
    /// visible in `target` and `references`.
    pub created: Vec<MigratedGroup>,
    /// Groups that already existed in the target
    pub reused: Vec<MigratedGroup>,
    /// References not replicated without warning
    pub skipped: Vec<SkippedGroup>,
    /// References not replicated, with explanation
    pub warnings: Vec<MigrationWarning>,
    /// References that halted the run
    pub errors: Vec<MigrationFailure>,
    /// Net-new ingress rules per target group
    pub ingress_updates: IngressUpdates,
}

impl MigrationResult {
    /// Aggregate resolved outcomes into a result
    #[must_use]
    pub fn from_resolution(
        target: ResolvedReference,
        references: Vec<ResolvedReference>,
        ingress_updates: IngressUpdates,
    ) -> Self {
        let mut result = Self {
            target: target.clone(),
            references: Vec::with_capacity(references.len()),
            created: Vec::new(),
            reused: Vec::new(),
            skipped: Vec::new(),
            warnings: Vec::new(),
            errors: Vec::new(),
            ingress_updates,
        };

        result.record(&target);
        for reference in references {
            result.record(&reference);
            result.references.push(reference);
        }
        if result.has_errors() {
            result.created.clear();
        }
        result
    }

    fn record(&mut self, resolved: &ResolvedReference) {
        let reference = &resolved.reference;
        match &resolved.outcome {
            ResolutionOutcome::Reused(group) => self.reused.push(MigratedGroup {
                source_id: reference.group_id.clone(),
                source_name: resolved.display_name.clone(),
                target: group.target_ref(),
                vpc_id: group.vpc_id.clone(),
            }),
            ResolutionOutcome::Created(planned) if planned.shared => {}
            ResolutionOutcome::Created(planned) => self.created.push(MigratedGroup {
                source_id: reference.group_id.clone(),
                source_name: resolved.display_name.clone(),
                target: planned.target.clone(),
                vpc_id: planned.descriptor.vpc_id.clone(),
            }),
            ResolutionOutcome::Skipped { reason } => self.skipped.push(SkippedGroup {
                source_id: reference.group_id.clone(),
                account_id: reference.account_id.clone(),
                display_name: resolved.display_name.clone(),
                reason: reason.clone(),
            }),
            ResolutionOutcome::Warned { reason } => self.warnings.push(MigrationWarning {
                source_id: reference.group_id.clone(),
                account_id: reference.account_id.clone(),
                explanation: reason.clone(),
            }),
            ResolutionOutcome::Errored { reason } => self.errors.push(MigrationFailure {
                source_name: resolved.display_name.clone(),
                reason: reason.clone(),
            }),
        }
    }

    /// Whether the target group already existed
    #[inline]
    #[must_use]
    pub fn target_exists(&self) -> bool {
        matches!(self.target.outcome, ResolutionOutcome::Reused(_))
    }

    /// Whether any reference halted the run
    #[inline]
    #[must_use]
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Total number of net-new ingress rules
    #[inline]
    #[must_use]
    pub fn ingress_update_count(&self) -> usize {
        self.ingress_updates.rule_count()
    }

    /// Display names of skipped references
    #[must_use]
    pub fn skipped_names(&self) -> Vec<&str> {
        self.skipped.iter().map(|s| s.display_name.as_str()).collect()
    }

    /// Source names of created groups
    #[must_use]
    pub fn created_names(&self) -> Vec<&str> {
        self.created.iter().map(|g| g.source_name.as_str()).collect()
    }

    /// Source names of reused groups
    #[must_use]
    pub fn reused_names(&self) -> Vec<&str> {
        self.reused.iter().map(|g| g.source_name.as_str()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::group::{SecurityGroup, SecurityGroupDescriptor};
    use crate::outcome::PlannedGroup;
    use crate::reference::SecurityGroupReference;
    use crate::rule::RuleSource;

    fn reference(group_id: &str, name: &str) -> SecurityGroupReference {
        SecurityGroupReference {
            account_id: "111".to_string(),
            group_id: group_id.to_string(),
            group_name: Some(name.to_string()),
            port_range: None,
            protocol: "tcp".to_string(),
        }
    }

    #[test]
    fn result_buckets_outcomes() {
        let target = ResolvedReference::new(
            reference("sg-1", "app"),
            "app",
            ResolutionOutcome::Reused(SecurityGroup::new("sg-10", "app", "222")),
        );
        let references = vec![
            ResolvedReference::new(
                reference("sg-2", "elb"),
                "elb",
                ResolutionOutcome::Skipped { reason: "load balancer".to_string() },
            ),
            ResolvedReference::new(
                reference("sg-3", "db"),
                "db",
                ResolutionOutcome::Warned { reason: "unmanaged".to_string() },
            ),
        ];

        let result = MigrationResult::from_resolution(target, references, IngressUpdates::new());

        assert!(result.target_exists());
        assert!(!result.has_errors());
        assert_eq!(result.reused_names(), vec!["app"]);
        assert_eq!(result.skipped_names(), vec!["elb"]);
        assert_eq!(result.warnings[0].source_id, "sg-3");
        assert_eq!(result.references.len(), 2);
    }

    fn planned(name: &str) -> ResolutionOutcome {
        ResolutionOutcome::Created(PlannedGroup::new(
            TargetGroupRef::planned("222", name),
            SecurityGroupDescriptor {
                account_name: "prod".to_string(),
                name: name.to_string(),
                region: "us-west-2".to_string(),
                vpc_id: Some("vpc-2".to_string()),
                description: String::new(),
            },
        ))
    }

    #[test]
    fn halted_result_lists_no_creations() {
        let target = ResolvedReference::new(reference("sg-1", "app"), "app", planned("app"));
        let references = vec![
            ResolvedReference::new(reference("sg-2", "db"), "db", planned("db")),
            ResolvedReference::new(
                reference("sg-3", "cache"),
                "cache",
                ResolutionOutcome::Errored { reason: "flagged".to_string() },
            ),
        ];

        let result = MigrationResult::from_resolution(target, references, IngressUpdates::new());

        assert!(result.has_errors());
        assert!(result.created.is_empty());
        assert_eq!(result.target.outcome.kind(), "created");
    }

    #[test]
    fn shared_plans_listed_once() {
        let target = ResolvedReference::new(reference("sg-1", "app"), "app", planned("app"));
        let mut peer = planned("app");
        if let ResolutionOutcome::Created(plan) = &mut peer {
            plan.share(&TargetGroupRef::planned("222", "app"));
        }
        let references = vec![ResolvedReference::new(reference("sg-9", "app"), "app", peer)];

        let result = MigrationResult::from_resolution(target, references, IngressUpdates::new());

        assert_eq!(result.created_names(), vec!["app"]);
        assert_eq!(result.references.len(), 1);
    }

    #[test]
    fn empty_rule_lists_are_not_recorded() {
        let mut updates = IngressUpdates::new();
        updates.insert(TargetGroupRef::planned("222", "app"), Vec::new());
        assert!(updates.is_empty());

        updates.insert(
            TargetGroupRef::planned("222", "app"),
            vec![IngressRule {
                protocol: "tcp".to_string(),
                from_port: Some(80),
                to_port: Some(80),
                source: RuleSource::Cidr("10.0.0.0/8".to_string()),
            }],
        );
        assert_eq!(updates.len(), 1);
        assert_eq!(updates.rule_count(), 1);
    }

    #[test]
    fn ingress_updates_serialize_as_entries() {
        let mut updates = IngressUpdates::new();
        updates.insert(
            TargetGroupRef::planned("222", "app"),
            vec![IngressRule {
                protocol: "tcp".to_string(),
                from_port: Some(80),
                to_port: Some(80),
                source: RuleSource::Cidr("10.0.0.0/8".to_string()),
            }],
        );

        let json = serde_json::to_value(&updates).unwrap();
        assert_eq!(json[0]["target"]["name"], "app");
        assert_eq!(json[0]["rules"][0]["source"]["value"], "10.0.0.0/8");
    }
}
