//! Ingress Reconciler
//!
//! Rewrites the source group's permissions against resolved target
//! identities and keeps only rules the target group does not already have.

use sgm_model::{
    IngressRule, IngressUpdates, IpPermission, ReferenceKey, ResolvedReference, RuleSource,
    SecurityGroup, TargetGroupRef,
};
use std::collections::HashMap;

/// Computes net-new ingress rules
#[derive(Debug, Default, Clone, Copy)]
pub struct IngressReconciler;

impl IngressReconciler {
    /// Net-new rules per target group
    ///
    /// Group pairs whose reference was skipped, warned or errored are
    /// dropped; self-references point at the target's own identity; CIDR
    /// sources pass through unchanged. Existing rules are read from the
    /// target's group snapshot taken at resolution time.
    #[must_use]
    pub fn reconcile(
        source_group: &SecurityGroup,
        references: &[ResolvedReference],
        target: &ResolvedReference,
    ) -> IngressUpdates {
        let mut updates = IngressUpdates::new();
        let Some(target_ref) = target.outcome.target_ref() else {
            return updates;
        };

        let resolved: HashMap<ReferenceKey, TargetGroupRef> = references
            .iter()
            .filter_map(|r| r.outcome.target_ref().map(|t| (r.key(), t)))
            .collect();
        let existing = target
            .outcome
            .group()
            .map(SecurityGroup::ingress_rules)
            .unwrap_or_default();

        let mut net_new: Vec<IngressRule> = Vec::new();
        for permission in &source_group.ingress {
            for rule in rewrite(permission, &source_group.id, &target_ref, &resolved) {
                let known = existing
                    .iter()
                    .chain(net_new.iter())
                    .any(|other| other.is_equivalent(&rule));
                if !known {
                    net_new.push(rule);
                }
            }
        }

        tracing::debug!(target = %target_ref, rules = net_new.len(), "reconciled ingress");
        updates.insert(target_ref, net_new);
        updates
    }
}

fn rewrite(
    permission: &IpPermission,
    source_id: &str,
    target_ref: &TargetGroupRef,
    resolved: &HashMap<ReferenceKey, TargetGroupRef>,
) -> Vec<IngressRule> {
    let groups = permission.group_pairs.iter().filter_map(|pair| {
        if pair.group_id == source_id {
            return Some(target_ref.clone());
        }
        resolved
            .get(&ReferenceKey::new(pair.user_id.clone(), pair.group_id.clone()))
            .cloned()
    });

    groups
        .map(RuleSource::Group)
        .chain(
            permission
                .ip_ranges
                .iter()
                .map(|range| RuleSource::Cidr(range.cidr.clone())),
        )
        .map(|source| IngressRule {
            protocol: permission.protocol.clone(),
            from_port: permission.from_port,
            to_port: permission.to_port,
            source,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use sgm_model::{
        PlannedGroup, ResolutionOutcome, SecurityGroupDescriptor, SecurityGroupReference,
        UserIdGroupPair,
    };

    fn reference(account_id: &str, group_id: &str, name: &str) -> SecurityGroupReference {
        SecurityGroupReference {
            account_id: account_id.to_string(),
            group_id: group_id.to_string(),
            group_name: Some(name.to_string()),
            port_range: None,
            protocol: "tcp".to_string(),
        }
    }

    fn planned(account_id: &str, name: &str) -> ResolutionOutcome {
        ResolutionOutcome::Created(PlannedGroup::new(
            TargetGroupRef::planned(account_id, name),
            SecurityGroupDescriptor {
                account_name: "prod".to_string(),
                name: name.to_string(),
                region: "us-west-2".to_string(),
                vpc_id: None,
                description: String::new(),
            },
        ))
    }

    fn source_group() -> SecurityGroup {
        SecurityGroup::new("sg-1", "app", "111")
            .with_permission(
                IpPermission::tcp(7001, 7003)
                    .with_group_pair(UserIdGroupPair::new("111", "sg-2", "db"))
                    .with_group_pair(UserIdGroupPair::new("999", "sg-3", "partner")),
            )
            .with_permission(
                IpPermission::tcp(7000, 7002)
                    .with_group_pair(UserIdGroupPair::new("111", "sg-1", "app"))
                    .with_ip_range("10.0.0.0/8"),
            )
    }

    #[test]
    fn rewrites_self_and_resolved_drops_unresolved() {
        let target = ResolvedReference::new(reference("111", "sg-1", "app"), "app", planned("222", "app"));
        let references = vec![
            ResolvedReference::new(reference("111", "sg-2", "db"), "db", planned("222", "db")),
            ResolvedReference::new(
                reference("999", "sg-3", "partner"),
                "999",
                ResolutionOutcome::Warned { reason: "unmanaged".to_string() },
            ),
        ];

        let updates = IngressReconciler::reconcile(&source_group(), &references, &target);
        let rules = updates.get(&TargetGroupRef::planned("222", "app")).unwrap();

        assert_eq!(rules.len(), 3);
        assert_eq!(rules[0].source, RuleSource::Group(TargetGroupRef::planned("222", "db")));
        assert_eq!(rules[1].source, RuleSource::Group(TargetGroupRef::planned("222", "app")));
        assert_eq!(rules[2].source, RuleSource::Cidr("10.0.0.0/8".to_string()));
    }

    #[test]
    fn existing_rules_are_excluded() {
        let existing = SecurityGroup::new("sg-10", "app", "222").with_permission(
            IpPermission::tcp(7000, 7002)
                .with_group_pair(UserIdGroupPair::unnamed("222", "sg-10"))
                .with_ip_range("10.0.0.0/8"),
        );
        let target = ResolvedReference::new(
            reference("111", "sg-1", "app"),
            "app",
            ResolutionOutcome::Reused(existing.clone()),
        );
        let references = vec![ResolvedReference::new(
            reference("111", "sg-2", "db"),
            "db",
            ResolutionOutcome::Reused(SecurityGroup::new("sg-20", "db", "222")),
        )];

        let updates = IngressReconciler::reconcile(&source_group(), &references, &target);
        let rules = updates.get(&existing.target_ref()).unwrap();

        assert_eq!(rules.len(), 1);
        assert!(matches!(&rules[0].source, RuleSource::Group(g) if g.group_id.as_deref() == Some("sg-20")));
    }

    #[test]
    fn nothing_new_means_no_entry() {
        let source = SecurityGroup::new("sg-1", "app", "111")
            .with_permission(IpPermission::tcp(443, 443).with_ip_range("0.0.0.0/0"));
        let existing = SecurityGroup::new("sg-10", "app", "222")
            .with_permission(IpPermission::tcp(443, 443).with_ip_range("0.0.0.0/0"));
        let target = ResolvedReference::new(
            reference("111", "sg-1", "app"),
            "app",
            ResolutionOutcome::Reused(existing),
        );

        assert!(IngressReconciler::reconcile(&source, &[], &target).is_empty());
    }

    #[test]
    fn duplicate_source_rules_collapse() {
        let source = SecurityGroup::new("sg-1", "app", "111")
            .with_permission(IpPermission::tcp(80, 80).with_ip_range("10.0.0.0/8"))
            .with_permission(IpPermission::tcp(80, 80).with_ip_range("10.0.0.0/8"));
        let target = ResolvedReference::new(reference("111", "sg-1", "app"), "app", planned("222", "app"));

        assert_eq!(IngressReconciler::reconcile(&source, &[], &target).rule_count(), 1);
    }

    #[test]
    fn skipped_target_yields_nothing() {
        let target = ResolvedReference::new(
            reference("111", "sg-1", "infra-app"),
            "infra-app",
            ResolutionOutcome::Skipped { reason: "missing".to_string() },
        );
        assert!(IngressReconciler::reconcile(&source_group(), &[], &target).is_empty());
    }
}
