//! References to other security groups found in ingress permissions
//!
//! A reference is identified by `(account id, group id)`. Several
//! permissions may cite the same group; [`collect_references`] keeps the
//! first citation and drops self-references.

use crate::group::SecurityGroup;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// Inclusive port range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PortRange {
    /// First port
    pub from: i32,
    /// Last port
    pub to: i32,
}

impl PortRange {
    /// Create port range
    #[inline]
    #[must_use]
    pub fn new(from: i32, to: i32) -> Self {
        Self { from, to }
    }
}

impl fmt::Display for PortRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.from == self.to {
            write!(f, "{}", self.from)
        } else {
            write!(f, "{}-{}", self.from, self.to)
        }
    }
}

/// Identity of a referenced group within one migration run
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ReferenceKey {
    /// Owning account id
    pub account_id: String,
    /// Group id
    pub group_id: String,
}

impl ReferenceKey {
    /// Create key
    #[inline]
    #[must_use]
    pub fn new(account_id: impl Into<String>, group_id: impl Into<String>) -> Self {
        Self {
            account_id: account_id.into(),
            group_id: group_id.into(),
        }
    }
}

impl fmt::Display for ReferenceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.account_id, self.group_id)
    }
}

/// A security group cited by an ingress permission
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecurityGroupReference {
    /// Originating account id
    pub account_id: String,
    /// Source-side group id
    pub group_id: String,
    /// Source-side group name, when the provider reported one
    pub group_name: Option<String>,
    /// Port range of the citing permission
    pub port_range: Option<PortRange>,
    /// Protocol of the citing permission
    pub protocol: String,
}

impl SecurityGroupReference {
    /// Deduplication key
    #[inline]
    #[must_use]
    pub fn key(&self) -> ReferenceKey {
        ReferenceKey::new(self.account_id.clone(), self.group_id.clone())
    }

    /// Group name if present, else group id
    #[inline]
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.group_name.as_deref().unwrap_or(&self.group_id)
    }
}

/// Application a group belongs to: the part of its name before the first `-`
///
/// A name without `-` is its own application.
#[inline]
#[must_use]
pub fn application_name(group_name: &str) -> &str {
    group_name
        .split_once('-')
        .map_or(group_name, |(application, _)| application)
}

/// Distinct non-self references cited by `group`'s ingress, in encounter order
#[must_use]
pub fn collect_references(group: &SecurityGroup) -> Vec<SecurityGroupReference> {
    let mut seen = HashSet::new();
    let mut references = Vec::new();

    for permission in &group.ingress {
        for pair in &permission.group_pairs {
            if pair.group_id == group.id {
                continue;
            }
            let key = ReferenceKey::new(pair.user_id.clone(), pair.group_id.clone());
            if !seen.insert(key) {
                continue;
            }
            references.push(SecurityGroupReference {
                account_id: pair.user_id.clone(),
                group_id: pair.group_id.clone(),
                group_name: pair.group_name.clone(),
                port_range: permission.port_range(),
                protocol: permission.protocol.clone(),
            });
        }
    }

    references
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::group::{IpPermission, UserIdGroupPair};
    use proptest::prelude::*;

    fn sample_group() -> SecurityGroup {
        SecurityGroup::new("sg-1", "group1", "111")
            .with_permission(
                IpPermission::tcp(7001, 7003)
                    .with_group_pair(UserIdGroupPair::new("111", "sg-2", "group2"))
                    .with_group_pair(UserIdGroupPair::new("222", "sg-3", "group3")),
            )
            .with_permission(
                IpPermission::tcp(7000, 7002)
                    .with_group_pair(UserIdGroupPair::new("111", "sg-1", "group1"))
                    .with_group_pair(UserIdGroupPair::new("111", "sg-2", "group2")),
            )
    }

    #[test]
    fn application_name_before_first_dash() {
        assert_eq!(application_name("infra-g1"), "infra");
        assert_eq!(application_name("api-main-elb"), "api");
        assert_eq!(application_name("standalone"), "standalone");
        assert_eq!(application_name("-leading"), "");
    }

    #[test]
    fn collect_skips_self_and_duplicates() {
        let references = collect_references(&sample_group());
        let names: Vec<_> = references.iter().map(SecurityGroupReference::display_name).collect();
        assert_eq!(names, vec!["group2", "group3"]);
        assert_eq!(references[0].port_range, Some(PortRange::new(7001, 7003)));
    }

    #[test]
    fn display_name_falls_back_to_id() {
        let group = SecurityGroup::new("sg-1", "web", "111").with_permission(
            IpPermission::tcp(443, 443).with_group_pair(UserIdGroupPair::unnamed("amazon-elb", "sg-elb")),
        );
        let references = collect_references(&group);
        assert_eq!(references[0].display_name(), "sg-elb");
    }

    #[test]
    fn port_range_display() {
        assert_eq!(PortRange::new(80, 80).to_string(), "80");
        assert_eq!(PortRange::new(7000, 7002).to_string(), "7000-7002");
    }

    fn arb_pair() -> impl Strategy<Value = UserIdGroupPair> {
        (0..3u8, 0..6u8).prop_map(|(account, group)| {
            UserIdGroupPair::new(format!("acct-{account}"), format!("sg-{group}"), format!("g{group}"))
        })
    }

    proptest! {
        #[test]
        fn prop_references_unique_and_never_self(
            permissions in proptest::collection::vec(proptest::collection::vec(arb_pair(), 0..6), 0..8)
        ) {
            let group = permissions.into_iter().fold(
                SecurityGroup::new("sg-0", "g0", "acct-0"),
                |group, pairs| {
                    let permission = pairs
                        .into_iter()
                        .fold(IpPermission::tcp(1, 1), IpPermission::with_group_pair);
                    group.with_permission(permission)
                },
            );

            let references = collect_references(&group);
            let keys: HashSet<_> = references.iter().map(SecurityGroupReference::key).collect();

            prop_assert_eq!(keys.len(), references.len());
            prop_assert!(references.iter().all(|r| r.group_id != group.id));
        }
    }
}
