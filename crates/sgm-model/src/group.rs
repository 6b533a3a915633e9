//! Provider-side security group snapshots
//!
//! Mirrors the shape the provider reports for a group: ingress permissions
//! carry group pairs (other groups allowed in) and IP ranges.

use crate::reference::PortRange;
use crate::rule::{IngressRule, RuleSource, TargetGroupRef};
use serde::{Deserialize, Serialize};

/// A group named as the allowed source of an ingress permission
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserIdGroupPair {
    /// Owning account id (or a pseudo account such as `amazon-elb`)
    pub user_id: String,
    /// Referenced group id
    pub group_id: String,
    /// Referenced group name; providers frequently omit it
    pub group_name: Option<String>,
    /// VPC of the referenced group
    pub vpc_id: Option<String>,
}

impl UserIdGroupPair {
    /// Create a named group pair
    #[inline]
    #[must_use]
    pub fn new(
        user_id: impl Into<String>,
        group_id: impl Into<String>,
        group_name: impl Into<String>,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            group_id: group_id.into(),
            group_name: Some(group_name.into()),
            vpc_id: None,
        }
    }

    /// Create a pair that carries no group name
    #[inline]
    #[must_use]
    pub fn unnamed(user_id: impl Into<String>, group_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            group_id: group_id.into(),
            group_name: None,
            vpc_id: None,
        }
    }

    /// With VPC id
    #[inline]
    #[must_use]
    pub fn with_vpc_id(mut self, vpc_id: impl Into<String>) -> Self {
        self.vpc_id = Some(vpc_id.into());
        self
    }
}

/// CIDR block allowed by an ingress permission
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IpRange {
    /// IPv4 or IPv6 CIDR
    pub cidr: String,
    /// Free-form description, not part of rule identity
    pub description: Option<String>,
}

impl IpRange {
    /// Create range without description
    #[inline]
    #[must_use]
    pub fn new(cidr: impl Into<String>) -> Self {
        Self {
            cidr: cidr.into(),
            description: None,
        }
    }
}

/// One ingress permission as reported by the provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IpPermission {
    /// Protocol name or number; `-1` means all traffic
    pub protocol: String,
    /// First port (absent for all-traffic rules)
    pub from_port: Option<i32>,
    /// Last port (absent for all-traffic rules)
    pub to_port: Option<i32>,
    /// Groups allowed in
    pub group_pairs: Vec<UserIdGroupPair>,
    /// CIDR ranges allowed in
    pub ip_ranges: Vec<IpRange>,
}

impl IpPermission {
    /// Create permission with no sources
    #[inline]
    #[must_use]
    pub fn new(protocol: impl Into<String>, from_port: Option<i32>, to_port: Option<i32>) -> Self {
        Self {
            protocol: protocol.into(),
            from_port,
            to_port,
            group_pairs: Vec::new(),
            ip_ranges: Vec::new(),
        }
    }

    /// TCP permission over an inclusive port range
    #[inline]
    #[must_use]
    pub fn tcp(from_port: i32, to_port: i32) -> Self {
        Self::new("tcp", Some(from_port), Some(to_port))
    }

    /// All-traffic permission
    #[inline]
    #[must_use]
    pub fn all_traffic() -> Self {
        Self::new(crate::ALL_PROTOCOLS, None, None)
    }

    /// Add a group pair
    #[inline]
    #[must_use]
    pub fn with_group_pair(mut self, pair: UserIdGroupPair) -> Self {
        self.group_pairs.push(pair);
        self
    }

    /// Add a CIDR range
    #[inline]
    #[must_use]
    pub fn with_ip_range(mut self, cidr: impl Into<String>) -> Self {
        self.ip_ranges.push(IpRange::new(cidr));
        self
    }

    /// Port range, when both bounds are set
    #[inline]
    #[must_use]
    pub fn port_range(&self) -> Option<PortRange> {
        match (self.from_port, self.to_port) {
            (Some(from), Some(to)) => Some(PortRange::new(from, to)),
            _ => None,
        }
    }

    /// Flatten into one rule per allowed source
    #[must_use]
    pub fn rules(&self) -> Vec<IngressRule> {
        let groups = self.group_pairs.iter().map(|pair| {
            RuleSource::Group(TargetGroupRef {
                account_id: pair.user_id.clone(),
                name: pair.group_name.clone().unwrap_or_default(),
                group_id: Some(pair.group_id.clone()),
            })
        });
        let ranges = self
            .ip_ranges
            .iter()
            .map(|range| RuleSource::Cidr(range.cidr.clone()));

        groups
            .chain(ranges)
            .map(|source| IngressRule {
                protocol: self.protocol.clone(),
                from_port: self.from_port,
                to_port: self.to_port,
                source,
            })
            .collect()
    }
}

/// Snapshot of a provider security group
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecurityGroup {
    /// Provider group id
    pub id: String,
    /// Group name
    pub name: String,
    /// Owning account id
    pub owner_id: String,
    /// VPC the group lives in
    pub vpc_id: Option<String>,
    /// Group description
    pub description: String,
    /// Ingress permissions
    pub ingress: Vec<IpPermission>,
}

impl SecurityGroup {
    /// Create group with no ingress
    #[inline]
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        owner_id: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            owner_id: owner_id.into(),
            vpc_id: None,
            description: String::new(),
            ingress: Vec::new(),
        }
    }

    /// With VPC id
    #[inline]
    #[must_use]
    pub fn with_vpc_id(mut self, vpc_id: impl Into<String>) -> Self {
        self.vpc_id = Some(vpc_id.into());
        self
    }

    /// With description
    #[inline]
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Add an ingress permission
    #[inline]
    #[must_use]
    pub fn with_permission(mut self, permission: IpPermission) -> Self {
        self.ingress.push(permission);
        self
    }

    /// Identity of this group as a rule endpoint
    #[inline]
    #[must_use]
    pub fn target_ref(&self) -> TargetGroupRef {
        TargetGroupRef {
            account_id: self.owner_id.clone(),
            name: self.name.clone(),
            group_id: Some(self.id.clone()),
        }
    }

    /// All ingress permissions, flattened
    #[must_use]
    pub fn ingress_rules(&self) -> Vec<IngressRule> {
        self.ingress.iter().flat_map(IpPermission::rules).collect()
    }
}

/// Request to create a security group
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecurityGroupDescriptor {
    /// Account to create the group in
    pub account_name: String,
    /// Group name
    pub name: String,
    /// Provider region
    pub region: String,
    /// VPC to create the group in
    pub vpc_id: Option<String>,
    /// Group description
    pub description: String,
}
