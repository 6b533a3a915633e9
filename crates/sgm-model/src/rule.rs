//! Flattened ingress rules
//!
//! A rule is `(protocol, from port, to port, source)`; two rules are
//! equivalent when all four match. Groups planned for creation have no id
//! yet, so group endpoints compare by id when both sides carry one and by
//! `(account id, name)` otherwise.

use crate::group::{IpPermission, UserIdGroupPair};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Target-side identity of a security group
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TargetGroupRef {
    /// Owning account id
    pub account_id: String,
    /// Group name
    pub name: String,
    /// Group id; `None` until the group exists
    pub group_id: Option<String>,
}

impl TargetGroupRef {
    /// Reference to a group that does not exist yet
    #[inline]
    #[must_use]
    pub fn planned(account_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            account_id: account_id.into(),
            name: name.into(),
            group_id: None,
        }
    }

    /// Whether both refer to the same group
    #[must_use]
    pub fn same_group(&self, other: &Self) -> bool {
        match (&self.group_id, &other.group_id) {
            (Some(a), Some(b)) => a == b,
            _ => self.account_id == other.account_id && self.name == other.name,
        }
    }
}

impl fmt::Display for TargetGroupRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.group_id {
            Some(id) => write!(f, "{} ({id})", self.name),
            None => write!(f, "{} (planned)", self.name),
        }
    }
}

/// Allowed source of a rule
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum RuleSource {
    /// Another security group
    Group(TargetGroupRef),
    /// CIDR block
    Cidr(String),
}

impl RuleSource {
    fn equivalent(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Group(a), Self::Group(b)) => a.same_group(b),
            (Self::Cidr(a), Self::Cidr(b)) => a == b,
            _ => false,
        }
    }
}

/// One rewritten ingress rule
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IngressRule {
    /// Protocol name or number
    pub protocol: String,
    /// First port
    pub from_port: Option<i32>,
    /// Last port
    pub to_port: Option<i32>,
    /// Allowed source
    pub source: RuleSource,
}

impl IngressRule {
    /// Structural equivalence on protocol, port range and source
    #[must_use]
    pub fn is_equivalent(&self, other: &Self) -> bool {
        self.protocol == other.protocol
            && self.from_port == other.from_port
            && self.to_port == other.to_port
            && self.source.equivalent(&other.source)
    }

    /// Render as a single-source provider permission
    #[must_use]
    pub fn to_permission(&self) -> IpPermission {
        let permission = IpPermission::new(self.protocol.clone(), self.from_port, self.to_port);
        match &self.source {
            RuleSource::Group(group) => permission.with_group_pair(UserIdGroupPair {
                user_id: group.account_id.clone(),
                group_id: group.group_id.clone().unwrap_or_default(),
                group_name: Some(group.name.clone()),
                vpc_id: None,
            }),
            RuleSource::Cidr(cidr) => permission.with_ip_range(cidr.clone()),
        }
    }
}

impl fmt::Display for IngressRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ", self.protocol)?;
        match (self.from_port, self.to_port) {
            (Some(from), Some(to)) if from == to => write!(f, "{from}")?,
            (Some(from), Some(to)) => write!(f, "{from}-{to}")?,
            _ => write!(f, "*")?,
        }
        match &self.source {
            RuleSource::Group(group) => write!(f, " from {group}"),
            RuleSource::Cidr(cidr) => write!(f, " from {cidr}"),
        }
    }
}
