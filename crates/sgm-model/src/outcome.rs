//! Per-reference resolution outcomes

use crate::group::{SecurityGroup, SecurityGroupDescriptor};
use crate::reference::{ReferenceKey, SecurityGroupReference};
use crate::rule::TargetGroupRef;
use serde::{Deserialize, Serialize};

/// Where a planned group lands: one group per slot in the target
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GroupSlot {
    /// Account name
    pub account_name: String,
    /// Group name
    pub name: String,
    /// VPC
    pub vpc_id: Option<String>,
}

/// A group the engine will create (or created, once `group` is set)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlannedGroup {
    /// Target-side identity; `group_id` is filled in on creation
    pub target: TargetGroupRef,
    /// Creation request
    pub descriptor: SecurityGroupDescriptor,
    /// Created group; stays `None` in dry runs
    pub group: Option<SecurityGroup>,
    /// An earlier plan in the same run creates this slot
    #[serde(default)]
    pub shared: bool,
}

impl PlannedGroup {
    /// Create plan
    #[inline]
    #[must_use]
    pub fn new(target: TargetGroupRef, descriptor: SecurityGroupDescriptor) -> Self {
        Self {
            target,
            descriptor,
            group: None,
            shared: false,
        }
    }

    /// Target slot this plan creates
    #[must_use]
    pub fn slot(&self) -> GroupSlot {
        GroupSlot {
            account_name: self.descriptor.account_name.clone(),
            name: self.descriptor.name.clone(),
            vpc_id: self.descriptor.vpc_id.clone(),
        }
    }

    /// Defer to the plan that first claimed this slot
    pub fn share(&mut self, first: &TargetGroupRef) {
        self.target = first.clone();
        self.shared = true;
    }

    /// Record the group returned by the provider
    pub fn mark_created(&mut self, group: SecurityGroup) {
        self.target.group_id = Some(group.id.clone());
        self.group = Some(group);
    }
}

/// Decision taken for one reference (or for the migration target itself)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ResolutionOutcome {
    /// Equivalent group already exists in the target
    Reused(SecurityGroup),
    /// Group is (to be) created in the target
    Created(PlannedGroup),
    /// Not replicated, without warning
    Skipped {
        /// Why the reference was skipped
        reason: String,
    },
    /// Not replicated, reported to the caller
    Warned {
        /// Explanation shown to the caller
        reason: String,
    },
    /// Hard failure; halts the run before any mutation
    Errored {
        /// Why the reference cannot be migrated
        reason: String,
    },
}

impl ResolutionOutcome {
    /// Target-side identity for reused and created groups
    #[must_use]
    pub fn target_ref(&self) -> Option<TargetGroupRef> {
        match self {
            Self::Reused(group) => Some(group.target_ref()),
            Self::Created(planned) => Some(planned.target.clone()),
            _ => None,
        }
    }

    /// Existing or created provider group, if any
    #[must_use]
    pub fn group(&self) -> Option<&SecurityGroup> {
        match self {
            Self::Reused(group) => Some(group),
            Self::Created(planned) => planned.group.as_ref(),
            _ => None,
        }
    }

    /// Whether this outcome halts the run
    #[inline]
    #[must_use]
    pub fn is_errored(&self) -> bool {
        matches!(self, Self::Errored { .. })
    }

    /// Short outcome label for logs
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Reused(_) => "reused",
            Self::Created(_) => "created",
            Self::Skipped { .. } => "skipped",
            Self::Warned { .. } => "warned",
            Self::Errored { .. } => "errored",
        }
    }
}

/// A reference together with its outcome
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedReference {
    /// The reference as found on the source side
    pub reference: SecurityGroupReference,
    /// Name used when reporting this reference
    pub display_name: String,
    /// Decision
    pub outcome: ResolutionOutcome,
}

impl ResolvedReference {
    /// Create resolved reference
    #[inline]
    #[must_use]
    pub fn new(
        reference: SecurityGroupReference,
        display_name: impl Into<String>,
        outcome: ResolutionOutcome,
    ) -> Self {
        Self {
            reference,
            display_name: display_name.into(),
            outcome,
        }
    }

    /// Deduplication key of the underlying reference
    #[inline]
    #[must_use]
    pub fn key(&self) -> ReferenceKey {
        self.reference.key()
    }
}
