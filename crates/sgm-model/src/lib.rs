//! SGM Model - security group migration value types
//!
//! Immutable descriptors shared by the lookup capability and the
//! migration engine:
//! - [`SecurityGroupLocation`]: "a security group slot" in one account/region/VPC
//! - [`SecurityGroup`] and [`IpPermission`]: provider-side group snapshots
//! - [`SecurityGroupReference`]: a group named inside another group's ingress
//! - [`IngressRule`]: a flattened, rewritten permission used for deduplication
//! - [`ResolvedReference`] and [`MigrationResult`]: per-reference decisions
//!   and the aggregate outcome of one migration run
//!
//! # Example
//!
//! ```rust
//! use sgm_model::{collect_references, IpPermission, SecurityGroup, UserIdGroupPair};
//!
//! let group = SecurityGroup::new("sg-1", "app1", "111111111111").with_permission(
//!     IpPermission::tcp(80, 80).with_group_pair(UserIdGroupPair::new("111111111111", "sg-2", "app2")),
//! );
//!
//! let references = collect_references(&group);
//! assert_eq!(references.len(), 1);
//! assert_eq!(references[0].display_name(), "app2");
//! ```

#![warn(unreachable_pub)]

pub mod group;
pub mod location;
pub mod outcome;
pub mod reference;
pub mod result;
pub mod rule;

pub use group::{IpPermission, IpRange, SecurityGroup, SecurityGroupDescriptor, UserIdGroupPair};
pub use location::{AccountCredentials, SecurityGroupLocation};
pub use outcome::{GroupSlot, PlannedGroup, ResolutionOutcome, ResolvedReference};
pub use reference::{
    application_name, collect_references, PortRange, ReferenceKey, SecurityGroupReference,
};
pub use result::{
    IngressUpdates, MigratedGroup, MigrationFailure, MigrationResult, MigrationWarning,
    SkippedGroup,
};
pub use rule::{IngressRule, RuleSource, TargetGroupRef};

/// Protocol marker AWS uses for "all traffic"
pub const ALL_PROTOCOLS: &str = "-1";
