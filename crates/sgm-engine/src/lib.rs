//! SGM Engine - security group migration
//!
//! Replicates a security group, together with the groups its ingress
//! rules reference, from a source account/region into a target
//! account/region:
//! - resolves each referenced group to reuse, create, skip, warn or error
//! - halts before any mutation when a dependency must not be created
//! - adds only the ingress rules the target group does not already have
//!
//! # Example
//!
//! ```rust,ignore
//! use sgm_engine::{MigrationConfig, MigrationRequest, SecurityGroupMigrator};
//!
//! # async fn example(source_lookup: &dyn sgm_lookup::SecurityGroupLookup,
//! #                  target_lookup: &dyn sgm_lookup::SecurityGroupLookup,
//! #                  source: sgm_model::SecurityGroupLocation,
//! #                  target: sgm_model::SecurityGroupLocation) -> Result<(), sgm_engine::MigrationError> {
//! let migrator = SecurityGroupMigrator::new(MigrationConfig::new());
//! let request = MigrationRequest::new(&source, &target, source_lookup, target_lookup).dry_run(true);
//!
//! let result = migrator.generate_results(request).await?;
//! println!("{} groups to create", result.created.len());
//! # Ok(())
//! # }
//! ```

#![warn(unreachable_pub)]

pub mod config;
pub mod error;
pub mod orchestrator;
pub mod policy;
pub mod reconciler;
pub mod resolver;
pub mod telemetry;

pub use config::{MigrationConfig, DEFAULT_ELB_ACCOUNT_ID};
pub use error::{ConfigError, MigrationError, TelemetryError};
pub use orchestrator::{MigrationRequest, SecurityGroupMigrator};
pub use policy::{DefaultMigrationPolicy, MigrationPolicy};
pub use reconciler::IngressReconciler;
pub use resolver::ReferenceResolver;
pub use telemetry::{init_tracing, LogConfig};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for running migrations
    pub use crate::{
        DefaultMigrationPolicy, MigrationConfig, MigrationError, MigrationPolicy,
        MigrationRequest, SecurityGroupMigrator,
    };
    pub use sgm_lookup::{CachedLookup, LookupError, SecurityGroupLookup, VpcDescriber};
    pub use sgm_model::{
        AccountCredentials, MigrationResult, ResolutionOutcome, SecurityGroupLocation,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
