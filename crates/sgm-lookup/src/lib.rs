//! SGM Lookup - the security group lookup capability
//!
//! The migration engine never talks to the provider directly. It consumes
//! one [`SecurityGroupLookup`] per side (source and target), each scoped to
//! a region and able to see every account the platform manages.
//!
//! - [`SecurityGroupLookup`]: read, create and mutate security groups
//! - [`VpcDescriber`]: display names for VPCs, used for log context only
//! - [`CachedLookup`]: memoizes account identity answers for the lifetime
//!   of one lookup instance

#![warn(unreachable_pub)]

pub mod cache;
pub mod error;

pub use cache::CachedLookup;
pub use error::LookupError;

use async_trait::async_trait;
use sgm_model::{AccountCredentials, IngressRule, SecurityGroup, SecurityGroupDescriptor};
use std::sync::Arc;

/// Region-scoped read/create/mutate access to security groups
///
/// Implementations wrap provider API calls; every method may fail with a
/// [`LookupError`] which the engine propagates unchanged.
#[async_trait]
pub trait SecurityGroupLookup: Send + Sync {
    /// Exact-name lookup in `account_name`, scoped to `vpc_id` when given
    async fn get_security_group_by_name(
        &self,
        account_name: &str,
        group_name: &str,
        vpc_id: Option<&str>,
    ) -> Result<Option<SecurityGroup>, LookupError>;

    /// Credentials for a provider account id; `None` means unmanaged
    async fn get_credentials_for_id(
        &self,
        account_id: &str,
    ) -> Result<Option<AccountCredentials>, LookupError>;

    /// Display name for an account id, falling back to the id itself
    async fn get_account_name_for_id(&self, account_id: &str) -> Result<String, LookupError>;

    /// Whether the platform manages `account_id`
    async fn account_id_exists(&self, account_id: &str) -> Result<bool, LookupError>;

    /// Create a group. Not idempotent: callers check for an existing group first.
    async fn create_security_group(
        &self,
        descriptor: &SecurityGroupDescriptor,
    ) -> Result<SecurityGroup, LookupError>;

    /// Add ingress rules to `group` in one batched call
    async fn add_ingress(
        &self,
        account_name: &str,
        group: &SecurityGroup,
        rules: &[IngressRule],
    ) -> Result<(), LookupError>;
}

#[async_trait]
impl<T: SecurityGroupLookup + ?Sized> SecurityGroupLookup for Arc<T> {
    async fn get_security_group_by_name(
        &self,
        account_name: &str,
        group_name: &str,
        vpc_id: Option<&str>,
    ) -> Result<Option<SecurityGroup>, LookupError> {
        (**self)
            .get_security_group_by_name(account_name, group_name, vpc_id)
            .await
    }

    async fn get_credentials_for_id(
        &self,
        account_id: &str,
    ) -> Result<Option<AccountCredentials>, LookupError> {
        (**self).get_credentials_for_id(account_id).await
    }

    async fn get_account_name_for_id(&self, account_id: &str) -> Result<String, LookupError> {
        (**self).get_account_name_for_id(account_id).await
    }

    async fn account_id_exists(&self, account_id: &str) -> Result<bool, LookupError> {
        (**self).account_id_exists(account_id).await
    }

    async fn create_security_group(
        &self,
        descriptor: &SecurityGroupDescriptor,
    ) -> Result<SecurityGroup, LookupError> {
        (**self).create_security_group(descriptor).await
    }

    async fn add_ingress(
        &self,
        account_name: &str,
        group: &SecurityGroup,
        rules: &[IngressRule],
    ) -> Result<(), LookupError> {
        (**self).add_ingress(account_name, group, rules).await
    }
}

/// Describes VPCs in one region
///
/// Only used to enrich log messages; answers never change a resolution.
#[async_trait]
pub trait VpcDescriber: Send + Sync {
    /// Value of the VPC's `Name` tag, if any
    async fn vpc_name(&self, vpc_id: &str) -> Result<Option<String>, LookupError>;
}
