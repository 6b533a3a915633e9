//! Account identity caching using moka
//!
//! Account names, credentials and managed-account answers are stable for
//! the length of a migration and are asked for repeatedly (once per
//! reference). Group reads and all mutations pass straight through: the
//! engine relies on seeing groups it just created.

use crate::{LookupError, SecurityGroupLookup};
use async_trait::async_trait;
use moka::future::Cache;
use sgm_model::{AccountCredentials, IngressRule, SecurityGroup, SecurityGroupDescriptor};
use std::time::Duration;

/// Lookup decorator memoizing account identity answers
///
/// The cache lives exactly as long as this value.
#[derive(Debug)]
pub struct CachedLookup<L> {
    inner: L,
    account_names: Cache<String, String>,
    credentials: Cache<String, Option<AccountCredentials>>,
    managed: Cache<String, bool>,
}

impl<L: SecurityGroupLookup> CachedLookup<L> {
    /// Wrap `inner` with bounded caches
    #[must_use]
    pub fn new(inner: L, max_capacity: u64) -> Self {
        Self {
            inner,
            account_names: Cache::new(max_capacity),
            credentials: Cache::new(max_capacity),
            managed: Cache::new(max_capacity),
        }
    }

    /// Wrap `inner` with bounded caches whose entries expire after `ttl`
    #[must_use]
    pub fn with_ttl(inner: L, max_capacity: u64, ttl: Duration) -> Self {
        Self {
            inner,
            account_names: Cache::builder()
                .max_capacity(max_capacity)
                .time_to_live(ttl)
                .build(),
            credentials: Cache::builder()
                .max_capacity(max_capacity)
                .time_to_live(ttl)
                .build(),
            managed: Cache::builder()
                .max_capacity(max_capacity)
                .time_to_live(ttl)
                .build(),
        }
    }

    /// Wrapped lookup
    #[inline]
    pub fn inner(&self) -> &L {
        &self.inner
    }

    /// Drop every cached answer
    pub fn invalidate_all(&self) {
        self.account_names.invalidate_all();
        self.credentials.invalidate_all();
        self.managed.invalidate_all();
    }
}

#[async_trait]
impl<L: SecurityGroupLookup> SecurityGroupLookup for CachedLookup<L> {
    async fn get_security_group_by_name(
        &self,
        account_name: &str,
        group_name: &str,
        vpc_id: Option<&str>,
    ) -> Result<Option<SecurityGroup>, LookupError> {
        self.inner
            .get_security_group_by_name(account_name, group_name, vpc_id)
            .await
    }

    async fn get_credentials_for_id(
        &self,
        account_id: &str,
    ) -> Result<Option<AccountCredentials>, LookupError> {
        self.credentials
            .try_get_with(
                account_id.to_string(),
                self.inner.get_credentials_for_id(account_id),
            )
            .await
            .map_err(|e| (*e).clone())
    }

    async fn get_account_name_for_id(&self, account_id: &str) -> Result<String, LookupError> {
        self.account_names
            .try_get_with(
                account_id.to_string(),
                self.inner.get_account_name_for_id(account_id),
            )
            .await
            .map_err(|e| (*e).clone())
    }

    async fn account_id_exists(&self, account_id: &str) -> Result<bool, LookupError> {
        self.managed
            .try_get_with(account_id.to_string(), self.inner.account_id_exists(account_id))
            .await
            .map_err(|e| (*e).clone())
    }

    async fn create_security_group(
        &self,
        descriptor: &SecurityGroupDescriptor,
    ) -> Result<SecurityGroup, LookupError> {
        tracing::debug!(name = %descriptor.name, account = %descriptor.account_name, "create passes through cache");
        self.inner.create_security_group(descriptor).await
    }

    async fn add_ingress(
        &self,
        account_name: &str,
        group: &SecurityGroup,
        rules: &[IngressRule],
    ) -> Result<(), LookupError> {
        self.inner.add_ingress(account_name, group, rules).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug, Default)]
    struct CountingLookup {
        identity_calls: AtomicUsize,
        group_calls: AtomicUsize,
    }

    #[async_trait]
    impl SecurityGroupLookup for CountingLookup {
        async fn get_security_group_by_name(
            &self,
            _account_name: &str,
            _group_name: &str,
            _vpc_id: Option<&str>,
        ) -> Result<Option<SecurityGroup>, LookupError> {
            self.group_calls.fetch_add(1, Ordering::SeqCst);
            Ok(None)
        }

        async fn get_credentials_for_id(
            &self,
            account_id: &str,
        ) -> Result<Option<AccountCredentials>, LookupError> {
            self.identity_calls.fetch_add(1, Ordering::SeqCst);
            Ok(Some(AccountCredentials::new("prod", account_id)))
        }

        async fn get_account_name_for_id(&self, account_id: &str) -> Result<String, LookupError> {
            self.identity_calls.fetch_add(1, Ordering::SeqCst);
            if account_id == "broken" {
                return Err(LookupError::transport("DescribeAccounts", "timeout"));
            }
            Ok(format!("name-{account_id}"))
        }

        async fn account_id_exists(&self, _account_id: &str) -> Result<bool, LookupError> {
            self.identity_calls.fetch_add(1, Ordering::SeqCst);
            Ok(true)
        }

        async fn create_security_group(
            &self,
            descriptor: &SecurityGroupDescriptor,
        ) -> Result<SecurityGroup, LookupError> {
            Ok(SecurityGroup::new("sg-new", descriptor.name.clone(), "222"))
        }

        async fn add_ingress(
            &self,
            _account_name: &str,
            _group: &SecurityGroup,
            _rules: &[IngressRule],
        ) -> Result<(), LookupError> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn identity_answers_are_cached() {
        let lookup = CachedLookup::new(CountingLookup::default(), 100);

        for _ in 0..3 {
            assert_eq!(lookup.get_account_name_for_id("222").await.unwrap(), "name-222");
            assert!(lookup.account_id_exists("222").await.unwrap());
            assert!(lookup.get_credentials_for_id("222").await.unwrap().is_some());
        }

        assert_eq!(lookup.inner().identity_calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn group_reads_are_not_cached() {
        let lookup = CachedLookup::new(CountingLookup::default(), 100);

        for _ in 0..2 {
            lookup
                .get_security_group_by_name("prod", "app", None)
                .await
                .unwrap();
        }

        assert_eq!(lookup.inner().group_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn failures_propagate_and_are_retried() {
        let lookup = CachedLookup::new(CountingLookup::default(), 100);

        let err = lookup.get_account_name_for_id("broken").await.unwrap_err();
        assert!(err.is_transport());
        let _ = lookup.get_account_name_for_id("broken").await;

        assert_eq!(lookup.inner().identity_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn invalidate_forces_refetch() {
        let lookup = CachedLookup::with_ttl(CountingLookup::default(), 100, Duration::from_secs(60));

        lookup.account_id_exists("222").await.unwrap();
        lookup.invalidate_all();
        lookup.account_id_exists("222").await.unwrap();

        assert_eq!(lookup.inner().identity_calls.load(Ordering::SeqCst), 2);
    }
}
