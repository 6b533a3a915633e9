//! Account and location descriptors

use serde::{Deserialize, Serialize};
use std::fmt;

/// Resolved account identity
///
/// `name` is the platform's account name (used by the lookup capability),
/// `account_id` the provider's numeric owner id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AccountCredentials {
    /// Platform account name
    pub name: String,
    /// Provider account id
    pub account_id: String,
}

impl AccountCredentials {
    /// Create new credentials
    #[inline]
    #[must_use]
    pub fn new(name: impl Into<String>, account_id: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            account_id: account_id.into(),
        }
    }
}

impl fmt::Display for AccountCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.account_id)
    }
}

/// A security group slot in one account, region and (optionally) VPC
///
/// Created by the caller per migration request and never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecurityGroupLocation {
    /// Owning account
    pub credentials: AccountCredentials,
    /// Provider region
    pub region: String,
    /// Group name
    pub name: Option<String>,
    /// VPC the group lives in
    pub vpc_id: Option<String>,
    /// Provider group id, when already known
    pub group_id: Option<String>,
}

impl SecurityGroupLocation {
    /// Create location without name, VPC or id
    #[inline]
    #[must_use]
    pub fn new(credentials: AccountCredentials, region: impl Into<String>) -> Self {
        Self {
            credentials,
            region: region.into(),
            name: None,
            vpc_id: None,
            group_id: None,
        }
    }

    /// With group name
    #[inline]
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// With VPC id
    #[inline]
    #[must_use]
    pub fn with_vpc_id(mut self, vpc_id: impl Into<String>) -> Self {
        self.vpc_id = Some(vpc_id.into());
        self
    }

    /// With group id
    #[inline]
    #[must_use]
    pub fn with_group_id(mut self, group_id: impl Into<String>) -> Self {
        self.group_id = Some(group_id.into());
        self
    }

    /// Account name of the owning credentials
    #[inline]
    #[must_use]
    pub fn account_name(&self) -> &str {
        &self.credentials.name
    }

    /// Account id of the owning credentials
    #[inline]
    #[must_use]
    pub fn account_id(&self) -> &str {
        &self.credentials.account_id
    }
}

impl fmt::Display for SecurityGroupLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}@{}/{}",
            self.name.as_deref().unwrap_or("<unnamed>"),
            self.credentials.name,
            self.region
        )?;
        if let Some(vpc_id) = &self.vpc_id {
            write!(f, "/{vpc_id}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn location_builder() {
        let location = SecurityGroupLocation::new(AccountCredentials::new("test", "111"), "us-east-1")
            .with_name("app")
            .with_vpc_id("vpc-1");

        assert_eq!(location.account_name(), "test");
        assert_eq!(location.account_id(), "111");
        assert_eq!(location.to_string(), "app@test/us-east-1/vpc-1");
    }

    #[test]
    fn unnamed_location_display() {
        let location = SecurityGroupLocation::new(AccountCredentials::new("prod", "222"), "eu-west-1");
        assert_eq!(location.to_string(), "<unnamed>@prod/eu-west-1");
    }
}
