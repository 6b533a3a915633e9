//! Testing utilities for the SGM workspace
//!
//! Shared test doubles and fixtures.

#![allow(missing_docs)]

use async_trait::async_trait;
use parking_lot::Mutex;
use sgm_lookup::{LookupError, SecurityGroupLookup};
use sgm_model::{
    AccountCredentials, IngressRule, SecurityGroup, SecurityGroupDescriptor, SecurityGroupLocation,
};
use std::collections::{HashMap, VecDeque};

pub const OP_GET_BY_NAME: &str = "get_security_group_by_name";
pub const OP_CREATE: &str = "create_security_group";
pub const OP_ADD_INGRESS: &str = "add_ingress";

/// A call observed by [`InMemoryLookup`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LookupCall {
    GetSecurityGroupByName {
        account_name: String,
        group_name: String,
        vpc_id: Option<String>,
    },
    GetCredentialsForId(String),
    GetAccountNameForId(String),
    AccountIdExists(String),
    CreateSecurityGroup(SecurityGroupDescriptor),
    AddIngress {
        account_name: String,
        group_id: String,
        rules: Vec<IngressRule>,
    },
}

impl LookupCall {
    pub fn is_mutation(&self) -> bool {
        matches!(self, Self::CreateSecurityGroup(_) | Self::AddIngress { .. })
    }
}

#[derive(Debug, Default)]
struct State {
    accounts: Vec<AccountCredentials>,
    groups: Vec<(String, SecurityGroup)>,
    queued: HashMap<(String, String), VecDeque<Option<SecurityGroup>>>,
    failures: HashMap<&'static str, LookupError>,
    calls: Vec<LookupCall>,
    next_id: usize,
}

/// Stateful in-memory lookup
///
/// Created groups and added rules are stored, so later lookups observe
/// them. Queued responses for a `(account, name)` pair are served first,
/// one per call, before falling back to stored groups.
#[derive(Debug, Default)]
pub struct InMemoryLookup {
    state: Mutex<State>,
}

impl InMemoryLookup {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_account(self, credentials: &AccountCredentials) -> Self {
        self.state.lock().accounts.push(credentials.clone());
        self
    }

    pub fn with_group(self, account_name: &str, group: SecurityGroup) -> Self {
        self.state
            .lock()
            .groups
            .push((account_name.to_string(), group));
        self
    }

    /// Fail every call of `operation` with `error`
    pub fn fail_on(self, operation: &'static str, error: LookupError) -> Self {
        self.state.lock().failures.insert(operation, error);
        self
    }

    /// Serve `response` for the next lookup of `group_name` in `account_name`
    pub fn queue_response(&self, account_name: &str, group_name: &str, response: Option<SecurityGroup>) {
        self.state
            .lock()
            .queued
            .entry((account_name.to_string(), group_name.to_string()))
            .or_default()
            .push_back(response);
    }

    pub fn calls(&self) -> Vec<LookupCall> {
        self.state.lock().calls.clone()
    }

    pub fn mutations(&self) -> Vec<LookupCall> {
        self.calls().into_iter().filter(LookupCall::is_mutation).collect()
    }

    pub fn created(&self) -> Vec<SecurityGroupDescriptor> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                LookupCall::CreateSecurityGroup(descriptor) => Some(descriptor),
                _ => None,
            })
            .collect()
    }

    /// `(group id, rules)` for every `add_ingress` call
    pub fn ingress_calls(&self) -> Vec<(String, Vec<IngressRule>)> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                LookupCall::AddIngress { group_id, rules, .. } => Some((group_id, rules)),
                _ => None,
            })
            .collect()
    }

    /// Stored group by account and name, ignoring VPC
    pub fn group(&self, account_name: &str, group_name: &str) -> Option<SecurityGroup> {
        self.state
            .lock()
            .groups
            .iter()
            .find(|(account, group)| account == account_name && group.name == group_name)
            .map(|(_, group)| group.clone())
    }

    fn record(&self, call: LookupCall, operation: &'static str) -> Result<(), LookupError> {
        let mut state = self.state.lock();
        state.calls.push(call);
        match state.failures.get(operation) {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl SecurityGroupLookup for InMemoryLookup {
    async fn get_security_group_by_name(
        &self,
        account_name: &str,
        group_name: &str,
        vpc_id: Option<&str>,
    ) -> Result<Option<SecurityGroup>, LookupError> {
        self.record(
            LookupCall::GetSecurityGroupByName {
                account_name: account_name.to_string(),
                group_name: group_name.to_string(),
                vpc_id: vpc_id.map(str::to_string),
            },
            OP_GET_BY_NAME,
        )?;

        let mut state = self.state.lock();
        let key = (account_name.to_string(), group_name.to_string());
        if let Some(response) = state.queued.get_mut(&key).and_then(VecDeque::pop_front) {
            return Ok(response);
        }

        Ok(state
            .groups
            .iter()
            .find(|(account, group)| {
                account == account_name
                    && group.name == group_name
                    && vpc_id.map_or(true, |vpc| group.vpc_id.as_deref() == Some(vpc))
            })
            .map(|(_, group)| group.clone()))
    }

    async fn get_credentials_for_id(
        &self,
        account_id: &str,
    ) -> Result<Option<AccountCredentials>, LookupError> {
        self.record(LookupCall::GetCredentialsForId(account_id.to_string()), "get_credentials_for_id")?;
        Ok(self
            .state
            .lock()
            .accounts
            .iter()
            .find(|a| a.account_id == account_id)
            .cloned())
    }

    async fn get_account_name_for_id(&self, account_id: &str) -> Result<String, LookupError> {
        self.record(LookupCall::GetAccountNameForId(account_id.to_string()), "get_account_name_for_id")?;
        Ok(self
            .state
            .lock()
            .accounts
            .iter()
            .find(|a| a.account_id == account_id)
            .map_or_else(|| account_id.to_string(), |a| a.name.clone()))
    }

    async fn account_id_exists(&self, account_id: &str) -> Result<bool, LookupError> {
        self.record(LookupCall::AccountIdExists(account_id.to_string()), "account_id_exists")?;
        Ok(self
            .state
            .lock()
            .accounts
            .iter()
            .any(|a| a.account_id == account_id))
    }

    async fn create_security_group(
        &self,
        descriptor: &SecurityGroupDescriptor,
    ) -> Result<SecurityGroup, LookupError> {
        self.record(LookupCall::CreateSecurityGroup(descriptor.clone()), OP_CREATE)?;

        let mut state = self.state.lock();
        state.next_id += 1;
        let owner_id = state
            .accounts
            .iter()
            .find(|a| a.name == descriptor.account_name)
            .map_or_else(|| descriptor.account_name.clone(), |a| a.account_id.clone());

        let mut group = SecurityGroup::new(
            format!("sg-new-{}", state.next_id),
            descriptor.name.clone(),
            owner_id,
        )
        .with_description(descriptor.description.clone());
        group.vpc_id = descriptor.vpc_id.clone();

        state
            .groups
            .push((descriptor.account_name.clone(), group.clone()));
        Ok(group)
    }

    async fn add_ingress(
        &self,
        account_name: &str,
        group: &SecurityGroup,
        rules: &[IngressRule],
    ) -> Result<(), LookupError> {
        self.record(
            LookupCall::AddIngress {
                account_name: account_name.to_string(),
                group_id: group.id.clone(),
                rules: rules.to_vec(),
            },
            OP_ADD_INGRESS,
        )?;

        let mut state = self.state.lock();
        if let Some((_, stored)) = state.groups.iter_mut().find(|(_, g)| g.id == group.id) {
            stored
                .ingress
                .extend(rules.iter().map(IngressRule::to_permission));
        }
        Ok(())
    }
}

/// Location of `name` in `credentials`' account
pub fn location(
    credentials: &AccountCredentials,
    region: &str,
    name: &str,
    vpc_id: &str,
) -> SecurityGroupLocation {
    SecurityGroupLocation::new(credentials.clone(), region)
        .with_name(name)
        .with_vpc_id(vpc_id)
}
