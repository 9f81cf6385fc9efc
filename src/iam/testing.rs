//! In-memory [`IamApi`] for unit tests.

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use anyhow::{bail, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::IamApi;
use crate::role::Role;

/// A recorded call against the fake
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Call {
    ListRoles,
    FetchLastUsed(String),
    DetachManagedPolicies(String),
    DeleteInlinePolicies(String),
    DeleteRole(String),
}

/// Fake IAM account holding fully-enriched roles
#[derive(Default)]
pub struct FakeIam {
    roles: Vec<Role>,
    failures: HashSet<Call>,
    stalled: HashSet<String>,
    latency: Option<Duration>,
    listing_latency: Option<Duration>,
    calls: Mutex<Vec<Call>>,
    deleted: Mutex<HashSet<String>>,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
}

impl FakeIam {
    pub fn new(roles: Vec<Role>) -> Self {
        Self {
            roles,
            ..Self::default()
        }
    }

    /// Make the given call return an error
    pub fn failing(mut self, call: Call) -> Self {
        self.failures.insert(call);
        self
    }

    /// Make `fetch_last_used` for this role never complete
    pub fn stalled(mut self, role_name: &str) -> Self {
        self.stalled.insert(role_name.to_string());
        self
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Delay `list_roles` by this much
    pub fn with_listing_latency(mut self, latency: Duration) -> Self {
        self.listing_latency = Some(latency);
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn deleted(&self) -> HashSet<String> {
        self.deleted.lock().unwrap().clone()
    }

    /// Highest number of concurrent `fetch_last_used` calls observed
    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }

    fn record(&self, call: Call) -> Result<()> {
        self.calls.lock().unwrap().push(call.clone());
        if self.failures.contains(&call) {
            bail!("simulated error: {:?}", call);
        }
        Ok(())
    }
}

#[async_trait]
impl IamApi for FakeIam {
    async fn list_roles(&self) -> Result<Vec<Role>> {
        if let Some(latency) = self.listing_latency {
            tokio::time::sleep(latency).await;
        }
        self.record(Call::ListRoles)?;
        let deleted = self.deleted();

        Ok(self
            .roles
            .iter()
            .filter(|r| !deleted.contains(&r.name))
            .map(|r| r.clone().with_last_used(None))
            .collect())
    }

    async fn fetch_last_used(&self, role_name: &str) -> Result<Option<DateTime<Utc>>> {
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(current, Ordering::SeqCst);

        if self.stalled.contains(role_name) {
            std::future::pending::<()>().await;
        }
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        self.record(Call::FetchLastUsed(role_name.to_string()))?;

        Ok(self
            .roles
            .iter()
            .find(|r| r.name == role_name)
            .and_then(|r| r.last_used_at))
    }

    async fn detach_managed_policies(&self, role_name: &str) -> Result<()> {
        self.record(Call::DetachManagedPolicies(role_name.to_string()))
    }

    async fn delete_inline_policies(&self, role_name: &str) -> Result<()> {
        self.record(Call::DeleteInlinePolicies(role_name.to_string()))
    }

    async fn delete_role(&self, role_name: &str) -> Result<()> {
        self.record(Call::DeleteRole(role_name.to_string()))?;
        self.deleted.lock().unwrap().insert(role_name.to_string());
        Ok(())
    }
}

/// The three-role account used across tests: used 5 days ago, used 100
/// days ago, never used
pub fn sample_roles(now: DateTime<Utc>) -> Vec<Role> {
    use chrono::Duration as ChronoDuration;

    vec![
        Role::new(
            "ActiveRole",
            "arn:aws:iam::123456789012:role/ActiveRole",
            now - ChronoDuration::days(365),
        )
        .with_description("Recently used role")
        .with_last_used(Some(now - ChronoDuration::days(5))),
        Role::new(
            "InactiveRole",
            "arn:aws:iam::123456789012:role/InactiveRole",
            now - ChronoDuration::days(730),
        )
        .with_description("Role unused for a long time")
        .with_last_used(Some(now - ChronoDuration::days(100))),
        Role::new(
            "NeverUsedRole",
            "arn:aws:iam::123456789012:role/NeverUsedRole",
            now - ChronoDuration::days(180),
        )
        .with_description("Role that was never used"),
    ]
}
