//! IAM Access
//!
//! The capability the role operations consume, and the AWS SDK backed
//! implementation. Operations take an `Arc<dyn IamApi>` so tests can
//! swap in an in-memory fake.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::role::Role;

mod aws;

#[cfg(test)]
pub mod testing;

pub use aws::AwsIamClient;

/// IAM operations needed to list, classify and delete roles
#[async_trait]
pub trait IamApi: Send + Sync {
    /// List every role in the account (all pages), without last-used data
    async fn list_roles(&self) -> Result<Vec<Role>>;

    /// Last activity of a single role; `None` if it was never used
    async fn fetch_last_used(&self, role_name: &str) -> Result<Option<DateTime<Utc>>>;

    /// Detach all managed policies, stopping at the first failure
    async fn detach_managed_policies(&self, role_name: &str) -> Result<()>;

    /// Delete all inline policies, stopping at the first failure
    async fn delete_inline_policies(&self, role_name: &str) -> Result<()>;

    /// Delete the role itself (must hold no policies)
    async fn delete_role(&self, role_name: &str) -> Result<()>;
}
