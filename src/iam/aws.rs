//! AWS IAM client built on `aws-sdk-iam`.

use anyhow::{Context, Result};
use async_trait::async_trait;
use aws_config::SdkConfig;
use aws_sdk_iam::primitives::DateTime as AwsDateTime;
use aws_sdk_iam::Client;
use chrono::{DateTime, Utc};
use tracing::debug;

use super::IamApi;
use crate::role::Role;

/// Production [`IamApi`] talking to the IAM service
pub struct AwsIamClient {
    client: Client,
}

impl AwsIamClient {
    pub fn new(config: &SdkConfig) -> Self {
        Self {
            client: Client::new(config),
        }
    }

    pub fn from_client(client: Client) -> Self {
        Self { client }
    }
}

fn to_utc(ts: &AwsDateTime) -> Result<DateTime<Utc>> {
    DateTime::<Utc>::from_timestamp(ts.secs(), ts.subsec_nanos())
        .with_context(|| format!("Timestamp out of range: {}", ts))
}

#[async_trait]
impl IamApi for AwsIamClient {
    async fn list_roles(&self) -> Result<Vec<Role>> {
        let mut roles = Vec::with_capacity(100);
        let mut pages = self.client.list_roles().into_paginator().send();

        while let Some(page) = pages.next().await {
            let page = page.context("Failed to list roles")?;

            for r in page.roles() {
                let role = Role::new(r.role_name(), r.arn(), to_utc(r.create_date())?)
                    .with_description(r.description().unwrap_or_default());
                roles.push(role);
            }
        }

        debug!("Listed {} roles", roles.len());
        Ok(roles)
    }

    async fn fetch_last_used(&self, role_name: &str) -> Result<Option<DateTime<Utc>>> {
        let output = self
            .client
            .get_role()
            .role_name(role_name)
            .send()
            .await
            .with_context(|| format!("Failed to get role {}", role_name))?;

        output
            .role()
            .and_then(|r| r.role_last_used())
            .and_then(|u| u.last_used_date())
            .map(to_utc)
            .transpose()
    }

    async fn detach_managed_policies(&self, role_name: &str) -> Result<()> {
        let mut pages = self
            .client
            .list_attached_role_policies()
            .role_name(role_name)
            .into_paginator()
            .send();

        while let Some(page) = pages.next().await {
            let page = page.with_context(|| {
                format!("Failed to list attached policies for role {}", role_name)
            })?;

            for policy in page.attached_policies() {
                let Some(policy_arn) = policy.policy_arn() else {
                    continue;
                };

                self.client
                    .detach_role_policy()
                    .role_name(role_name)
                    .policy_arn(policy_arn)
                    .send()
                    .await
                    .with_context(|| {
                        format!("Failed to detach policy {} from role {}", policy_arn, role_name)
                    })?;

                debug!(role = %role_name, policy = %policy_arn, "Detached managed policy");
            }
        }

        Ok(())
    }

    async fn delete_inline_policies(&self, role_name: &str) -> Result<()> {
        let mut pages = self
            .client
            .list_role_policies()
            .role_name(role_name)
            .into_paginator()
            .send();

        while let Some(page) = pages.next().await {
            let page = page.with_context(|| {
                format!("Failed to list inline policies for role {}", role_name)
            })?;

            for policy_name in page.policy_names() {
                self.client
                    .delete_role_policy()
                    .role_name(role_name)
                    .policy_name(policy_name)
                    .send()
                    .await
                    .with_context(|| {
                        format!(
                            "Failed to delete inline policy {} from role {}",
                            policy_name, role_name
                        )
                    })?;

                debug!(role = %role_name, policy = %policy_name, "Deleted inline policy");
            }
        }

        Ok(())
    }

    async fn delete_role(&self, role_name: &str) -> Result<()> {
        self.client
            .delete_role()
            .role_name(role_name)
            .send()
            .await
            .with_context(|| format!("Failed to delete role {}", role_name))?;

        Ok(())
    }
}
