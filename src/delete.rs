//! Role Deletion
//!
//! IAM refuses to delete a role that still has policies, so each role is
//! cleaned up in order: detach managed policies, delete inline policies,
//! delete the role. The first failing step aborts that role; nothing is
//! rolled back. Every step is a no-op on an already-clean role, so
//! re-running a failed deletion picks up where it stopped.

use serde::Serialize;
use tracing::{error, info};

use crate::error::{describe, DeletionStep, HawklingError};
use crate::iam::IamApi;

/// Delete one role and everything attached to it
pub async fn delete_role(api: &dyn IamApi, role_name: &str) -> Result<(), HawklingError> {
    let step_error = |step: DeletionStep, err: anyhow::Error| HawklingError::DeletionStep {
        role: role_name.to_string(),
        step,
        message: describe(&err),
    };

    api.detach_managed_policies(role_name)
        .await
        .map_err(|e| step_error(DeletionStep::DetachManagedPolicies, e))?;

    api.delete_inline_policies(role_name)
        .await
        .map_err(|e| step_error(DeletionStep::DeleteInlinePolicies, e))?;

    api.delete_role(role_name)
        .await
        .map_err(|e| step_error(DeletionStep::DeleteRole, e))?;

    info!(role = %role_name, "Deleted role");
    Ok(())
}

/// A role that could not be deleted
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailedDeletion {
    pub role: String,
    pub reason: String,
}

/// Outcome of deleting a batch of roles
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BulkDeletion {
    pub deleted: Vec<String>,
    pub failed: Vec<FailedDeletion>,
}

impl BulkDeletion {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }

    pub fn failed_names(&self) -> Vec<String> {
        self.failed.iter().map(|f| f.role.clone()).collect()
    }

    /// Turn a batch with failures into [`HawklingError::PartialFailure`]
    pub fn into_result(self) -> Result<Self, HawklingError> {
        if self.is_success() {
            Ok(self)
        } else {
            Err(HawklingError::PartialFailure {
                count: self.failed.len(),
                names: self.failed_names(),
            })
        }
    }
}

/// Delete roles one after another; a failure never stops the batch
pub async fn delete_roles(api: &dyn IamApi, role_names: &[String]) -> BulkDeletion {
    let mut result = BulkDeletion::default();

    for name in role_names {
        match delete_role(api, name).await {
            Ok(()) => result.deleted.push(name.clone()),
            Err(e) => {
                error!(role = %name, error = %e, "Failed to delete role");
                result.failed.push(FailedDeletion {
                    role: name.clone(),
                    reason: e.to_string(),
                });
            }
        }
    }

    info!(
        deleted = result.deleted.len(),
        failed = result.failed.len(),
        "Bulk deletion complete"
    );

    result
}
