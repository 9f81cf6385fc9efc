//! Error types for role operations

use thiserror::Error;

/// One step of the role deletion sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeletionStep {
    DetachManagedPolicies,
    DeleteInlinePolicies,
    DeleteRole,
}

impl std::fmt::Display for DeletionStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DeletionStep::DetachManagedPolicies => write!(f, "detach managed policies"),
            DeletionStep::DeleteInlinePolicies => write!(f, "delete inline policies"),
            DeletionStep::DeleteRole => write!(f, "delete role"),
        }
    }
}

/// Errors surfaced by listing, pruning and deleting roles
#[derive(Debug, Error)]
pub enum HawklingError {
    /// Invalid user input, reported before anything is changed
    #[error("{0}")]
    Validation(String),

    /// Targeted role does not exist
    #[error("role '{0}' not found")]
    RoleNotFound(String),

    /// The role listing could not be obtained
    #[error("failed to list roles: {0}")]
    Listing(String),

    /// One step of a single role's deletion failed
    #[error("failed to {step} for role {role}: {message}")]
    DeletionStep {
        role: String,
        step: DeletionStep,
        message: String,
    },

    /// Some roles in a batch could not be deleted
    #[error("failed to delete {count} roles: {}", .names.join(", "))]
    PartialFailure { count: usize, names: Vec<String> },

    /// Reading the confirmation answer failed
    #[error("failed to read confirmation: {0}")]
    Confirmation(String),

    /// Invalid settings
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl HawklingError {
    /// Input errors that the caller should report differently from
    /// backend failures
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            HawklingError::Validation(_) | HawklingError::RoleNotFound(_)
        )
    }
}

/// Render an error chain on one line (`outer: inner: root`)
pub(crate) fn describe(err: &anyhow::Error) -> String {
    format!("{:#}", err)
}
