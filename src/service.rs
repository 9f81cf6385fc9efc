//! Role Operations
//!
//! Composes listing, enrichment, filtering and deletion into the
//! operations the CLI exposes. Every destructive operation asks a
//! [`ConfirmationGate`] first.

use std::io::{BufRead, Write};
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::delete::{delete_role, delete_roles, BulkDeletion};
use crate::enrich::{Enricher, Enrichment};
use crate::error::{describe, HawklingError};
use crate::filter::{filter_roles, FilterOptions};
use crate::iam::IamApi;
use crate::progress::ProgressSink;
use crate::role::Role;

/// What the caller is asked to approve
#[derive(Debug)]
pub enum ConfirmRequest<'a> {
    /// Delete every listed unused role
    Prune { roles: &'a [Role], days: u32 },
    /// Delete a single role
    Delete { role: &'a Role },
}

impl ConfirmRequest<'_> {
    /// Number of roles that would be deleted
    pub fn count(&self) -> usize {
        match self {
            ConfirmRequest::Prune { roles, .. } => roles.len(),
            ConfirmRequest::Delete { .. } => 1,
        }
    }

    pub fn prompt(&self) -> String {
        match self {
            ConfirmRequest::Prune { roles, .. } => format!(
                "Are you sure you want to delete {} unused roles? This cannot be undone. [y/N]: ",
                roles.len()
            ),
            ConfirmRequest::Delete { role } => format!(
                "Are you sure you want to delete role '{}'? This cannot be undone. [y/N]: ",
                role.name
            ),
        }
    }
}

/// Yes/no decision taken before anything is deleted
pub trait ConfirmationGate {
    fn confirm(&mut self, request: &ConfirmRequest<'_>) -> Result<bool, HawklingError>;
}

/// Approves everything (`--force`)
#[derive(Debug, Default, Clone, Copy)]
pub struct AutoConfirm;

impl ConfirmationGate for AutoConfirm {
    fn confirm(&mut self, _request: &ConfirmRequest<'_>) -> Result<bool, HawklingError> {
        Ok(true)
    }
}

/// Asks on stdout and reads the answer from stdin
#[derive(Debug, Default, Clone, Copy)]
pub struct StdinPrompt;

impl ConfirmationGate for StdinPrompt {
    fn confirm(&mut self, request: &ConfirmRequest<'_>) -> Result<bool, HawklingError> {
        let mut stdout = std::io::stdout();
        write!(stdout, "{}", request.prompt())
            .and_then(|_| stdout.flush())
            .map_err(|e| HawklingError::Confirmation(e.to_string()))?;

        let mut answer = String::new();
        std::io::stdin()
            .lock()
            .read_line(&mut answer)
            .map_err(|e| HawklingError::Confirmation(e.to_string()))?;

        Ok(is_affirmative(&answer))
    }
}

/// `y` or `yes`, any case, surrounding whitespace ignored
pub fn is_affirmative(answer: &str) -> bool {
    matches!(answer.trim().to_lowercase().as_str(), "y" | "yes")
}

/// Roles chosen for pruning
#[derive(Debug, Clone, Default)]
pub struct PruneSelection {
    /// Unused roles with complete usage data, in listing order
    pub candidates: Vec<Role>,
    /// Roles whose usage lookup was cut short; never pruned
    pub skipped: Vec<String>,
}

/// Result of a prune run
#[derive(Debug, Clone, Default, Serialize)]
pub struct PruneReport {
    /// Roles selected for deletion, in listing order
    pub candidates: Vec<String>,
    /// Roles left out because their usage is unknown
    pub skipped: Vec<String>,
    /// True when the gate declined and nothing was deleted
    pub declined: bool,
    pub deletion: BulkDeletion,
}

impl PruneReport {
    pub fn is_success(&self) -> bool {
        self.deletion.is_success()
    }

    /// Fails with [`HawklingError::PartialFailure`] if any deletion failed
    pub fn into_result(self) -> Result<Self, HawklingError> {
        if self.is_success() {
            Ok(self)
        } else {
            Err(HawklingError::PartialFailure {
                count: self.deletion.failed.len(),
                names: self.deletion.failed_names(),
            })
        }
    }
}

/// Outcome of a single-role deletion
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    Declined,
}

/// Entry point for listing, pruning and deleting roles
pub struct RoleManager {
    api: Arc<dyn IamApi>,
    enricher: Enricher,
}

impl RoleManager {
    pub fn new(api: Arc<dyn IamApi>) -> Self {
        let enricher = Enricher::new(Arc::clone(&api));
        Self { api, enricher }
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.enricher = self.enricher.with_concurrency(concurrency);
        self
    }

    pub fn with_progress(mut self, progress: Arc<dyn ProgressSink>) -> Self {
        self.enricher = self.enricher.with_progress(progress);
        self
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.enricher = self.enricher.with_cancellation(cancel);
        self
    }

    /// Bound the usage lookups (not the listing) of each operation
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.enricher = self.enricher.with_timeout(timeout);
        self
    }

    async fn list_base_roles(&self) -> Result<Vec<Role>, HawklingError> {
        let roles = self
            .api
            .list_roles()
            .await
            .map_err(|e| HawklingError::Listing(describe(&e)))?;

        info!(count = roles.len(), "Listed roles");
        Ok(roles)
    }

    async fn list_enriched(&self) -> Result<Enrichment, HawklingError> {
        let roles = self.list_base_roles().await?;
        let enrichment = self.enricher.enrich(roles).await;

        if !enrichment.failed.is_empty() {
            warn!(
                count = enrichment.failed.len(),
                "Some roles have no usage data and are treated as never used"
            );
        }

        Ok(enrichment)
    }

    /// All roles with last-used data, in listing order
    pub async fn list_roles(&self) -> Result<Vec<Role>, HawklingError> {
        Ok(self.list_enriched().await?.roles)
    }

    /// List, enrich and filter roles
    pub async fn list_and_filter(
        &self,
        options: &FilterOptions,
    ) -> Result<Vec<Role>, HawklingError> {
        let roles = self.list_roles().await?;
        let filtered = filter_roles(&roles, options);

        info!(
            total = roles.len(),
            matched = filtered.len(),
            days = options.days,
            only_used = options.only_used,
            only_unused = options.only_unused,
            "Filtered roles"
        );
        Ok(filtered)
    }

    /// Roles not used in the last `days` days (never-used roles included).
    ///
    /// Roles whose lookup was cancelled or timed out look never used but
    /// are reported in `skipped` instead of becoming candidates.
    pub async fn prune_candidates(&self, days: u32) -> Result<PruneSelection, HawklingError> {
        let Enrichment {
            roles, unresolved, ..
        } = self.list_enriched().await?;

        let (skipped, candidates): (Vec<Role>, Vec<Role>) =
            filter_roles(&roles, &FilterOptions::new(days).only_unused())
                .into_iter()
                .partition(|role| unresolved.contains(&role.name));

        if !skipped.is_empty() {
            warn!(
                count = skipped.len(),
                "Skipping roles whose usage could not be determined"
            );
        }
        info!(days, candidates = candidates.len(), "Selected prune candidates");

        Ok(PruneSelection {
            candidates,
            skipped: skipped.into_iter().map(|r| r.name).collect(),
        })
    }

    /// Delete every role unused for `days` days after one confirmation
    pub async fn prune_unused(
        &self,
        days: u32,
        gate: &mut dyn ConfirmationGate,
    ) -> Result<PruneReport, HawklingError> {
        let selection = self.prune_candidates(days).await?;
        let mut report = self.prune_roles(&selection.candidates, days, gate).await?;
        report.skipped = selection.skipped;
        Ok(report)
    }

    /// Delete an already selected set of candidates after one confirmation
    pub async fn prune_roles(
        &self,
        candidates: &[Role],
        days: u32,
        gate: &mut dyn ConfirmationGate,
    ) -> Result<PruneReport, HawklingError> {
        let names: Vec<String> = candidates.iter().map(|r| r.name.clone()).collect();

        if names.is_empty() {
            info!(days, "No unused roles found");
            return Ok(PruneReport::default());
        }

        let request = ConfirmRequest::Prune {
            roles: candidates,
            days,
        };
        if !gate.confirm(&request)? {
            info!(candidates = names.len(), "Prune declined; nothing deleted");
            return Ok(PruneReport {
                candidates: names,
                declined: true,
                ..PruneReport::default()
            });
        }

        let deletion = delete_roles(self.api.as_ref(), &names).await;
        Ok(PruneReport {
            candidates: names,
            deletion,
            ..PruneReport::default()
        })
    }

    /// Look a role up by name in the current listing
    pub async fn find_role(&self, role_name: &str) -> Result<Role, HawklingError> {
        self.list_base_roles()
            .await?
            .into_iter()
            .find(|r| r.name == role_name)
            .ok_or_else(|| HawklingError::RoleNotFound(role_name.to_string()))
    }

    /// Validate that the role exists, confirm, then delete it
    pub async fn delete_one(
        &self,
        role_name: &str,
        gate: &mut dyn ConfirmationGate,
    ) -> Result<DeleteOutcome, HawklingError> {
        let role = self.find_role(role_name).await?;

        if !gate.confirm(&ConfirmRequest::Delete { role: &role })? {
            info!(role = %role_name, "Deletion declined");
            return Ok(DeleteOutcome::Declined);
        }

        delete_role(self.api.as_ref(), role_name).await?;
        Ok(DeleteOutcome::Deleted)
    }
}
