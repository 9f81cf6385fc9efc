//! IAM Role Model
//!
//! A role snapshot as returned by the listing call, plus the
//! "unused for N days" predicate that drives filtering and pruning.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// An IAM role at a point in time
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    /// Role name, unique within a listing
    pub name: String,
    /// Fully-qualified ARN
    pub arn: String,
    /// Free-text description (empty when unset)
    #[serde(default)]
    pub description: String,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Most recent activity; `None` means the role was never used
    pub last_used_at: Option<DateTime<Utc>>,
}

impl Role {
    /// Create a role without last-used data (as listed, before enrichment)
    pub fn new(name: impl Into<String>, arn: impl Into<String>, created_at: DateTime<Utc>) -> Self {
        Self {
            name: name.into(),
            arn: arn.into(),
            description: String::new(),
            created_at,
            last_used_at: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_last_used(mut self, last_used_at: Option<DateTime<Utc>>) -> Self {
        self.last_used_at = last_used_at;
        self
    }

    /// Whether the role has any recorded activity
    pub fn was_ever_used(&self) -> bool {
        self.last_used_at.is_some()
    }

    /// Whether the role has not been used in the last `days` days.
    ///
    /// A role that was never used is always unused, for any `days`
    /// including zero.
    pub fn is_unused(&self, days: u32) -> bool {
        self.is_unused_at(days, Utc::now())
    }

    /// Same as [`Role::is_unused`] against an explicit "now".
    ///
    /// Only timestamps strictly older than `now - days` count as unused;
    /// a role last used exactly at the threshold is still in use. A
    /// threshold before the earliest representable date is never reached.
    pub fn is_unused_at(&self, days: u32, now: DateTime<Utc>) -> bool {
        let Some(last_used) = self.last_used_at else {
            return true;
        };

        match now.checked_sub_signed(Duration::days(i64::from(days))) {
            Some(threshold) => last_used < threshold,
            None => false,
        }
    }
}
