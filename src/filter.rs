//! Role Filtering
//!
//! Reduces a listing to the roles matching the used / unused / age
//! options. Precedence:
//!
//! 1. `only_used` together with `only_unused` is a conflict and yields nothing.
//! 2. A role is dropped if any of these holds:
//!    - `only_used` and the role was never used
//!    - `only_unused` and the role was used, but not long enough ago to be
//!      unused at `days`
//!    - `days > 0`, `only_unused` is off, and the role is not unused at `days`
//! 3. Survivors keep their input order.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::role::Role;

/// Filtering criteria for a role listing
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterOptions {
    /// Age threshold in days (0 disables age filtering)
    pub days: u32,
    /// Keep only roles with recorded activity
    pub only_used: bool,
    /// Keep only roles that are unused at `days`
    pub only_unused: bool,
}

impl FilterOptions {
    pub fn new(days: u32) -> Self {
        Self {
            days,
            ..Self::default()
        }
    }

    pub fn only_used(mut self) -> Self {
        self.only_used = true;
        self
    }

    pub fn only_unused(mut self) -> Self {
        self.only_unused = true;
        self
    }

    /// Both exclusive flags set; the result is always empty
    pub fn is_conflicting(&self) -> bool {
        self.only_used && self.only_unused
    }

    fn excludes(&self, role: &Role, now: DateTime<Utc>) -> bool {
        if self.only_used && !role.was_ever_used() {
            return true;
        }

        if self.only_unused && role.was_ever_used() && !role.is_unused_at(self.days, now) {
            return true;
        }

        self.days > 0 && !self.only_unused && !role.is_unused_at(self.days, now)
    }
}

/// Filter roles using the current time
pub fn filter_roles(roles: &[Role], options: &FilterOptions) -> Vec<Role> {
    filter_roles_at(roles, options, Utc::now())
}

/// Filter roles against an explicit "now"
pub fn filter_roles_at(roles: &[Role], options: &FilterOptions, now: DateTime<Utc>) -> Vec<Role> {
    if options.is_conflicting() {
        return Vec::new();
    }

    roles
        .iter()
        .filter(|role| !options.excludes(role, now))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::iam::testing::sample_roles;
    use chrono::Duration;

    fn names(roles: &[Role]) -> Vec<&str> {
        roles.iter().map(|r| r.name.as_str()).collect()
    }

    #[test]
    fn test_filter_matrix() {
        let now = Utc::now();
        let roles = sample_roles(now);

        let cases: Vec<(&str, FilterOptions, Vec<&str>)> = vec![
            (
                "no filters",
                FilterOptions::new(0),
                vec!["ActiveRole", "InactiveRole", "NeverUsedRole"],
            ),
            (
                "used only",
                FilterOptions::new(0).only_used(),
                vec!["ActiveRole", "InactiveRole"],
            ),
            (
                "unused only, no threshold",
                FilterOptions::new(0).only_unused(),
                vec!["ActiveRole", "InactiveRole", "NeverUsedRole"],
            ),
            (
                "90 days",
                FilterOptions::new(90),
                vec!["InactiveRole", "NeverUsedRole"],
            ),
            (
                "3 days",
                FilterOptions::new(3),
                vec!["ActiveRole", "InactiveRole", "NeverUsedRole"],
            ),
            (
                "90 days, used only",
                FilterOptions::new(90).only_used(),
                vec!["InactiveRole"],
            ),
            (
                "90 days, unused only",
                FilterOptions::new(90).only_unused(),
                vec!["InactiveRole", "NeverUsedRole"],
            ),
            (
                "3 days, unused only",
                FilterOptions::new(3).only_unused(),
                vec!["ActiveRole", "InactiveRole", "NeverUsedRole"],
            ),
            (
                "365 days, unused only",
                FilterOptions::new(365).only_unused(),
                vec!["NeverUsedRole"],
            ),
        ];

        for (label, options, expected) in cases {
            let filtered = filter_roles_at(&roles, &options, now);
            assert_eq!(names(&filtered), expected, "case: {}", label);
        }
    }

    #[test]
    fn test_conflicting_flags_yield_nothing() {
        let now = Utc::now();
        let roles = sample_roles(now);

        for days in [0, 3, 90] {
            let options = FilterOptions::new(days).only_used().only_unused();
            assert!(options.is_conflicting());
            assert!(filter_roles_at(&roles, &options, now).is_empty());
        }
        assert!(filter_roles(&[], &FilterOptions::new(0).only_used().only_unused()).is_empty());
    }

    #[test]
    fn test_order_is_preserved() {
        let now = Utc::now();
        let mut roles = sample_roles(now);
        roles.reverse();

        let filtered = filter_roles_at(&roles, &FilterOptions::new(90), now);
        assert_eq!(names(&filtered), vec!["NeverUsedRole", "InactiveRole"]);
    }

    #[test]
    fn test_threshold_beyond_calendar_keeps_only_never_used() {
        let now = Utc::now();
        let roles = sample_roles(now);

        for options in [
            FilterOptions::new(u32::MAX),
            FilterOptions::new(u32::MAX).only_unused(),
        ] {
            let filtered = filter_roles_at(&roles, &options, now);
            assert_eq!(names(&filtered), vec!["NeverUsedRole"]);
        }
    }

    #[test]
    fn test_threshold_boundary_is_kept_out_of_unused_view() {
        let now = Utc::now();
        let roles = vec![Role::new("Edge", "arn:aws:iam::1:role/Edge", now - Duration::days(200))
            .with_last_used(Some(now - Duration::days(90)))];

        assert!(filter_roles_at(&roles, &FilterOptions::new(90), now).is_empty());
        assert!(filter_roles_at(&roles, &FilterOptions::new(90).only_unused(), now).is_empty());
    }
}
