//! Hawkling Library
//!
//! Finds IAM roles that have not been used for a while and removes them.
//! Role usage is fetched concurrently from a bounded worker pool; deletion
//! detaches managed policies and removes inline policies before the role
//! itself.

pub mod config;
pub mod delete;
pub mod enrich;
pub mod error;
pub mod filter;
pub mod iam;
pub mod output;
pub mod progress;
pub mod role;
pub mod service;

pub use config::Settings;
pub use error::HawklingError;
pub use filter::{filter_roles, FilterOptions};
pub use iam::{AwsIamClient, IamApi};
pub use role::Role;
pub use service::{AutoConfirm, ConfirmationGate, RoleManager, StdinPrompt};
