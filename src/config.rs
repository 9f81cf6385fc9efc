//! Runtime Settings
//!
//! Global options shared by every command plus the AWS SDK configuration
//! built from them. Credentials come from the standard AWS provider chain
//! (environment, shared profile files, instance/role metadata).

use std::time::Duration;

use aws_config::{BehaviorVersion, Region, SdkConfig};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::enrich::DEFAULT_CONCURRENCY;
use crate::error::HawklingError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    /// Named profile from the shared AWS config files
    pub profile: Option<String>,
    /// Region override
    pub region: Option<String>,
    /// Worker count for the usage lookups
    pub concurrency: usize,
    /// Overall deadline for the usage lookups, in seconds
    pub timeout_secs: Option<u64>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            profile: None,
            region: None,
            concurrency: DEFAULT_CONCURRENCY,
            timeout_secs: None,
        }
    }
}

impl Settings {
    pub fn validate(&self) -> Result<(), HawklingError> {
        if self.concurrency == 0 {
            return Err(HawklingError::Config(
                "concurrency must be at least 1".to_string(),
            ));
        }

        if self.timeout_secs == Some(0) {
            return Err(HawklingError::Config(
                "timeout must be at least 1 second".to_string(),
            ));
        }

        for (name, value) in [("profile", &self.profile), ("region", &self.region)] {
            if matches!(value, Some(v) if v.trim().is_empty()) {
                return Err(HawklingError::Config(format!("{} must not be empty", name)));
            }
        }

        Ok(())
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

/// Resolve the AWS SDK configuration for these settings
pub async fn load_sdk_config(settings: &Settings) -> SdkConfig {
    let mut loader = aws_config::defaults(BehaviorVersion::latest());

    if let Some(profile) = &settings.profile {
        debug!(profile = %profile, "Using AWS profile");
        loader = loader.profile_name(profile);
    }
    if let Some(region) = &settings.region {
        debug!(region = %region, "Using AWS region");
        loader = loader.region(Region::new(region.clone()));
    }

    loader.load().await
}
