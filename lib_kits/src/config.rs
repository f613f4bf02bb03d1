//! # Process Configuration
//!
//! All credentials come from environment variables and are loaded once at
//! process start into explicit config values that get passed into each
//! component. Nothing in the pipeline reads the environment after startup.

use std::env;

use crate::error::{KitsError, MAX_CONNECT_TRIES};

/// Socrata dataset holding the published signal statuses (full replace target).
pub const SIGNAL_STATUS_RESOURCE_ID: &str = "5zpr-dehc";
/// Socrata dataset holding the signal asset inventory (read-only reference).
pub const SIGNALS_RESOURCE_ID: &str = "p53x-x73x";
/// Domain of the open-data portal.
pub const SOCRATA_DOMAIN: &str = "data.austintexas.gov";

fn required_env(name: &str) -> Result<String, KitsError> {
    env::var(name).map_err(|_| KitsError::MissingEnvVar(name.to_string()))
}

/// Connection credentials for the KITS traffic-management database.
#[derive(Debug, Clone)]
pub struct KitsCredentials {
    pub server: String,
    pub user: String,
    pub password: String,
    pub database: String,
}

impl KitsCredentials {
    /// Loads credentials from `KITS_SERVER`, `KITS_USER`, `KITS_PASSWORD`
    /// and `KITS_DATABASE`.
    pub fn from_env() -> Result<Self, KitsError> {
        Ok(Self {
            server: required_env("KITS_SERVER")?,
            user: required_env("KITS_USER")?,
            password: required_env("KITS_PASSWORD")?,
            database: required_env("KITS_DATABASE")?,
        })
    }
}

/// Credentials for the Socrata open-data portal.
#[derive(Debug, Clone)]
pub struct SocrataConfig {
    pub app_token: String,
    pub api_key_id: String,
    pub api_key_secret: String,
}

impl SocrataConfig {
    pub fn from_env() -> Result<Self, KitsError> {
        Ok(Self {
            app_token: required_env("SOCRATA_APP_TOKEN")?,
            api_key_id: required_env("SOCRATA_API_KEY_ID")?,
            api_key_secret: required_env("SOCRATA_API_KEY_SECRET")?,
        })
    }
}

/// Credentials plus page/object coordinates for the Knack application.
#[derive(Debug, Clone)]
pub struct KnackConfig {
    pub app_id: String,
    pub api_key: String,
    /// Scene holding the DMS inventory view.
    pub scene: String,
    /// View the current DMS records are read from.
    pub view: String,
    /// Object updated messages are written to.
    pub object: String,
}

impl KnackConfig {
    pub fn from_env() -> Result<Self, KitsError> {
        Ok(Self {
            app_id: required_env("KNACK_APP_ID")?,
            api_key: required_env("KNACK_API_KEY")?,
            scene: "scene_569".to_string(),
            view: "view_1564".to_string(),
            object: "object_109".to_string(),
        })
    }
}

/// Validated retry bound for KITS connection attempts.
///
/// Construction fails if the requested bound exceeds [`MAX_CONNECT_TRIES`];
/// nothing downstream re-checks the bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_tries: u32,
}

impl RetryPolicy {
    pub fn new(max_tries: u32) -> Result<Self, KitsError> {
        if max_tries > MAX_CONNECT_TRIES {
            return Err(KitsError::RetryBoundTooHigh(max_tries));
        }
        Ok(Self { max_tries })
    }

    pub fn max_tries(&self) -> u32 {
        self.max_tries
    }
}

impl Default for RetryPolicy {
    /// Three attempts, same as the historical default.
    fn default() -> Self {
        Self { max_tries: 3 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retry_policy_accepts_bound_within_limit() {
        let policy = RetryPolicy::new(5).unwrap();
        assert_eq!(policy.max_tries(), 5);
    }

    #[test]
    fn test_retry_policy_rejects_bound_above_limit() {
        let err = RetryPolicy::new(6).unwrap_err();
        assert!(matches!(err, KitsError::RetryBoundTooHigh(6)));
    }

    #[test]
    fn test_missing_env_var_names_the_variable() {
        let err = required_env("KITS_NO_SUCH_VARIABLE").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Environment variable KITS_NO_SUCH_VARIABLE is not present"
        );
    }
}
