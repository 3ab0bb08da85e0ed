//! Typed configuration for problem details generation
//!
//! The section is optional: when `problem_details` is absent from the
//! figment, defaults apply. A present but malformed section is an error.

use figment::Figment;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Figment key holding the section.
pub const CONFIG_SECTION: &str = "problem_details";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProblemConfig {
    /// Attach exception diagnostics (class, message, location, span trace)
    /// to fallback responses. Never enable in deployments reachable by
    /// untrusted clients.
    pub debug: bool,
}

impl ProblemConfig {
    /// Extract the `problem_details` section, falling back to defaults when missing.
    ///
    /// # Errors
    /// Returns `ConfigError::Invalid` if the section exists but cannot be deserialized.
    pub fn from_figment(figment: &Figment) -> Result<Self, ConfigError> {
        if !figment.contains(CONFIG_SECTION) {
            return Ok(Self::default());
        }
        Ok(figment.extract_inner(CONFIG_SECTION)?)
    }
}
