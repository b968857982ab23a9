//! Forest configuration.
//!
//! Settings can be built in code, deserialized, or read from the
//! environment:
//!
//! | Variable | Field |
//! |----------|-------|
//! | `ARTIFACT_KERNEL_VERIFY` | `verify_after_operations` |
//! | `ARTIFACT_KERNEL_WARN_AMBIGUOUS` | `warn_on_ambiguous_match` |

use serde::{Deserialize, Serialize};

use crate::canonical::canonical_hash_hex;
use crate::error::TreeResult;
use crate::TREE_SCHEMA_VERSION;

/// Environment variable toggling consistency checks after each algorithm.
pub const ENV_VERIFY: &str = "ARTIFACT_KERNEL_VERIFY";

/// Environment variable toggling warnings about ambiguous ordered matches.
pub const ENV_WARN_AMBIGUOUS: &str = "ARTIFACT_KERNEL_WARN_AMBIGUOUS";

/// Behavior switches of a [`Forest`](crate::Forest).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForestConfig {
    /// Run a consistency check on the result of `sequence`,
    /// `update_artifact_references` and `extract_marked`.
    pub verify_after_operations: bool,
    /// Emit a warning whenever an ordered child had more than one matching
    /// candidate and the first one was taken.
    pub warn_on_ambiguous_match: bool,
}

impl Default for ForestConfig {
    fn default() -> Self {
        Self {
            verify_after_operations: false,
            warn_on_ambiguous_match: true,
        }
    }
}

#[derive(Serialize)]
struct HashedConfig<'a> {
    schema: &'a str,
    verify_after_operations: bool,
    warn_on_ambiguous_match: bool,
}

impl ForestConfig {
    /// Verify after every operation. Used by tests and debugging sessions.
    pub fn strict() -> Self {
        Self {
            verify_after_operations: true,
            warn_on_ambiguous_match: true,
        }
    }

    /// Read the configuration from the environment, falling back to the
    /// defaults for unset or unparsable variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            verify_after_operations: env_flag(ENV_VERIFY)
                .unwrap_or(defaults.verify_after_operations),
            warn_on_ambiguous_match: env_flag(ENV_WARN_AMBIGUOUS)
                .unwrap_or(defaults.warn_on_ambiguous_match),
        }
    }

    /// Canonical hash of the configuration.
    pub fn params_hash(&self) -> TreeResult<String> {
        canonical_hash_hex(&HashedConfig {
            schema: TREE_SCHEMA_VERSION,
            verify_after_operations: self.verify_after_operations,
            warn_on_ambiguous_match: self.warn_on_ambiguous_match,
        })
    }
}

fn env_flag(name: &str) -> Option<bool> {
    std::env::var(name).ok().and_then(|s| parse_flag(&s))
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
