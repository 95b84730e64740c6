//! Runtime configuration
//!
//! Every field has a default, so an empty JSON object is a valid config.
//!
//! ```json
//! {
//!   "identity_scheme": "uuid",
//!   "ghost_policy": "lazy",
//!   "stamp_versions_with_principal": false,
//!   "logging": { "level": "debug", "ansi": false }
//! }
//! ```

use causeway_core::{Error, Result};
use serde::{Deserialize, Serialize};

/// Which identity generator a runtime installs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdentityScheme {
    /// Numeric keys from counters
    #[default]
    Sequence,
    /// uuid v4 string keys
    Uuid,
}

/// Whether a ghost may leave the session unresolved
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GhostPolicy {
    /// `Session::lookup` resolves ghosts before returning them
    #[default]
    ResolveOnLookup,
    /// Ghosts are handed out as-is and resolved on first state access
    Lazy,
}

/// Log output settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Filter used when `RUST_LOG` is unset (e.g. `"info"`, `"causeway=debug"`)
    #[serde(default = "default_level")]
    pub level: String,
    /// Colored output
    #[serde(default = "default_true")]
    pub ansi: bool,
}

fn default_level() -> String {
    "info".to_string()
}

fn default_true() -> bool {
    true
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            ansi: true,
        }
    }
}

/// Configuration shared by every session a runtime opens
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuntimeConfig {
    /// Identity generator to install
    #[serde(default)]
    pub identity_scheme: IdentityScheme,
    /// Ghost hand-off policy
    #[serde(default)]
    pub ghost_policy: GhostPolicy,
    /// Stamp versions with the session principal's name
    #[serde(default = "default_true")]
    pub stamp_versions_with_principal: bool,
    /// Log output
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            identity_scheme: IdentityScheme::default(),
            ghost_policy: GhostPolicy::default(),
            stamp_versions_with_principal: true,
            logging: LoggingConfig::default(),
        }
    }
}

impl RuntimeConfig {
    /// Deterministic settings for tests: sequence identities, plain logs
    pub fn for_testing() -> Self {
        Self {
            identity_scheme: IdentityScheme::Sequence,
            logging: LoggingConfig {
                level: "debug".to_string(),
                ansi: false,
            },
            ..Self::default()
        }
    }

    /// Parse a JSON config document
    pub fn from_json_str(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| Error::illegal_state(format!("invalid runtime config: {}", e)))
    }

    /// Set the identity scheme
    pub fn with_identity_scheme(mut self, scheme: IdentityScheme) -> Self {
        self.identity_scheme = scheme;
        self
    }

    /// Set the ghost policy
    pub fn with_ghost_policy(mut self, policy: GhostPolicy) -> Self {
        self.ghost_policy = policy;
        self
    }

    /// Enable or disable principal stamping
    pub fn with_principal_stamps(mut self, enabled: bool) -> Self {
        self.stamp_versions_with_principal = enabled;
        self
    }

    /// Replace the logging settings
    pub fn with_logging(mut self, logging: LoggingConfig) -> Self {
        self.logging = logging;
        self
    }
}
