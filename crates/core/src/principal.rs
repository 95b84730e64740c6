//! Authentication context bound to a session

use serde::{Deserialize, Serialize};

/// The user on whose behalf a session runs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    name: String,
    roles: Vec<String>,
}

impl Principal {
    /// Principal with no roles
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            roles: Vec::new(),
        }
    }

    /// Principal used by background work and tests
    pub fn system() -> Self {
        Self::new("__system").with_role("system")
    }

    /// Add a role
    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.roles.push(role.into());
        self
    }

    /// User name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Granted roles
    pub fn roles(&self) -> &[String] {
        &self.roles
    }

    /// True if the principal holds `role`
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }
}
