//! Caller identity resolution.

use std::collections::HashMap;

use tracing::debug;

use crate::config::AuthConfig;
use crate::mcp::context::Identity;

/// Resolves caller credentials to an identity.
pub trait IdentityResolver: Send + Sync {
    /// Maps credentials to a user, or to [`Identity::Anonymous`] when they
    /// are absent or unknown.
    fn resolve(&self, credentials: Option<&str>) -> Identity;
}

/// Resolves static API keys from configuration.
#[derive(Debug, Clone, Default)]
pub struct ApiKeyResolver {
    keys: HashMap<String, String>,
}

impl ApiKeyResolver {
    /// Creates a resolver over an API key to user id map.
    #[must_use]
    pub const fn new(keys: HashMap<String, String>) -> Self {
        Self { keys }
    }

    /// Creates a resolver from the `auth` configuration section.
    #[must_use]
    pub fn from_config(config: &AuthConfig) -> Self {
        Self::new(config.api_keys.clone())
    }
}

impl IdentityResolver for ApiKeyResolver {
    fn resolve(&self, credentials: Option<&str>) -> Identity {
        let Some(key) = credentials.map(str::trim).filter(|k| !k.is_empty()) else {
            return Identity::Anonymous;
        };

        match self.keys.get(key) {
            Some(user) => Identity::User(user.clone()),
            None => {
                debug!("Unknown API key, continuing anonymously");
                Identity::Anonymous
            }
        }
    }
}
