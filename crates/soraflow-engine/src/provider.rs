//! Provider trait definition
//!
//! The engine is agnostic to what a resource kind means. A provider turns
//! fully resolved attributes into real infrastructure and reports the
//! outputs the kind is documented to produce; the engine only requires
//! that those outputs come back on success.

use crate::error::Result;
use crate::state::ResourceRecord;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Cloud provider abstraction trait
#[async_trait]
pub trait Provider: Send + Sync {
    /// Returns the provider name (e.g. "google-cloud")
    fn name(&self) -> &str;

    /// Returns the provider display name for UI
    fn display_name(&self) -> &str;

    /// Check if the provider is properly configured and authenticated
    async fn check_auth(&self) -> Result<AuthStatus>;

    /// Create or update a resource so it matches `attrs`
    ///
    /// `previous` carries the record from the last successful apply, if
    /// any. A call either fully succeeds (id and outputs returned) or
    /// fully fails; no partial state is ever recorded.
    async fn realize(
        &self,
        kind: &str,
        name: &str,
        attrs: &serde_json::Map<String, Value>,
        previous: Option<&ResourceRecord>,
    ) -> Result<Realized>;

    /// Destroy a resource previously realized by this provider
    async fn destroy(&self, kind: &str, name: &str, provider_id: &str) -> Result<()>;
}

/// Result of realizing a single resource
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Realized {
    /// Provider-assigned identifier
    pub provider_id: String,

    /// Outputs the resource's kind produces (ids, generated names, URLs)
    pub outputs: serde_json::Map<String, Value>,
}

impl Realized {
    pub fn new(provider_id: impl Into<String>) -> Self {
        Self {
            provider_id: provider_id.into(),
            outputs: serde_json::Map::new(),
        }
    }

    pub fn with_output(mut self, key: impl Into<String>, value: Value) -> Self {
        self.outputs.insert(key.into(), value);
        self
    }
}

/// Authentication status
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthStatus {
    /// Whether authentication is valid
    pub authenticated: bool,

    /// Account/user information if available
    pub account_info: Option<String>,

    /// Error message if not authenticated
    pub error: Option<String>,
}

impl AuthStatus {
    pub fn ok(account_info: impl Into<String>) -> Self {
        Self {
            authenticated: true,
            account_info: Some(account_info.into()),
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            authenticated: false,
            account_info: None,
            error: Some(error.into()),
        }
    }
}
