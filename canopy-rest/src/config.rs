use serde::{Deserialize, Serialize};

/// Connection settings for a Realtime Database REST endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RestConfig {
    /// Base URL of the database, e.g. `https://my-app.firebaseio.com`.
    pub database_url: String,
    /// Credential sent as the `auth` query parameter.
    pub auth_token: Option<String>,
    /// Timeout for one-shot requests. Event streams are not limited.
    pub request_timeout_ms: u64,
}

impl Default for RestConfig {
    fn default() -> Self {
        Self {
            database_url: "http://localhost:9000".to_string(),
            auth_token: None,
            request_timeout_ms: 30_000,
        }
    }
}
