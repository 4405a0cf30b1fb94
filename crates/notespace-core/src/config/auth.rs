//! Credential configuration surface.
//!
//! These are raw string values as they arrive from the environment; the
//! auth crate parses and validates them eagerly into typed credential
//! records at load time.

use serde::{Deserialize, Serialize};

/// Authentication and credential configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Static bearer tokens as a JSON map of
    /// `token -> {user_id, principal_type, display_name?, key_id?,
    /// disabled?, scopes?, scope_enforced?, service_account_id?}`.
    pub bearer_tokens_json: Option<String>,
    /// Static API keys in the same JSON map shape as `bearer_tokens_json`.
    pub api_keys_json: Option<String>,
    /// Simple `key:user_id` comma-list of API keys for service principals.
    pub api_keys: Option<String>,
    /// Signed-token HMAC secrets as a `kid:secret` comma-list.
    pub signing_secrets: Option<String>,
    /// Comma-separated allowlist of active signing key ids. Empty means
    /// every configured key id is accepted.
    pub active_key_ids: Option<String>,
    /// Comma-separated list of revoked key ids.
    pub revoked_key_ids: Option<String>,
    /// Explicit bootstrap bearer token for deterministic startup. When no
    /// bearer credential is configured and this is unset, a random token
    /// is generated at load time.
    pub bootstrap_token: Option<String>,
    /// User id assigned to the bootstrap credential.
    pub bootstrap_user_id: Option<String>,
}
