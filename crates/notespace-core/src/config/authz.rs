//! Authorization defaults and group overrides.

use serde::{Deserialize, Serialize};

/// Authorization engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthzConfig {
    /// Role assigned to user principals with no explicit space role.
    pub default_user_role: String,
    /// Role assigned to service principals.
    pub default_service_role: String,
    /// External group override map as JSON:
    /// `space_id -> {user_id -> [group, ...]}`.
    pub user_groups_json: Option<String>,
}

impl Default for AuthzConfig {
    fn default() -> Self {
        Self {
            default_user_role: "editor".to_string(),
            default_service_role: "service".to_string(),
            user_groups_json: None,
        }
    }
}
