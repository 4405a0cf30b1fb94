//! Service accounts and their API keys.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::action::SpaceAction;

/// Hash algorithm identifier stamped on every service-account key.
pub const API_KEY_HASH_ALGORITHM: &str = "pbkdf2_sha256_v1";

/// An automation principal scoped to one space.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceAccount {
    /// Account id.
    pub id: String,
    /// Synthetic principal id: `service:<space_id>:<account_id>`.
    pub user_id: String,
    /// Human-facing account name.
    pub display_name: String,
    /// Disabled accounts cannot authenticate.
    #[serde(default)]
    pub disabled: bool,
    /// Action scopes granted to the account's keys. Non-empty, validated
    /// against the fixed action vocabulary.
    pub scopes: BTreeSet<SpaceAction>,
    /// When the account was created.
    pub created_at: String,
    /// User id of the creator.
    pub created_by: String,
    /// API keys keyed by key id.
    #[serde(default)]
    pub keys: BTreeMap<String, ServiceAccountKey>,
}

/// A single API key belonging to a service account.
///
/// The secret itself is never stored: only the PBKDF2 hash, the salt, and
/// a short display prefix persist.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceAccountKey {
    /// Key id.
    pub id: String,
    /// Human-facing key name.
    pub name: String,
    /// First 12 characters of the secret, for display only.
    pub prefix: String,
    /// Base64url PBKDF2-HMAC-SHA256 digest of the secret.
    pub secret_hash: String,
    /// Random salt the digest was derived with.
    pub secret_salt: String,
    /// Digest algorithm identifier (see [`API_KEY_HASH_ALGORITHM`]).
    pub hash_algorithm: String,
    /// When the key was created.
    pub created_at: String,
    /// User id of the creator.
    pub created_by: String,
    /// When the key was revoked, if it was. Set at most once.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revoked_at: Option<String>,
    /// Id of the key this one replaced during rotation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rotated_from: Option<String>,
    /// Last successful authentication with this key.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_used_at: Option<String>,
    /// Number of successful authentications.
    #[serde(default)]
    pub usage_count: u64,
}

/// Public view of a service account, safe to return to callers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceAccountView {
    /// Account id.
    pub id: String,
    /// Synthetic principal id.
    pub user_id: String,
    /// Human-facing account name.
    pub display_name: String,
    /// Disabled flag.
    pub disabled: bool,
    /// Granted scopes.
    pub scopes: BTreeSet<SpaceAction>,
    /// Creation timestamp.
    pub created_at: String,
    /// Creator user id.
    pub created_by: String,
    /// Key metadata, newest first. Hash and salt are omitted.
    pub keys: Vec<ServiceAccountKeyView>,
}

/// Public view of a service-account key. Never contains hash or salt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceAccountKeyView {
    /// Key id.
    pub id: String,
    /// Key name.
    pub name: String,
    /// Display prefix of the secret.
    pub prefix: String,
    /// Creation timestamp.
    pub created_at: String,
    /// Creator user id.
    pub created_by: String,
    /// Revocation timestamp, if revoked.
    pub revoked_at: Option<String>,
    /// Id of the rotated-out predecessor key.
    pub rotated_from: Option<String>,
    /// Last successful use.
    pub last_used_at: Option<String>,
    /// Successful use count.
    pub usage_count: u64,
}

impl ServiceAccountKey {
    /// Strip secret material for external consumption.
    pub fn public_view(&self) -> ServiceAccountKeyView {
        ServiceAccountKeyView {
            id: self.id.clone(),
            name: self.name.clone(),
            prefix: self.prefix.clone(),
            created_at: self.created_at.clone(),
            created_by: self.created_by.clone(),
            revoked_at: self.revoked_at.clone(),
            rotated_from: self.rotated_from.clone(),
            last_used_at: self.last_used_at.clone(),
            usage_count: self.usage_count,
        }
    }
}

impl ServiceAccount {
    /// Strip secret material for external consumption. Keys are sorted
    /// newest first.
    pub fn public_view(&self) -> ServiceAccountView {
        let mut keys: Vec<ServiceAccountKeyView> =
            self.keys.values().map(ServiceAccountKey::public_view).collect();
        keys.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        ServiceAccountView {
            id: self.id.clone(),
            user_id: self.user_id.clone(),
            display_name: self.display_name.clone(),
            disabled: self.disabled,
            scopes: self.scopes.clone(),
            created_at: self.created_at.clone(),
            created_by: self.created_by.clone(),
            keys,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_key(id: &str, created_at: &str) -> ServiceAccountKey {
        ServiceAccountKey {
            id: id.to_string(),
            name: "ci".to_string(),
            prefix: "ugsk_abc1234".to_string(),
            secret_hash: "hash".to_string(),
            secret_salt: "salt".to_string(),
            hash_algorithm: API_KEY_HASH_ALGORITHM.to_string(),
            created_at: created_at.to_string(),
            created_by: "alice".to_string(),
            revoked_at: None,
            rotated_from: None,
            last_used_at: None,
            usage_count: 0,
        }
    }

    #[test]
    fn test_public_view_omits_secret_material() {
        let mut account = ServiceAccount {
            id: "svc-1".to_string(),
            user_id: "service:s1:svc-1".to_string(),
            display_name: "Exporter".to_string(),
            disabled: false,
            scopes: [SpaceAction::EntryRead].into(),
            created_at: "2026-01-01T00:00:00.000Z".to_string(),
            created_by: "alice".to_string(),
            keys: BTreeMap::new(),
        };
        account
            .keys
            .insert("k-old".to_string(), sample_key("k-old", "2026-01-01T00:00:00.000Z"));
        account
            .keys
            .insert("k-new".to_string(), sample_key("k-new", "2026-02-01T00:00:00.000Z"));

        let view = account.public_view();
        assert_eq!(view.keys[0].id, "k-new");
        let raw = serde_json::to_string(&view).unwrap();
        assert!(!raw.contains("secret_hash"));
        assert!(!raw.contains("secret_salt"));
    }
}
