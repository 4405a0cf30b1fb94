//! Service accounts and scoped API-key credentials for automation access.
//!
//! Key secrets are `"ugsk_" + 32 random url-safe bytes`, revealed exactly
//! once at creation or rotation. Only a PBKDF2-HMAC-SHA256 digest, the
//! random salt, and a 12-character display prefix are persisted;
//! resolution recomputes the digest and compares in constant time.

use std::collections::BTreeSet;
use std::sync::Arc;

use pbkdf2::pbkdf2_hmac;
use sha2::Sha256;
use subtle::ConstantTimeEq;

use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;

use notespace_core::types::time;
use notespace_core::AppError;
use notespace_entity::audit::{AuditEventInput, AuditOutcome};
use notespace_entity::service_account::API_KEY_HASH_ALGORITHM;
use notespace_entity::{
    ServiceAccount, ServiceAccountKey, ServiceAccountKeyView, ServiceAccountView, SpaceAction,
    SpaceSettings,
};
use notespace_store::{SpaceLocks, SpaceStore};

use crate::audit::AuditLog;
use crate::error::{AuthError, Error};
use crate::headers::RequestMeta;
use crate::secrets;

/// Prefix of every service-account key secret.
pub const API_KEY_SECRET_PREFIX: &str = "ugsk_";

const API_KEY_HASH_ITERATIONS: u32 = 240_000;
const API_KEY_HASH_LEN: usize = 32;
const API_KEY_SALT_BYTES: usize = 16;
const API_KEY_DISPLAY_PREFIX_LEN: usize = 12;

/// Payload for creating a service account.
#[derive(Debug, Clone)]
pub struct CreateServiceAccountInput {
    /// Human-facing account name.
    pub display_name: String,
    /// Requested scopes as wire strings; normalized, deduplicated, and
    /// validated against the action vocabulary. Must be non-empty.
    pub scopes: Vec<String>,
    /// Acting principal.
    pub created_by: String,
}

/// Payload for creating a service-account API key.
#[derive(Debug, Clone)]
pub struct CreateServiceAccountKeyInput {
    /// Owning account id.
    pub service_account_id: String,
    /// Human-facing key name.
    pub key_name: String,
    /// Acting principal.
    pub created_by: String,
    /// Id of the key this one replaces, for rotation.
    pub rotated_from: Option<String>,
}

/// Payload for rotating a service-account API key.
#[derive(Debug, Clone)]
pub struct RotateServiceAccountKeyInput {
    /// Owning account id.
    pub service_account_id: String,
    /// Key to rotate out.
    pub key_id: String,
    /// Acting principal.
    pub rotated_by: String,
    /// Name for the replacement key; defaults to `rotated-<key_id>`.
    pub key_name: Option<String>,
}

/// Payload for revoking a service-account API key.
#[derive(Debug, Clone)]
pub struct RevokeServiceAccountKeyInput {
    /// Owning account id.
    pub service_account_id: String,
    /// Key to revoke.
    pub key_id: String,
    /// Acting principal.
    pub revoked_by: String,
}

/// Result of key creation or rotation. `secret` is the only copy of the
/// raw secret that will ever exist.
#[derive(Debug, Clone)]
pub struct ServiceAccountKeyCreated {
    /// Owning account id.
    pub service_account_id: String,
    /// Public metadata of the new key.
    pub key: ServiceAccountKeyView,
    /// The one-time secret.
    pub secret: String,
}

/// Resolved identity details for a verified service-account API key.
#[derive(Debug, Clone)]
pub struct ServiceKeyAuth {
    /// Synthetic principal id of the account.
    pub user_id: String,
    /// Owning account id.
    pub service_account_id: String,
    /// Account display name.
    pub display_name: String,
    /// The key that authenticated.
    pub key_id: String,
    /// The account's scope set.
    pub scopes: BTreeSet<SpaceAction>,
}

/// Issues, verifies, rotates, and revokes scoped API-key credentials.
pub struct ServiceAccountManager {
    store: Arc<dyn SpaceStore>,
    locks: Arc<SpaceLocks>,
    audit: Arc<AuditLog>,
}

impl std::fmt::Debug for ServiceAccountManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceAccountManager").finish()
    }
}

impl ServiceAccountManager {
    /// Create a manager over a space store and audit log.
    pub fn new(store: Arc<dyn SpaceStore>, locks: Arc<SpaceLocks>, audit: Arc<AuditLog>) -> Self {
        Self { store, locks, audit }
    }

    /// List service accounts with key metadata, newest account first.
    pub async fn list_accounts(&self, space_id: &str) -> Result<Vec<ServiceAccountView>, AppError> {
        let doc = self.store.get_space(space_id).await?;
        let settings = SpaceSettings::from_doc(&doc)?;
        let mut views: Vec<ServiceAccountView> = settings
            .service_accounts
            .values()
            .map(ServiceAccount::public_view)
            .collect();
        views.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(views)
    }

    /// Create a service account with explicit action scopes.
    pub async fn create_account(
        &self,
        space_id: &str,
        input: CreateServiceAccountInput,
    ) -> Result<ServiceAccountView, AppError> {
        let display_name = input.display_name.trim().to_string();
        if display_name.is_empty() {
            return Err(AppError::validation("display_name must not be empty"));
        }
        let created_by = input.created_by.trim().to_string();
        if created_by.is_empty() {
            return Err(AppError::validation("created_by must not be empty"));
        }
        let scopes = normalize_scopes(&input.scopes)?;

        let account = {
            let lock = self.locks.for_space(space_id);
            let _guard = lock.lock().await;

            let doc = self.store.get_space(space_id).await?;
            let mut settings = SpaceSettings::from_doc(&doc)?;

            let account_id = format!("svc-{}", secrets::token_hex(8));
            let account = ServiceAccount {
                user_id: format!("service:{space_id}:{account_id}"),
                id: account_id.clone(),
                display_name,
                disabled: false,
                scopes,
                created_at: time::now_iso(),
                created_by: created_by.clone(),
                keys: Default::default(),
            };
            settings
                .service_accounts
                .insert(account_id, account.clone());
            self.persist(space_id, &settings).await?;
            account
        };

        let scope_list = account
            .scopes
            .iter()
            .map(SpaceAction::as_str)
            .collect::<Vec<_>>()
            .join(",");
        self.audit
            .append(
                space_id,
                AuditEventInput::new("service_account.create", created_by, AuditOutcome::Success)
                    .with_target("service_account", account.id.clone())
                    .with_metadata("scopes", scope_list),
            )
            .await?;

        tracing::info!(space_id, account_id = %account.id, "service account created");
        Ok(account.public_view())
    }

    /// Create an API key for an account, returning the secret exactly once.
    pub async fn create_key(
        &self,
        space_id: &str,
        input: CreateServiceAccountKeyInput,
    ) -> Result<ServiceAccountKeyCreated, AppError> {
        let service_account_id = input.service_account_id.trim().to_string();
        if service_account_id.is_empty() {
            return Err(AppError::validation("service_account_id must not be empty"));
        }
        let key_name = input.key_name.trim().to_string();
        if key_name.is_empty() {
            return Err(AppError::validation("key_name must not be empty"));
        }
        let created_by = input.created_by.trim().to_string();
        if created_by.is_empty() {
            return Err(AppError::validation("created_by must not be empty"));
        }

        let secret = format!("{API_KEY_SECRET_PREFIX}{}", secrets::token_urlsafe(32));
        let secret_salt = secrets::token_urlsafe(API_KEY_SALT_BYTES);
        let secret_hash = hash_secret(&secret, &secret_salt);
        let key_id = format!("sak-{}", secrets::token_hex(8));

        let key = {
            let lock = self.locks.for_space(space_id);
            let _guard = lock.lock().await;

            let doc = self.store.get_space(space_id).await?;
            let mut settings = SpaceSettings::from_doc(&doc)?;
            let account = settings
                .service_accounts
                .get_mut(&service_account_id)
                .ok_or_else(|| {
                    AppError::not_found(format!("Service account not found: {service_account_id}"))
                })?;

            let key = ServiceAccountKey {
                id: key_id.clone(),
                name: key_name,
                prefix: secret[..API_KEY_DISPLAY_PREFIX_LEN].to_string(),
                secret_hash,
                secret_salt,
                hash_algorithm: API_KEY_HASH_ALGORITHM.to_string(),
                created_at: time::now_iso(),
                created_by: created_by.clone(),
                revoked_at: None,
                rotated_from: input.rotated_from,
                last_used_at: None,
                usage_count: 0,
            };
            account.keys.insert(key_id.clone(), key.clone());
            self.persist(space_id, &settings).await?;
            key
        };

        self.audit
            .append(
                space_id,
                AuditEventInput::new(
                    "service_account.key.create",
                    created_by,
                    AuditOutcome::Success,
                )
                .with_target("service_account_key", key_id)
                .with_metadata("service_account_id", service_account_id.clone()),
            )
            .await?;

        Ok(ServiceAccountKeyCreated {
            service_account_id,
            key: key.public_view(),
            secret,
        })
    }

    /// Revoke an API key. Idempotent: an already-revoked key keeps its
    /// original revocation timestamp.
    pub async fn revoke_key(
        &self,
        space_id: &str,
        input: RevokeServiceAccountKeyInput,
    ) -> Result<ServiceAccountKeyView, AppError> {
        let service_account_id = input.service_account_id.trim().to_string();
        if service_account_id.is_empty() {
            return Err(AppError::validation("service_account_id must not be empty"));
        }
        let key_id = input.key_id.trim().to_string();
        if key_id.is_empty() {
            return Err(AppError::validation("key_id must not be empty"));
        }
        let revoked_by = input.revoked_by.trim().to_string();
        if revoked_by.is_empty() {
            return Err(AppError::validation("revoked_by must not be empty"));
        }

        let key = {
            let lock = self.locks.for_space(space_id);
            let _guard = lock.lock().await;

            let doc = self.store.get_space(space_id).await?;
            let mut settings = SpaceSettings::from_doc(&doc)?;
            let account = settings
                .service_accounts
                .get_mut(&service_account_id)
                .ok_or_else(|| {
                    AppError::not_found(format!("Service account not found: {service_account_id}"))
                })?;
            let key = account.keys.get_mut(&key_id).ok_or_else(|| {
                AppError::not_found(format!("Service account key not found: {key_id}"))
            })?;

            if key.revoked_at.is_none() {
                key.revoked_at = Some(time::now_iso());
            }
            let key = key.clone();
            self.persist(space_id, &settings).await?;
            key
        };

        self.audit
            .append(
                space_id,
                AuditEventInput::new(
                    "service_account.key.revoke",
                    revoked_by,
                    AuditOutcome::Success,
                )
                .with_target("service_account_key", key_id)
                .with_metadata("service_account_id", service_account_id),
            )
            .await?;

        Ok(key.public_view())
    }

    /// Rotate an API key: revoke the old key and mint a replacement whose
    /// `rotated_from` points back at it. Returns the new one-time secret.
    pub async fn rotate_key(
        &self,
        space_id: &str,
        input: RotateServiceAccountKeyInput,
    ) -> Result<ServiceAccountKeyCreated, AppError> {
        self.revoke_key(
            space_id,
            RevokeServiceAccountKeyInput {
                service_account_id: input.service_account_id.clone(),
                key_id: input.key_id.clone(),
                revoked_by: input.rotated_by.clone(),
            },
        )
        .await?;

        let created = self
            .create_key(
                space_id,
                CreateServiceAccountKeyInput {
                    service_account_id: input.service_account_id.clone(),
                    key_name: input
                        .key_name
                        .unwrap_or_else(|| format!("rotated-{}", input.key_id)),
                    created_by: input.rotated_by.clone(),
                    rotated_from: Some(input.key_id.clone()),
                },
            )
            .await?;

        self.audit
            .append(
                space_id,
                AuditEventInput::new(
                    "service_account.key.rotate",
                    input.rotated_by,
                    AuditOutcome::Success,
                )
                .with_target("service_account_key", input.key_id)
                .with_metadata("service_account_id", input.service_account_id),
            )
            .await?;

        Ok(created)
    }

    /// Resolve a space-scoped API key secret to a service identity and
    /// record the use.
    ///
    /// A structurally matching but revoked key fails with the distinct
    /// `revoked_key` code even though its secret is valid; anything else
    /// that does not match fails as `invalid_credentials`.
    pub async fn resolve_api_key(
        &self,
        space_id: &str,
        key_secret: &str,
        meta: &RequestMeta,
    ) -> Result<ServiceKeyAuth, Error> {
        let secret = key_secret.trim();
        if secret.is_empty() {
            return Err(AuthError::missing_credentials("Missing API key").into());
        }

        let (auth, usage_count) = {
            let lock = self.locks.for_space(space_id);
            let _guard = lock.lock().await;

            let doc = self.store.get_space(space_id).await?;
            let mut settings = SpaceSettings::from_doc(&doc)?;

            let mut matched: Option<(String, String)> = None;
            for (account_id, account) in &settings.service_accounts {
                if account.disabled {
                    continue;
                }
                for (key_id, key) in &account.keys {
                    if !verify_secret(key, secret) {
                        continue;
                    }
                    if key.revoked_at.is_some() {
                        return Err(AuthError::revoked_key("API key has been revoked").into());
                    }
                    matched = Some((account_id.clone(), key_id.clone()));
                    break;
                }
                if matched.is_some() {
                    break;
                }
            }

            let Some((account_id, key_id)) = matched else {
                return Err(AuthError::invalid_credentials("Invalid API key").into());
            };

            let account = settings
                .service_accounts
                .get_mut(&account_id)
                .ok_or_else(|| AppError::internal("matched service account disappeared"))?;
            let scopes = account.scopes.clone();
            let user_id = account.user_id.clone();
            let display_name = account.display_name.clone();
            let key = account
                .keys
                .get_mut(&key_id)
                .ok_or_else(|| AppError::internal("matched service key disappeared"))?;
            key.last_used_at = Some(time::now_iso());
            key.usage_count += 1;
            let usage_count = key.usage_count;

            self.persist(space_id, &settings).await?;
            (
                ServiceKeyAuth {
                    user_id,
                    service_account_id: account_id,
                    display_name,
                    key_id,
                    scopes,
                },
                usage_count,
            )
        };

        self.audit
            .append(
                space_id,
                AuditEventInput {
                    action: "service_account.key.use".to_string(),
                    actor_user_id: auth.user_id.clone(),
                    outcome: Some(AuditOutcome::Success),
                    target_type: Some("service_account_key".to_string()),
                    target_id: Some(auth.key_id.clone()),
                    request_method: meta.method.clone(),
                    request_path: meta.path.clone(),
                    request_id: meta.request_id.clone(),
                    metadata: [
                        (
                            "service_account_id".to_string(),
                            auth.service_account_id.clone(),
                        ),
                        ("usage_count".to_string(), usage_count.to_string()),
                    ]
                    .into(),
                },
            )
            .await?;

        Ok(auth)
    }

    /// Write the settings patch back. Callers hold the space lock.
    async fn persist(&self, space_id: &str, settings: &SpaceSettings) -> Result<(), AppError> {
        let settings_value = serde_json::to_value(settings)?;
        let patch = serde_json::json!({ "settings": settings_value });
        self.store.patch_space(space_id, &patch).await?;
        Ok(())
    }
}

/// Normalize requested scope strings: trim, drop empties, deduplicate,
/// and validate against the action vocabulary. Empty after normalization
/// is an error.
fn normalize_scopes(raw: &[String]) -> Result<BTreeSet<SpaceAction>, AppError> {
    let mut scopes = BTreeSet::new();
    let mut invalid = Vec::new();
    for item in raw {
        let trimmed = item.trim();
        if trimmed.is_empty() {
            continue;
        }
        match trimmed.parse::<SpaceAction>() {
            Ok(action) => {
                scopes.insert(action);
            }
            Err(_) => invalid.push(trimmed.to_string()),
        }
    }
    if !invalid.is_empty() {
        invalid.sort();
        return Err(AppError::validation(format!(
            "invalid service account scope(s): {}",
            invalid.join(", ")
        )));
    }
    if scopes.is_empty() {
        return Err(AppError::validation("service account scopes must not be empty"));
    }
    Ok(scopes)
}

/// PBKDF2-HMAC-SHA256 digest of a secret, base64url-encoded.
fn hash_secret(secret: &str, salt: &str) -> String {
    let mut derived = [0u8; API_KEY_HASH_LEN];
    pbkdf2_hmac::<Sha256>(
        secret.as_bytes(),
        salt.as_bytes(),
        API_KEY_HASH_ITERATIONS,
        &mut derived,
    );
    URL_SAFE_NO_PAD.encode(derived)
}

/// Recompute the digest for a presented secret and compare it against the
/// stored hash in constant time.
fn verify_secret(key: &ServiceAccountKey, secret: &str) -> bool {
    if key.hash_algorithm != API_KEY_HASH_ALGORITHM {
        return false;
    }
    if key.secret_salt.is_empty() {
        return false;
    }
    let expected = hash_secret(secret, &key.secret_salt);
    if expected.len() != key.secret_hash.len() {
        return false;
    }
    bool::from(expected.as_bytes().ct_eq(key.secret_hash.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    use notespace_core::config::audit::AuditConfig;
    use notespace_entity::audit::AuditListFilter;
    use notespace_store::MemoryStore;

    use crate::error::AuthErrorCode;

    fn setup() -> (ServiceAccountManager, Arc<MemoryStore>, Arc<AuditLog>) {
        let store = Arc::new(MemoryStore::new());
        store.put_space("s1", json!({"owner_user_id": "alice", "settings": {}}));
        let locks = Arc::new(SpaceLocks::new());
        let audit = Arc::new(AuditLog::new(
            store.clone(),
            locks.clone(),
            &AuditConfig::default(),
        ));
        let manager = ServiceAccountManager::new(store.clone(), locks, audit.clone());
        (manager, store, audit)
    }

    fn account_input() -> CreateServiceAccountInput {
        CreateServiceAccountInput {
            display_name: "Exporter".to_string(),
            scopes: vec!["entry_read".to_string(), "entry_read".to_string(), "sql_read".to_string()],
            created_by: "alice".to_string(),
        }
    }

    #[tokio::test]
    async fn test_create_account_normalizes_scopes() {
        let (manager, _store, audit) = setup();
        let view = manager.create_account("s1", account_input()).await.unwrap();
        assert!(view.id.starts_with("svc-"));
        assert_eq!(view.user_id, format!("service:s1:{}", view.id));
        assert_eq!(
            view.scopes,
            [SpaceAction::EntryRead, SpaceAction::SqlRead].into()
        );

        let page = audit.list("s1", AuditListFilter::default()).await.unwrap();
        assert_eq!(page.items[0].action, "service_account.create");
    }

    #[tokio::test]
    async fn test_create_account_rejects_bad_scopes() {
        let (manager, _store, _audit) = setup();
        let err = manager
            .create_account(
                "s1",
                CreateServiceAccountInput {
                    scopes: vec!["entry_read".to_string(), "launch_missiles".to_string()],
                    ..account_input()
                },
            )
            .await
            .unwrap_err();
        assert!(err.message.contains("launch_missiles"));

        assert!(manager
            .create_account(
                "s1",
                CreateServiceAccountInput {
                    scopes: vec!["  ".to_string()],
                    ..account_input()
                },
            )
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_key_secret_revealed_once_and_never_stored() {
        let (manager, store, _audit) = setup();
        let account = manager.create_account("s1", account_input()).await.unwrap();
        let created = manager
            .create_key(
                "s1",
                CreateServiceAccountKeyInput {
                    service_account_id: account.id.clone(),
                    key_name: "ci".to_string(),
                    created_by: "alice".to_string(),
                    rotated_from: None,
                },
            )
            .await
            .unwrap();

        assert!(created.secret.starts_with(API_KEY_SECRET_PREFIX));
        assert_eq!(created.key.prefix, &created.secret[..12]);

        let doc = store.get_space("s1").await.unwrap();
        assert!(!serde_json::to_string(&doc).unwrap().contains(&created.secret));
    }

    #[tokio::test]
    async fn test_resolve_returns_scopes_and_counts_usage() {
        let (manager, _store, audit) = setup();
        let account = manager.create_account("s1", account_input()).await.unwrap();
        let created = manager
            .create_key(
                "s1",
                CreateServiceAccountKeyInput {
                    service_account_id: account.id.clone(),
                    key_name: "ci".to_string(),
                    created_by: "alice".to_string(),
                    rotated_from: None,
                },
            )
            .await
            .unwrap();

        let auth = manager
            .resolve_api_key("s1", &created.secret, &RequestMeta::default())
            .await
            .unwrap();
        assert_eq!(auth.service_account_id, account.id);
        assert_eq!(auth.user_id, account.user_id);
        assert_eq!(auth.scopes, account.scopes);

        let auth = manager
            .resolve_api_key("s1", &created.secret, &RequestMeta::default())
            .await
            .unwrap();
        assert_eq!(auth.key_id, created.key.id);

        let accounts = manager.list_accounts("s1").await.unwrap();
        assert_eq!(accounts[0].keys[0].usage_count, 2);
        assert!(accounts[0].keys[0].last_used_at.is_some());

        let page = audit
            .list(
                "s1",
                AuditListFilter {
                    action: Some("service_account.key.use".to_string()),
                    ..AuditListFilter::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(page.total, 2);
        assert_eq!(page.items[0].metadata["usage_count"], "2");
    }

    #[tokio::test]
    async fn test_revoked_key_fails_as_revoked_not_invalid() {
        let (manager, _store, _audit) = setup();
        let account = manager.create_account("s1", account_input()).await.unwrap();
        let created = manager
            .create_key(
                "s1",
                CreateServiceAccountKeyInput {
                    service_account_id: account.id.clone(),
                    key_name: "ci".to_string(),
                    created_by: "alice".to_string(),
                    rotated_from: None,
                },
            )
            .await
            .unwrap();

        let view = manager
            .revoke_key(
                "s1",
                RevokeServiceAccountKeyInput {
                    service_account_id: account.id.clone(),
                    key_id: created.key.id.clone(),
                    revoked_by: "alice".to_string(),
                },
            )
            .await
            .unwrap();
        let revoked_at = view.revoked_at.clone().unwrap();

        // Idempotent: a second revoke keeps the original timestamp.
        let view = manager
            .revoke_key(
                "s1",
                RevokeServiceAccountKeyInput {
                    service_account_id: account.id.clone(),
                    key_id: created.key.id.clone(),
                    revoked_by: "alice".to_string(),
                },
            )
            .await
            .unwrap();
        assert_eq!(view.revoked_at.as_deref(), Some(revoked_at.as_str()));

        let err = manager
            .resolve_api_key("s1", &created.secret, &RequestMeta::default())
            .await
            .unwrap_err();
        match err {
            Error::Auth(auth_err) => assert_eq!(auth_err.code, AuthErrorCode::RevokedKey),
            other => panic!("expected revoked_key, got {other:?}"),
        }

        let err = manager
            .resolve_api_key("s1", "ugsk_completely-unknown", &RequestMeta::default())
            .await
            .unwrap_err();
        match err {
            Error::Auth(auth_err) => {
                assert_eq!(auth_err.code, AuthErrorCode::InvalidCredentials)
            }
            other => panic!("expected invalid_credentials, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_rotate_revokes_old_and_links_new() {
        let (manager, _store, audit) = setup();
        let account = manager.create_account("s1", account_input()).await.unwrap();
        let old = manager
            .create_key(
                "s1",
                CreateServiceAccountKeyInput {
                    service_account_id: account.id.clone(),
                    key_name: "ci".to_string(),
                    created_by: "alice".to_string(),
                    rotated_from: None,
                },
            )
            .await
            .unwrap();

        let rotated = manager
            .rotate_key(
                "s1",
                RotateServiceAccountKeyInput {
                    service_account_id: account.id.clone(),
                    key_id: old.key.id.clone(),
                    rotated_by: "alice".to_string(),
                    key_name: None,
                },
            )
            .await
            .unwrap();
        assert_eq!(rotated.key.rotated_from.as_deref(), Some(old.key.id.as_str()));
        assert_ne!(rotated.secret, old.secret);

        // Old secret is now rejected as revoked; the new one resolves.
        assert!(manager
            .resolve_api_key("s1", &old.secret, &RequestMeta::default())
            .await
            .is_err());
        manager
            .resolve_api_key("s1", &rotated.secret, &RequestMeta::default())
            .await
            .unwrap();

        let page = audit
            .list(
                "s1",
                AuditListFilter {
                    action: Some("service_account.key.rotate".to_string()),
                    ..AuditListFilter::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(page.total, 1);
    }

    #[tokio::test]
    async fn test_disabled_account_cannot_authenticate() {
        let (manager, store, _audit) = setup();
        let account = manager.create_account("s1", account_input()).await.unwrap();
        let created = manager
            .create_key(
                "s1",
                CreateServiceAccountKeyInput {
                    service_account_id: account.id.clone(),
                    key_name: "ci".to_string(),
                    created_by: "alice".to_string(),
                    rotated_from: None,
                },
            )
            .await
            .unwrap();

        let account_id = account.id.as_str();
        store
            .patch_space(
                "s1",
                &json!({"settings": {"service_accounts": {account_id: {"disabled": true}}}}),
            )
            .await
            .unwrap();

        let err = manager
            .resolve_api_key("s1", &created.secret, &RequestMeta::default())
            .await
            .unwrap_err();
        match err {
            Error::Auth(auth_err) => {
                assert_eq!(auth_err.code, AuthErrorCode::InvalidCredentials)
            }
            other => panic!("expected invalid_credentials, got {other:?}"),
        }
    }

    #[test]
    fn test_pbkdf2_verification_is_deterministic() {
        let key = ServiceAccountKey {
            id: "sak-1".to_string(),
            name: "ci".to_string(),
            prefix: "ugsk_abc1234".to_string(),
            secret_hash: hash_secret("ugsk_secret-value", "salt-1"),
            secret_salt: "salt-1".to_string(),
            hash_algorithm: API_KEY_HASH_ALGORITHM.to_string(),
            created_at: "2026-01-01T00:00:00.000Z".to_string(),
            created_by: "alice".to_string(),
            revoked_at: None,
            rotated_from: None,
            last_used_at: None,
            usage_count: 0,
        };
        assert!(verify_secret(&key, "ugsk_secret-value"));
        assert!(verify_secret(&key, "ugsk_secret-value"));
        assert!(!verify_secret(&key, "ugsk_secret-valuX"));

        let mut other_algorithm = key.clone();
        other_algorithm.hash_algorithm = "md5".to_string();
        assert!(!verify_secret(&other_algorithm, "ugsk_secret-value"));
    }
}
