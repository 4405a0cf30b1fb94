//! Request authentication.
//!
//! [`AuthManager`] resolves a [`RequestIdentity`] from request headers:
//! bearer credentials (static or signed) first, then static API keys, and
//! — for space-scoped requests — service-account API keys resolved through
//! the [`ServiceAccountManager`]. The credential set is an explicitly
//! constructed object swapped atomically by [`AuthManager::reload`]; there
//! is no implicit global cache.

use std::sync::{Arc, RwLock};

use serde_json::{Value, json};

use notespace_core::AppError;
use notespace_core::config::auth::AuthConfig;
use notespace_entity::{AuthMethod, RequestIdentity};

use crate::credentials::{CredentialRecord, CredentialSet};
use crate::error::{AuthError, Error};
use crate::headers::{RequestHeaders, RequestMeta};
use crate::service_accounts::ServiceAccountManager;
use crate::token;

/// Coordinates credential verification for incoming requests.
pub struct AuthManager {
    credentials: RwLock<Arc<CredentialSet>>,
}

impl std::fmt::Debug for AuthManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthManager").finish()
    }
}

impl AuthManager {
    /// Create a manager over an already-built credential set.
    pub fn new(credentials: CredentialSet) -> Self {
        Self {
            credentials: RwLock::new(Arc::new(credentials)),
        }
    }

    /// Build the credential set from configuration and wrap it.
    pub fn from_config(config: &AuthConfig) -> Result<Self, AppError> {
        Ok(Self::new(CredentialSet::from_config(config)?))
    }

    /// Rebuild the credential set from configuration and swap it in. The
    /// old set stays in use until the rebuild has fully validated.
    pub fn reload(&self, config: &AuthConfig) -> Result<(), AppError> {
        let rebuilt = Arc::new(CredentialSet::from_config(config)?);
        *self
            .credentials
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner) = rebuilt;
        Ok(())
    }

    fn current(&self) -> Arc<CredentialSet> {
        self.credentials
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }

    /// Resolve the request identity from headers using bearer or static
    /// API-key credentials.
    pub fn authenticate_headers(
        &self,
        headers: &RequestHeaders,
    ) -> Result<RequestIdentity, AuthError> {
        let credentials = self.current();

        if let Some(authorization) = headers.get("authorization").filter(|v| !v.trim().is_empty())
        {
            let Some((scheme, raw_token)) = authorization.trim().split_once(' ') else {
                return Err(AuthError::invalid_credentials(
                    "Authorization header must use Bearer scheme",
                ));
            };
            if !scheme.eq_ignore_ascii_case("bearer") {
                return Err(AuthError::invalid_credentials(
                    "Authorization header must use Bearer scheme",
                ));
            }
            return authenticate_bearer(&credentials, raw_token.trim());
        }

        if let Some(api_key) = headers.get("x-api-key").filter(|v| !v.trim().is_empty()) {
            return authenticate_static_api_key(&credentials, api_key.trim());
        }

        Err(AuthError::missing_credentials(
            "Authentication required. Provide Authorization: Bearer <token> or X-API-Key.",
        ))
    }

    /// Resolve identity for a space-scoped request, falling back from
    /// static API keys to the space's service-account keys.
    pub async fn authenticate_headers_for_space(
        &self,
        service_accounts: &ServiceAccountManager,
        space_id: &str,
        headers: &RequestHeaders,
        meta: &RequestMeta,
    ) -> Result<RequestIdentity, Error> {
        let bearer_present = headers
            .get("authorization")
            .is_some_and(|v| !v.trim().is_empty());
        match self.authenticate_headers(headers) {
            Ok(identity) => Ok(identity),
            Err(err)
                if !bearer_present
                    && err.code == crate::error::AuthErrorCode::InvalidCredentials =>
            {
                // Only an unrecognized X-API-Key falls through to the
                // space's service-account keys; bearer failures are final.
                let Some(api_key) = headers.get("x-api-key").filter(|v| !v.trim().is_empty())
                else {
                    return Err(err.into());
                };
                let auth = service_accounts
                    .resolve_api_key(space_id, api_key, meta)
                    .await?;
                Ok(RequestIdentity {
                    user_id: auth.user_id,
                    auth_method: AuthMethod::ApiKey,
                    principal_type: notespace_entity::PrincipalType::Service,
                    display_name: Some(auth.display_name),
                    key_id: Some(auth.key_id),
                    scopes: auth.scopes,
                    scope_enforced: true,
                    service_account_id: Some(auth.service_account_id),
                })
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Non-secret snapshot of the configured providers, for diagnostics.
    pub fn capabilities_snapshot(&self) -> Value {
        let credentials = self.current();
        let mut active_kids: Vec<&String> = credentials.active_key_ids.iter().collect();
        active_kids.sort();
        let mut revoked_key_ids: Vec<&String> = credentials.revoked_key_ids.iter().collect();
        revoked_key_ids.sort();

        json!({
            "providers": {
                "bearer": {
                    "supports_static_tokens": true,
                    "supports_signed_tokens": true,
                    "configured_static_token_count": credentials.bearer_tokens.len(),
                    "configured_signing_kid_count": credentials.signing_secrets.len(),
                    "active_kids": active_kids,
                },
                "api_key": {
                    "supports_static_api_keys": true,
                    "supports_space_service_account_keys": true,
                    "configured_static_api_key_count": credentials.api_keys.len(),
                    "revoked_key_ids": revoked_key_ids,
                },
            },
            "identity_model": {
                "principal_types": ["user", "service"],
            },
        })
    }
}

fn authenticate_bearer(
    credentials: &CredentialSet,
    raw_token: &str,
) -> Result<RequestIdentity, AuthError> {
    if raw_token.is_empty() {
        return Err(AuthError::missing_credentials("Missing bearer token"));
    }
    if raw_token.starts_with(token::SIGNED_TOKEN_PREFIX) {
        return token::verify(
            raw_token,
            &credentials.signing_secrets,
            &credentials.active_key_ids,
            &credentials.revoked_key_ids,
        );
    }

    let record = credentials
        .bearer_tokens
        .get(raw_token)
        .ok_or_else(|| AuthError::invalid_credentials("Invalid bearer token"))?;
    check_record(credentials, record, "Bearer token has been revoked")?;
    Ok(record.identity(AuthMethod::Bearer))
}

fn authenticate_static_api_key(
    credentials: &CredentialSet,
    key_value: &str,
) -> Result<RequestIdentity, AuthError> {
    let record = credentials
        .api_keys
        .get(key_value)
        .ok_or_else(|| AuthError::invalid_credentials("Invalid API key"))?;
    check_record(credentials, record, "API key has been revoked")?;
    Ok(record.identity(AuthMethod::ApiKey))
}

fn check_record(
    credentials: &CredentialSet,
    record: &CredentialRecord,
    revoked_detail: &str,
) -> Result<(), AuthError> {
    if record
        .key_id
        .as_ref()
        .is_some_and(|key_id| credentials.revoked_key_ids.contains(key_id))
    {
        return Err(AuthError::revoked_key(revoked_detail));
    }
    if record.disabled {
        return Err(AuthError::disabled_identity("Principal is disabled"));
    }
    Ok(())
}
