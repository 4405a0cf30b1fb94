//! Credential configuration parsing.
//!
//! All credential sources are parsed and validated eagerly when the set is
//! built: a malformed entry fails the load with a configuration error
//! instead of surfacing as a confusing request-time failure.

use std::collections::{BTreeSet, HashMap, HashSet};

use serde::Deserialize;

use notespace_core::AppError;
use notespace_core::config::auth::AuthConfig;
use notespace_entity::{AuthMethod, PrincipalType, RequestIdentity, SpaceAction};

use crate::secrets;

/// Fallback user id for the bootstrap credential.
const BOOTSTRAP_USER_ID: &str = "bootstrap-user";

/// A validated credential record resolved from configuration.
#[derive(Debug, Clone)]
pub struct CredentialRecord {
    /// Principal the credential authenticates as.
    pub user_id: String,
    /// Human or service principal.
    pub principal_type: PrincipalType,
    /// Optional display name.
    pub display_name: Option<String>,
    /// Key id, participating in revocation checks when present.
    pub key_id: Option<String>,
    /// Disabled credentials fail with `disabled_identity`.
    pub disabled: bool,
    /// Action scopes attached to the credential.
    pub scopes: BTreeSet<SpaceAction>,
    /// Whether the scopes narrow the effective permission set.
    pub scope_enforced: bool,
    /// Owning service account, when the credential belongs to one.
    pub service_account_id: Option<String>,
}

impl CredentialRecord {
    /// Build the request identity this record authenticates.
    pub fn identity(&self, auth_method: AuthMethod) -> RequestIdentity {
        RequestIdentity {
            user_id: self.user_id.clone(),
            auth_method,
            principal_type: self.principal_type,
            display_name: self.display_name.clone(),
            key_id: self.key_id.clone(),
            scopes: self.scopes.clone(),
            scope_enforced: self.scope_enforced,
            service_account_id: self.service_account_id.clone(),
        }
    }
}

/// Raw wire shape of a configured credential, before validation.
#[derive(Debug, Deserialize)]
struct RawCredential {
    user_id: String,
    #[serde(default)]
    principal_type: Option<String>,
    #[serde(default)]
    display_name: Option<String>,
    #[serde(default)]
    key_id: Option<String>,
    #[serde(default)]
    disabled: bool,
    #[serde(default)]
    scopes: Vec<String>,
    #[serde(default)]
    scope_enforced: bool,
    #[serde(default)]
    service_account_id: Option<String>,
}

impl RawCredential {
    fn validate(self, context: &str) -> Result<CredentialRecord, AppError> {
        if self.user_id.trim().is_empty() {
            return Err(AppError::configuration(format!(
                "{context}: credential user_id must not be empty"
            )));
        }
        let principal_type = match self.principal_type.as_deref() {
            None | Some("user") => PrincipalType::User,
            Some("service") => PrincipalType::Service,
            Some(other) => {
                return Err(AppError::configuration(format!(
                    "{context}: invalid principal_type '{other}'"
                )));
            }
        };
        let mut scopes = BTreeSet::new();
        for raw in &self.scopes {
            let action = raw.parse::<SpaceAction>().map_err(|_| {
                AppError::configuration(format!("{context}: invalid scope '{raw}'"))
            })?;
            scopes.insert(action);
        }
        Ok(CredentialRecord {
            user_id: self.user_id.trim().to_string(),
            principal_type,
            display_name: self.display_name,
            key_id: self.key_id,
            disabled: self.disabled,
            scopes,
            scope_enforced: self.scope_enforced,
            service_account_id: self.service_account_id,
        })
    }
}

/// The full validated credential configuration, built once per load and
/// swapped atomically on reload.
#[derive(Debug, Default)]
pub struct CredentialSet {
    pub(crate) bearer_tokens: HashMap<String, CredentialRecord>,
    pub(crate) api_keys: HashMap<String, CredentialRecord>,
    pub(crate) signing_secrets: HashMap<String, String>,
    pub(crate) active_key_ids: HashSet<String>,
    pub(crate) revoked_key_ids: HashSet<String>,
}

impl CredentialSet {
    /// Parse and validate the credential configuration.
    ///
    /// When no bearer credential is configured at all, a bootstrap token is
    /// installed: the configured value, or a freshly generated random one.
    /// Only a truncated fingerprint of a generated token is ever logged.
    pub fn from_config(config: &AuthConfig) -> Result<Self, AppError> {
        let mut bearer_tokens =
            parse_record_map(config.bearer_tokens_json.as_deref(), "bearer_tokens_json")?;

        if bearer_tokens.is_empty() {
            let (token, generated) = match config.bootstrap_token.as_deref() {
                Some(value) if !value.trim().is_empty() => (value.trim().to_string(), false),
                _ => (secrets::token_urlsafe(32), true),
            };
            if generated {
                tracing::warn!(
                    fingerprint = %secrets::fingerprint(&token),
                    "No bearer credentials configured; generated a one-time bootstrap \
                     token. Configure bootstrap_token or bearer_tokens_json for \
                     deterministic startup credentials."
                );
            }
            let user_id = config
                .bootstrap_user_id
                .as_deref()
                .map(str::trim)
                .filter(|value| !value.is_empty())
                .unwrap_or(BOOTSTRAP_USER_ID)
                .to_string();
            bearer_tokens.insert(
                token,
                CredentialRecord {
                    user_id,
                    principal_type: PrincipalType::User,
                    display_name: Some("Local Bootstrap User".to_string()),
                    key_id: Some("bootstrap".to_string()),
                    disabled: false,
                    scopes: BTreeSet::new(),
                    scope_enforced: false,
                    service_account_id: None,
                },
            );
        }

        let mut api_keys = parse_record_map(config.api_keys_json.as_deref(), "api_keys_json")?;
        for (key, user_id) in parse_key_value_map(config.api_keys.as_deref()) {
            api_keys.insert(
                key,
                CredentialRecord {
                    user_id,
                    principal_type: PrincipalType::Service,
                    display_name: None,
                    key_id: None,
                    disabled: false,
                    scopes: BTreeSet::new(),
                    scope_enforced: false,
                    service_account_id: None,
                },
            );
        }

        Ok(Self {
            bearer_tokens,
            api_keys,
            signing_secrets: parse_key_value_map(config.signing_secrets.as_deref()),
            active_key_ids: parse_string_set(config.active_key_ids.as_deref()),
            revoked_key_ids: parse_string_set(config.revoked_key_ids.as_deref()),
        })
    }
}

fn parse_record_map(
    raw: Option<&str>,
    context: &str,
) -> Result<HashMap<String, CredentialRecord>, AppError> {
    let Some(raw) = raw.map(str::trim).filter(|value| !value.is_empty()) else {
        return Ok(HashMap::new());
    };
    let parsed: HashMap<String, RawCredential> = serde_json::from_str(raw).map_err(|e| {
        AppError::configuration(format!("{context}: malformed credential JSON: {e}"))
    })?;
    let mut records = HashMap::with_capacity(parsed.len());
    for (credential, raw_record) in parsed {
        if credential.trim().is_empty() {
            return Err(AppError::configuration(format!(
                "{context}: credential value must not be empty"
            )));
        }
        records.insert(credential, raw_record.validate(context)?);
    }
    Ok(records)
}

/// Parse a `key:value` comma-list, skipping empty fragments.
fn parse_key_value_map(raw: Option<&str>) -> HashMap<String, String> {
    let mut result = HashMap::new();
    let Some(raw) = raw else {
        return result;
    };
    for pair in raw.split(',') {
        let item = pair.trim();
        if item.is_empty() {
            continue;
        }
        let Some((key, value)) = item.split_once(':') else {
            continue;
        };
        let key = key.trim();
        let value = value.trim();
        if !key.is_empty() && !value.is_empty() {
            result.insert(key.to_string(), value.to_string());
        }
    }
    result
}

/// Parse a comma-separated set, skipping empty fragments.
fn parse_string_set(raw: Option<&str>) -> HashSet<String> {
    raw.map(|value| {
        value
            .split(',')
            .map(str::trim)
            .filter(|item| !item.is_empty())
            .map(str::to_string)
            .collect()
    })
    .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_with(bearer_json: &str) -> AuthConfig {
        AuthConfig {
            bearer_tokens_json: Some(bearer_json.to_string()),
            ..AuthConfig::default()
        }
    }

    #[test]
    fn test_parses_valid_bearer_map() {
        let config = config_with(
            r#"{"tok-1": {"user_id": "alice", "display_name": "Alice", "key_id": "k1"}}"#,
        );
        let set = CredentialSet::from_config(&config).unwrap();
        let record = &set.bearer_tokens["tok-1"];
        assert_eq!(record.user_id, "alice");
        assert_eq!(record.principal_type, PrincipalType::User);
        assert_eq!(record.key_id.as_deref(), Some("k1"));
    }

    #[test]
    fn test_rejects_malformed_json_eagerly() {
        let config = config_with("{not json");
        let err = CredentialSet::from_config(&config).unwrap_err();
        assert_eq!(err.kind, notespace_core::error::ErrorKind::Configuration);
    }

    #[test]
    fn test_rejects_invalid_scope_eagerly() {
        let config =
            config_with(r#"{"tok": {"user_id": "svc", "scopes": ["entry_read", "root_access"]}}"#);
        assert!(CredentialSet::from_config(&config).is_err());
    }

    #[test]
    fn test_rejects_unknown_principal_type() {
        let config = config_with(r#"{"tok": {"user_id": "x", "principal_type": "robot"}}"#);
        assert!(CredentialSet::from_config(&config).is_err());
    }

    #[test]
    fn test_bootstrap_installed_when_no_bearer_config() {
        let config = AuthConfig {
            bootstrap_token: Some("boot-tok".to_string()),
            bootstrap_user_id: Some("ops".to_string()),
            ..AuthConfig::default()
        };
        let set = CredentialSet::from_config(&config).unwrap();
        let record = &set.bearer_tokens["boot-tok"];
        assert_eq!(record.user_id, "ops");
        assert_eq!(record.key_id.as_deref(), Some("bootstrap"));
    }

    #[test]
    fn test_bootstrap_generates_random_token() {
        let set = CredentialSet::from_config(&AuthConfig::default()).unwrap();
        assert_eq!(set.bearer_tokens.len(), 1);
        let token = set.bearer_tokens.keys().next().unwrap();
        assert!(token.len() >= 32);
    }

    #[test]
    fn test_simple_api_key_list_yields_service_records() {
        let config = AuthConfig {
            api_keys: Some("key-1:svc-bot, key-2:other-bot".to_string()),
            ..AuthConfig::default()
        };
        let set = CredentialSet::from_config(&config).unwrap();
        assert_eq!(set.api_keys["key-1"].user_id, "svc-bot");
        assert_eq!(set.api_keys["key-1"].principal_type, PrincipalType::Service);
        assert_eq!(set.api_keys.len(), 2);
    }

    #[test]
    fn test_signing_secret_and_set_parsing() {
        let config = AuthConfig {
            signing_secrets: Some("k1:secret-one,k2:secret-two".to_string()),
            active_key_ids: Some("k1, k2".to_string()),
            revoked_key_ids: Some("k0".to_string()),
            ..AuthConfig::default()
        };
        let set = CredentialSet::from_config(&config).unwrap();
        assert_eq!(set.signing_secrets["k1"], "secret-one");
        assert!(set.active_key_ids.contains("k2"));
        assert!(set.revoked_key_ids.contains("k0"));
    }
}
