//! Signed bearer tokens.
//!
//! Format: `v1.<base64url(JSON payload)>.<base64url(HMAC-SHA256 signature)>`
//! with unpadded url-safe base64. The signature covers the raw payload
//! segment and is keyed by the secret registered for the payload's `kid`.

use std::collections::BTreeSet;
use std::collections::{HashMap, HashSet};

use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::Utc;
use hmac::{Hmac, Mac};
use serde::Serialize;
use serde_json::Value;
use sha2::Sha256;

use notespace_core::AppError;
use notespace_entity::{AuthMethod, PrincipalType, RequestIdentity, SpaceAction};

use crate::error::AuthError;

type HmacSha256 = Hmac<Sha256>;

/// Scheme prefix of signed bearer tokens.
pub const SIGNED_TOKEN_PREFIX: &str = "v1.";

const SIGNED_TOKEN_PARTS: usize = 3;

/// Claims carried by a signed bearer token.
///
/// Used by tests and operator tooling to mint tokens; verification works
/// on the raw payload so unknown fields never break older verifiers.
#[derive(Debug, Clone, Serialize)]
pub struct SignedTokenClaims {
    /// Signing key id.
    pub kid: String,
    /// Subject user id.
    pub sub: String,
    /// Expiry as unix seconds.
    pub exp: i64,
    /// Disabled principals are rejected even with a valid signature.
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub disabled: bool,
    /// Principal type; defaults to `user` when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub principal_type: Option<PrincipalType>,
    /// Optional display name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    /// Action scopes attached to the token.
    #[serde(skip_serializing_if = "BTreeSet::is_empty")]
    pub scopes: BTreeSet<SpaceAction>,
    /// Whether the scopes narrow the effective permission set.
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub scope_enforced: bool,
    /// Owning service account, when the token belongs to one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service_account_id: Option<String>,
}

impl SignedTokenClaims {
    /// Minimal claims: key id, subject, and expiry.
    pub fn new(kid: impl Into<String>, sub: impl Into<String>, exp: i64) -> Self {
        Self {
            kid: kid.into(),
            sub: sub.into(),
            exp,
            disabled: false,
            principal_type: None,
            display_name: None,
            scopes: BTreeSet::new(),
            scope_enforced: false,
            service_account_id: None,
        }
    }
}

/// Mint a signed bearer token from claims and the signing secret.
pub fn issue(claims: &SignedTokenClaims, secret: &str) -> Result<String, AppError> {
    let payload = serde_json::to_vec(claims)?;
    let payload_segment = URL_SAFE_NO_PAD.encode(payload);
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| AppError::internal(format!("HMAC key setup failed: {e}")))?;
    mac.update(payload_segment.as_bytes());
    let signature = URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());
    Ok(format!("v1.{payload_segment}.{signature}"))
}

/// Verify a signed bearer token and resolve the identity it asserts.
///
/// Checks run in a fixed order so every failure maps to a specific error
/// code: token structure, payload shape, key id status, signature
/// (constant-time), expiry, and the disabled flag. Any failure is final;
/// there is no partial success.
pub(crate) fn verify(
    token: &str,
    signing_secrets: &HashMap<String, String>,
    active_key_ids: &HashSet<String>,
    revoked_key_ids: &HashSet<String>,
) -> Result<RequestIdentity, AuthError> {
    let parts: Vec<&str> = token.split('.').collect();
    if parts.len() != SIGNED_TOKEN_PARTS {
        return Err(AuthError::invalid_signature("Malformed signed bearer token"));
    }
    let payload_segment = parts[1];
    let signature_segment = parts[2];

    let payload_bytes = URL_SAFE_NO_PAD
        .decode(payload_segment)
        .map_err(|_| AuthError::invalid_signature("Malformed signed bearer token"))?;
    let signature_bytes = URL_SAFE_NO_PAD
        .decode(signature_segment)
        .map_err(|_| AuthError::invalid_signature("Malformed signed bearer token"))?;

    let payload: Value = serde_json::from_slice(&payload_bytes)
        .map_err(|_| AuthError::invalid_signature("Invalid signed token payload"))?;
    let payload = payload
        .as_object()
        .ok_or_else(|| AuthError::invalid_signature("Invalid signed token payload"))?;

    let kid = payload
        .get("kid")
        .and_then(Value::as_str)
        .filter(|value| !value.is_empty())
        .ok_or_else(|| AuthError::invalid_signature("Signed token missing key id"))?;
    if !active_key_ids.is_empty() && !active_key_ids.contains(kid) {
        return Err(AuthError::revoked_key("Token signed by inactive key"));
    }
    if revoked_key_ids.contains(kid) {
        return Err(AuthError::revoked_key("Token key id has been revoked"));
    }
    let secret = signing_secrets
        .get(kid)
        .ok_or_else(|| AuthError::invalid_signature("Unknown token signing key"))?;

    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|_| AuthError::invalid_signature("Invalid token signing key"))?;
    mac.update(payload_segment.as_bytes());
    mac.verify_slice(&signature_bytes)
        .map_err(|_| AuthError::invalid_signature("Invalid bearer token signature"))?;

    let exp = payload
        .get("exp")
        .and_then(Value::as_f64)
        .ok_or_else(|| AuthError::invalid_credentials("Signed token missing exp"))?;
    if exp < Utc::now().timestamp() as f64 {
        return Err(AuthError::expired_token("Bearer token has expired"));
    }

    if payload
        .get("disabled")
        .and_then(Value::as_bool)
        .unwrap_or(false)
    {
        return Err(AuthError::disabled_identity("Principal is disabled"));
    }

    let user_id = payload
        .get("sub")
        .and_then(Value::as_str)
        .filter(|value| !value.is_empty())
        .ok_or_else(|| AuthError::invalid_credentials("Signed token missing subject"))?;

    let principal_type = match payload.get("principal_type").and_then(Value::as_str) {
        None | Some("user") => PrincipalType::User,
        Some("service") => PrincipalType::Service,
        Some(_) => return Err(AuthError::invalid_credentials("Invalid principal type")),
    };

    Ok(RequestIdentity {
        user_id: user_id.to_string(),
        auth_method: AuthMethod::Bearer,
        principal_type,
        display_name: payload
            .get("display_name")
            .and_then(Value::as_str)
            .map(str::to_string),
        key_id: Some(kid.to_string()),
        scopes: parse_scopes(payload.get("scopes")),
        scope_enforced: payload
            .get("scope_enforced")
            .and_then(Value::as_bool)
            .unwrap_or(false),
        service_account_id: payload
            .get("service_account_id")
            .and_then(Value::as_str)
            .map(str::to_string),
    })
}

/// Parse the scopes array of a verified payload. Entries that are not
/// known action names are dropped; the signature already vouched for the
/// payload, so this only filters vocabulary drift.
fn parse_scopes(value: Option<&Value>) -> BTreeSet<SpaceAction> {
    value
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .filter_map(|raw| raw.parse::<SpaceAction>().ok())
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AuthErrorCode;

    fn secrets_for(kid: &str, secret: &str) -> HashMap<String, String> {
        [(kid.to_string(), secret.to_string())].into()
    }

    fn far_future() -> i64 {
        Utc::now().timestamp() + 3600
    }

    #[test]
    fn test_issue_then_verify_round_trips_claims() {
        let mut claims = SignedTokenClaims::new("k1", "alice", far_future());
        claims.display_name = Some("Alice".to_string());
        claims.scopes = [SpaceAction::EntryRead, SpaceAction::SqlRead].into();
        claims.scope_enforced = true;
        let token = issue(&claims, "topsecret").unwrap();
        assert!(token.starts_with(SIGNED_TOKEN_PREFIX));

        let identity = verify(
            &token,
            &secrets_for("k1", "topsecret"),
            &HashSet::new(),
            &HashSet::new(),
        )
        .unwrap();
        assert_eq!(identity.user_id, "alice");
        assert_eq!(identity.key_id.as_deref(), Some("k1"));
        assert_eq!(identity.display_name.as_deref(), Some("Alice"));
        assert!(identity.scope_enforced);
        assert_eq!(
            identity.scopes,
            [SpaceAction::EntryRead, SpaceAction::SqlRead].into()
        );
    }

    #[test]
    fn test_flipped_payload_byte_fails_signature() {
        let claims = SignedTokenClaims::new("k1", "alice", far_future());
        let token = issue(&claims, "topsecret").unwrap();

        // Flip one character inside the payload segment without re-signing.
        let mut parts: Vec<String> = token.split('.').map(str::to_string).collect();
        let mut payload: Vec<u8> = parts[1].clone().into_bytes();
        payload[3] = if payload[3] == b'A' { b'B' } else { b'A' };
        parts[1] = String::from_utf8(payload).unwrap();
        let tampered = parts.join(".");

        let err = verify(
            &tampered,
            &secrets_for("k1", "topsecret"),
            &HashSet::new(),
            &HashSet::new(),
        )
        .unwrap_err();
        assert_eq!(err.code, AuthErrorCode::InvalidSignature);
    }

    #[test]
    fn test_expired_token() {
        let claims = SignedTokenClaims::new("k1", "alice", Utc::now().timestamp() - 10);
        let token = issue(&claims, "topsecret").unwrap();
        let err = verify(
            &token,
            &secrets_for("k1", "topsecret"),
            &HashSet::new(),
            &HashSet::new(),
        )
        .unwrap_err();
        assert_eq!(err.code, AuthErrorCode::ExpiredToken);
    }

    #[test]
    fn test_inactive_and_revoked_kid() {
        let claims = SignedTokenClaims::new("k1", "alice", far_future());
        let token = issue(&claims, "topsecret").unwrap();
        let secrets = secrets_for("k1", "topsecret");

        let active: HashSet<String> = ["k2".to_string()].into();
        let err = verify(&token, &secrets, &active, &HashSet::new()).unwrap_err();
        assert_eq!(err.code, AuthErrorCode::RevokedKey);

        let revoked: HashSet<String> = ["k1".to_string()].into();
        let err = verify(&token, &secrets, &HashSet::new(), &revoked).unwrap_err();
        assert_eq!(err.code, AuthErrorCode::RevokedKey);
    }

    #[test]
    fn test_disabled_principal() {
        let mut claims = SignedTokenClaims::new("k1", "alice", far_future());
        claims.disabled = true;
        let token = issue(&claims, "topsecret").unwrap();
        let err = verify(
            &token,
            &secrets_for("k1", "topsecret"),
            &HashSet::new(),
            &HashSet::new(),
        )
        .unwrap_err();
        assert_eq!(err.code, AuthErrorCode::DisabledIdentity);
    }

    #[test]
    fn test_unknown_kid_and_malformed_structure() {
        let claims = SignedTokenClaims::new("k9", "alice", far_future());
        let token = issue(&claims, "topsecret").unwrap();
        let err = verify(
            &token,
            &secrets_for("k1", "topsecret"),
            &HashSet::new(),
            &HashSet::new(),
        )
        .unwrap_err();
        assert_eq!(err.code, AuthErrorCode::InvalidSignature);

        let err = verify(
            "v1.onlytwo",
            &secrets_for("k1", "topsecret"),
            &HashSet::new(),
            &HashSet::new(),
        )
        .unwrap_err();
        assert_eq!(err.code, AuthErrorCode::InvalidSignature);

        let err = verify(
            "v1.!!!.!!!",
            &secrets_for("k1", "topsecret"),
            &HashSet::new(),
            &HashSet::new(),
        )
        .unwrap_err();
        assert_eq!(err.code, AuthErrorCode::InvalidSignature);
    }
}
