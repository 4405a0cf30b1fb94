//! Typed authentication and authorization errors.
//!
//! Authentication failures carry one of six stable machine-checkable codes;
//! authorization denials carry the denied action under the single code
//! `forbidden`. Both convert into [`AppError`] at the application boundary.

use std::fmt;

use thiserror::Error;

use notespace_core::AppError;
use notespace_entity::SpaceAction;

/// HTTP-equivalent status for authentication failures.
pub const UNAUTHORIZED_STATUS: u16 = 401;
/// HTTP-equivalent status for authorization denials.
pub const FORBIDDEN_STATUS: u16 = 403;

/// Stable machine-checkable authentication error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthErrorCode {
    /// No credential was presented.
    MissingCredentials,
    /// The presented credential is unknown or malformed at the scheme level.
    InvalidCredentials,
    /// A signed token failed structural or signature verification.
    InvalidSignature,
    /// A signed token's expiry has passed.
    ExpiredToken,
    /// The credential's key id is revoked or inactive.
    RevokedKey,
    /// The credential is valid but its principal is disabled.
    DisabledIdentity,
}

impl AuthErrorCode {
    /// Return the code as its wire string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MissingCredentials => "missing_credentials",
            Self::InvalidCredentials => "invalid_credentials",
            Self::InvalidSignature => "invalid_signature",
            Self::ExpiredToken => "expired_token",
            Self::RevokedKey => "revoked_key",
            Self::DisabledIdentity => "disabled_identity",
        }
    }
}

impl fmt::Display for AuthErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Authentication failure with a stable code and human-readable detail.
#[derive(Debug, Clone, Error)]
#[error("{detail}")]
pub struct AuthError {
    /// Machine-checkable error code.
    pub code: AuthErrorCode,
    /// Human-readable detail.
    pub detail: String,
    /// HTTP-equivalent status.
    pub status: u16,
}

impl AuthError {
    /// Create an authentication error with the default unauthorized status.
    pub fn new(code: AuthErrorCode, detail: impl Into<String>) -> Self {
        Self {
            code,
            detail: detail.into(),
            status: UNAUTHORIZED_STATUS,
        }
    }

    /// No credential presented.
    pub fn missing_credentials(detail: impl Into<String>) -> Self {
        Self::new(AuthErrorCode::MissingCredentials, detail)
    }

    /// Unknown or malformed credential.
    pub fn invalid_credentials(detail: impl Into<String>) -> Self {
        Self::new(AuthErrorCode::InvalidCredentials, detail)
    }

    /// Signed token failed verification.
    pub fn invalid_signature(detail: impl Into<String>) -> Self {
        Self::new(AuthErrorCode::InvalidSignature, detail)
    }

    /// Signed token expired.
    pub fn expired_token(detail: impl Into<String>) -> Self {
        Self::new(AuthErrorCode::ExpiredToken, detail)
    }

    /// Credential key id revoked or inactive.
    pub fn revoked_key(detail: impl Into<String>) -> Self {
        Self::new(AuthErrorCode::RevokedKey, detail)
    }

    /// Principal disabled.
    pub fn disabled_identity(detail: impl Into<String>) -> Self {
        Self::new(AuthErrorCode::DisabledIdentity, detail)
    }
}

/// Authorization denial carrying the denied action.
#[derive(Debug, Clone, Error)]
#[error("{detail}")]
pub struct AuthorizationError {
    /// The action that was denied.
    pub action: SpaceAction,
    /// Human-readable detail.
    pub detail: String,
    /// HTTP-equivalent status.
    pub status: u16,
}

impl AuthorizationError {
    /// Create a denial for an action.
    pub fn forbidden(action: SpaceAction, detail: impl Into<String>) -> Self {
        Self {
            action,
            detail: detail.into(),
            status: FORBIDDEN_STATUS,
        }
    }

    /// The single stable authorization error code.
    pub fn code(&self) -> &'static str {
        "forbidden"
    }
}

/// Umbrella error for operations that can fail with an authentication
/// code, an authorization denial, or an infrastructure error.
#[derive(Debug, Error)]
pub enum Error {
    /// Authentication failure.
    #[error(transparent)]
    Auth(#[from] AuthError),
    /// Authorization denial.
    #[error(transparent)]
    Forbidden(#[from] AuthorizationError),
    /// Validation, storage, integrity, or configuration failure.
    #[error(transparent)]
    App(#[from] AppError),
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        AppError::authentication(format!("{}: {}", err.code, err.detail))
    }
}

impl From<AuthorizationError> for AppError {
    fn from(err: AuthorizationError) -> Self {
        AppError::authorization(format!("forbidden ({}): {}", err.action, err.detail))
    }
}
