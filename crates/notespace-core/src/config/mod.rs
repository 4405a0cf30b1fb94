//! Application configuration schemas.
//!
//! All configuration structs are deserialized from environment variables via
//! the `config` crate. Each sub-module represents a logical configuration
//! section. Every field has a defined default, so an empty environment
//! yields a usable development configuration.

pub mod audit;
pub mod auth;
pub mod authz;
pub mod logging;

use serde::{Deserialize, Serialize};

use self::audit::AuditConfig;
use self::auth::AuthConfig;
use self::authz::AuthzConfig;
use self::logging::LoggingConfig;

use crate::error::AppError;

/// Root configuration for the identity and access-control core.
///
/// This struct is the top-level deserialization target for environment
/// variables prefixed with `NOTESPACE`, using `__` as the section
/// separator (e.g. `NOTESPACE__AUTH__BEARER_TOKENS_JSON`).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CoreConfig {
    /// Credential configuration surface.
    pub auth: AuthConfig,
    /// Authorization defaults and overrides.
    pub authz: AuthzConfig,
    /// Audit log retention settings.
    pub audit: AuditConfig,
    /// Logging settings.
    pub logging: LoggingConfig,
}

impl CoreConfig {
    /// Load configuration from the process environment.
    pub fn load() -> Result<Self, AppError> {
        let config = config::Config::builder()
            .add_source(
                config::Environment::with_prefix("NOTESPACE")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| AppError::configuration(format!("Failed to build config: {e}")))?;

        config
            .try_deserialize()
            .map_err(|e| AppError::configuration(format!("Failed to deserialize config: {e}")))
    }
}
