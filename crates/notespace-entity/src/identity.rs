//! Resolved request identity and per-space access context.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::acl::FormAcl;
use crate::action::SpaceAction;
use crate::role::SpaceRole;

/// How a request authenticated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthMethod {
    /// `Authorization: Bearer <token>` header.
    Bearer,
    /// `X-API-Key` header.
    ApiKey,
}

/// Kind of authenticated actor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrincipalType {
    /// A human user.
    User,
    /// An automation (service account) principal.
    Service,
}

/// Resolved identity for an authenticated request.
///
/// Invariant: `scope_enforced` is true only for service-account API keys;
/// user and static credentials are unscoped and governed purely by role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestIdentity {
    /// Stable principal identifier.
    pub user_id: String,
    /// Credential mechanism that produced this identity.
    pub auth_method: AuthMethod,
    /// Human or service principal.
    pub principal_type: PrincipalType,
    /// Optional display name carried by the credential.
    pub display_name: Option<String>,
    /// Key id of the credential, when it has one.
    pub key_id: Option<String>,
    /// Action scopes attached to the credential.
    pub scopes: BTreeSet<SpaceAction>,
    /// Whether `scopes` narrows the effective permission set.
    pub scope_enforced: bool,
    /// Owning service account, for service-key identities.
    pub service_account_id: Option<String>,
}

impl RequestIdentity {
    /// Build an unscoped user identity (convenient for tests and tooling).
    pub fn user(user_id: impl Into<String>, auth_method: AuthMethod) -> Self {
        Self {
            user_id: user_id.into(),
            auth_method,
            principal_type: PrincipalType::User,
            display_name: None,
            key_id: None,
            scopes: BTreeSet::new(),
            scope_enforced: false,
            service_account_id: None,
        }
    }
}

/// Resolved authorization context for a principal in a space.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessContext {
    /// The space the context was resolved for.
    pub space_id: String,
    /// The principal the context was resolved for.
    pub user_id: String,
    /// Effective role after precedence resolution.
    pub role: SpaceRole,
    /// Group memberships (space-level unioned with external overrides).
    pub groups: BTreeSet<String>,
    /// Form ACL overrides stored in space settings, keyed by form name.
    pub form_acls: BTreeMap<String, FormAcl>,
}

impl AccessContext {
    /// Whether the principal belongs to the given group.
    pub fn in_group(&self, group: &str) -> bool {
        self.groups.contains(group)
    }
}
