//! Role precedence and group resolution.

use std::collections::{BTreeMap, BTreeSet};

use notespace_core::AppError;
use notespace_core::config::authz::AuthzConfig;
use notespace_entity::{PrincipalType, RequestIdentity, SpaceDoc, SpaceRole};

/// External group overrides: space id -> user id -> groups.
pub(crate) type GroupOverrides = BTreeMap<String, BTreeMap<String, Vec<String>>>;

/// Roles applied when a space carries no explicit entry for a principal.
#[derive(Debug, Clone, Copy)]
pub(crate) struct RoleDefaults {
    /// Fallback role for user principals.
    pub user: SpaceRole,
    /// Role resolved for every service principal.
    pub service: SpaceRole,
}

impl RoleDefaults {
    /// Parse and validate the configured default roles.
    pub fn from_config(config: &AuthzConfig) -> Result<Self, AppError> {
        Ok(Self {
            user: config.default_user_role.parse().map_err(|_| {
                AppError::configuration(format!(
                    "invalid default_user_role '{}'",
                    config.default_user_role
                ))
            })?,
            service: config.default_service_role.parse().map_err(|_| {
                AppError::configuration(format!(
                    "invalid default_service_role '{}'",
                    config.default_service_role
                ))
            })?,
        })
    }
}

/// Parse and validate the external group override map eagerly.
pub(crate) fn parse_group_overrides(raw: Option<&str>) -> Result<GroupOverrides, AppError> {
    let Some(raw) = raw.map(str::trim).filter(|value| !value.is_empty()) else {
        return Ok(GroupOverrides::new());
    };
    let parsed: GroupOverrides = serde_json::from_str(raw)
        .map_err(|e| AppError::configuration(format!("malformed user_groups_json: {e}")))?;
    Ok(parsed
        .into_iter()
        .map(|(space_id, users)| {
            let users = users
                .into_iter()
                .map(|(user_id, groups)| {
                    let groups = groups.into_iter().filter(|g| !g.is_empty()).collect();
                    (user_id, groups)
                })
                .collect();
            (space_id, users)
        })
        .collect())
}

/// Resolve the effective role by strict precedence: service principal,
/// space owner, admin list, explicit member role entry, configured
/// default.
pub(crate) fn resolve_role(
    doc: &SpaceDoc<'_>,
    identity: &RequestIdentity,
    defaults: &RoleDefaults,
) -> SpaceRole {
    if identity.principal_type == PrincipalType::Service {
        return defaults.service;
    }
    if doc.owner_user_id() == Some(identity.user_id.as_str()) {
        return SpaceRole::Owner;
    }
    if doc.is_admin(&identity.user_id) {
        return SpaceRole::Admin;
    }
    if let Some(explicit) = doc.member_role(&identity.user_id) {
        return explicit;
    }
    defaults.user
}

/// Union of space-level groups and the external override map.
pub(crate) fn resolve_groups(
    doc: &SpaceDoc<'_>,
    overrides: &GroupOverrides,
    space_id: &str,
    user_id: &str,
) -> BTreeSet<String> {
    let mut groups = doc.groups_for(user_id);
    if let Some(extra) = overrides.get(space_id).and_then(|users| users.get(user_id)) {
        groups.extend(extra.iter().cloned());
    }
    groups
}
