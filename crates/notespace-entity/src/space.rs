//! Typed and lenient views over the per-space metadata document.
//!
//! The external metadata store holds one JSON document per space. Mutating
//! components (membership, service accounts) deserialize the `settings`
//! sub-document into [`SpaceSettings`], mutate it, and write it back whole
//! under the space lock. The authorization engine reads the raw document
//! through [`SpaceDoc`], which tolerates missing or oddly-typed fields the
//! way a long-lived document store accumulates them.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use notespace_core::AppError;

use crate::acl::FormAcl;
use crate::member::{Invitation, Member, MemberState};
use crate::role::SpaceRole;
use crate::service_account::ServiceAccount;

/// Typed view of the space `settings` sub-document.
///
/// Unknown keys round-trip untouched through `extra`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SpaceSettings {
    /// Owner user id, when mirrored into settings.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner_user_id: Option<String>,
    /// Projection: user ids holding the admin role (includes the owner).
    pub admin_user_ids: Vec<String>,
    /// Projection: explicit role strings for active members.
    pub member_roles: BTreeMap<String, String>,
    /// Space-level group memberships: user id to group names.
    pub user_groups: BTreeMap<String, Vec<String>>,
    /// Form ACL overrides keyed by form name.
    pub form_acls: BTreeMap<String, FormAcl>,
    /// Member records keyed by user id.
    pub members: BTreeMap<String, Member>,
    /// Invitation records keyed by invitation id.
    pub invitations: BTreeMap<String, Invitation>,
    /// Service accounts keyed by account id.
    pub service_accounts: BTreeMap<String, ServiceAccount>,
    /// Monotonic counter bumped on every membership/ACL mutation, used by
    /// downstream caches as a staleness marker.
    pub membership_version: u64,
    /// Remaining settings keys, untouched.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl SpaceSettings {
    /// Extract the typed settings from a whole space document.
    pub fn from_doc(doc: &Value) -> Result<Self, AppError> {
        match doc.get("settings") {
            None | Some(Value::Null) => Ok(Self::default()),
            Some(settings) => serde_json::from_value(settings.clone()).map_err(|e| {
                AppError::with_source(
                    notespace_core::error::ErrorKind::Serialization,
                    format!("space settings are malformed: {e}"),
                    e,
                )
            }),
        }
    }

    /// Bump the membership staleness counter.
    pub fn bump_membership_version(&mut self) {
        self.membership_version += 1;
    }

    /// Recompute the projection maps the authorization engine reads
    /// (`admin_user_ids`, `member_roles`, `owner_user_id`) from the current
    /// member lifecycle state, so precedence inputs stay consistent with
    /// membership after every mutation.
    pub fn refresh_projections(&mut self, doc_owner: Option<&str>) {
        let owner = doc_owner
            .map(str::to_string)
            .or_else(|| self.owner_user_id.clone());

        let mut member_roles = BTreeMap::new();
        let mut admin_ids: BTreeSet<String> =
            self.admin_user_ids.iter().cloned().collect();
        for (user_id, member) in &self.members {
            if member.state != MemberState::Active {
                continue;
            }
            if member.role.is_assignable() {
                member_roles.insert(user_id.clone(), member.role.as_str().to_string());
            }
            if member.role == SpaceRole::Admin {
                admin_ids.insert(user_id.clone());
            }
        }
        if let Some(ref owner_id) = owner {
            admin_ids.insert(owner_id.clone());
        }

        self.member_roles = member_roles;
        self.admin_user_ids = admin_ids.into_iter().collect();
        self.owner_user_id = owner;
    }

    /// Build the JSON merge patch persisting these settings, mirroring the
    /// projection maps at the document top level where older readers
    /// expect them.
    pub fn to_patch(&self) -> Result<Value, AppError> {
        let settings = serde_json::to_value(self)?;
        let mut patch = json!({
            "settings": settings,
            "admin_user_ids": self.admin_user_ids,
            "member_roles": self.member_roles,
        });
        if let Some(ref owner) = self.owner_user_id {
            patch["owner_user_id"] = Value::String(owner.clone());
        }
        Ok(patch)
    }
}

/// Lenient read-only view over a raw space document.
#[derive(Debug, Clone, Copy)]
pub struct SpaceDoc<'a> {
    raw: &'a Value,
}

impl<'a> SpaceDoc<'a> {
    /// Wrap a raw space document.
    pub fn new(raw: &'a Value) -> Self {
        Self { raw }
    }

    fn settings(&self) -> Option<&'a Map<String, Value>> {
        self.raw.get("settings").and_then(Value::as_object)
    }

    /// Owner user id, preferring the top-level field over settings.
    pub fn owner_user_id(&self) -> Option<&'a str> {
        self.raw
            .get("owner_user_id")
            .and_then(Value::as_str)
            .or_else(|| {
                self.settings()
                    .and_then(|s| s.get("owner_user_id"))
                    .and_then(Value::as_str)
            })
    }

    /// Whether the user appears in the admin id list (top-level field
    /// preferred over settings).
    pub fn is_admin(&self, user_id: &str) -> bool {
        let list = self
            .raw
            .get("admin_user_ids")
            .and_then(Value::as_array)
            .or_else(|| {
                self.settings()
                    .and_then(|s| s.get("admin_user_ids"))
                    .and_then(Value::as_array)
            });
        list.is_some_and(|ids| ids.iter().any(|v| v.as_str() == Some(user_id)))
    }

    /// Explicit role entry for the user, if one exists and names a valid
    /// role. Checks the top-level map first, then settings.
    pub fn member_role(&self, user_id: &str) -> Option<SpaceRole> {
        let lookup = |map: Option<&Map<String, Value>>| {
            map.and_then(|m| m.get(user_id))
                .and_then(Value::as_str)
                .and_then(|raw| raw.parse::<SpaceRole>().ok())
        };
        lookup(self.raw.get("member_roles").and_then(Value::as_object)).or_else(|| {
            lookup(
                self.settings()
                    .and_then(|s| s.get("member_roles"))
                    .and_then(Value::as_object),
            )
        })
    }

    /// Group names for the user from both the top-level and settings
    /// `user_groups` maps.
    pub fn groups_for(&self, user_id: &str) -> BTreeSet<String> {
        let mut groups = BTreeSet::new();
        let sources = [
            self.raw.get("user_groups").and_then(Value::as_object),
            self.settings()
                .and_then(|s| s.get("user_groups"))
                .and_then(Value::as_object),
        ];
        for source in sources.into_iter().flatten() {
            if let Some(values) = source.get(user_id).and_then(Value::as_array) {
                groups.extend(
                    values
                        .iter()
                        .filter_map(Value::as_str)
                        .filter(|g| !g.is_empty())
                        .map(str::to_string),
                );
            }
        }
        groups
    }

    /// Form ACL overrides from settings. Malformed entries are skipped.
    pub fn form_acls(&self) -> BTreeMap<String, FormAcl> {
        let mut acls = BTreeMap::new();
        let Some(raw) = self
            .settings()
            .and_then(|s| s.get("form_acls"))
            .and_then(Value::as_object)
        else {
            return acls;
        };
        for (name, value) in raw {
            if let Ok(acl) = serde_json::from_value::<FormAcl>(value.clone()) {
                acls.insert(name.clone(), acl);
            }
        }
        acls
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settings_round_trip_preserves_unknown_keys() {
        let doc = json!({
            "settings": {
                "membership_version": 3,
                "theme": "dark",
                "members": {},
            }
        });
        let settings = SpaceSettings::from_doc(&doc).unwrap();
        assert_eq!(settings.membership_version, 3);
        assert_eq!(settings.extra["theme"], "dark");
        let patch = settings.to_patch().unwrap();
        assert_eq!(patch["settings"]["theme"], "dark");
    }

    #[test]
    fn test_refresh_projections_tracks_active_members() {
        let mut settings = SpaceSettings::default();
        settings.members.insert(
            "bob".to_string(),
            Member {
                user_id: "bob".to_string(),
                role: SpaceRole::Admin,
                state: MemberState::Active,
                invited_by: "alice".to_string(),
                invited_at: "2026-01-01T00:00:00.000Z".to_string(),
                activated_at: None,
                revoked_at: None,
                updated_at: None,
            },
        );
        settings.members.insert(
            "carol".to_string(),
            Member {
                user_id: "carol".to_string(),
                role: SpaceRole::Viewer,
                state: MemberState::Revoked,
                invited_by: "alice".to_string(),
                invited_at: "2026-01-01T00:00:00.000Z".to_string(),
                activated_at: None,
                revoked_at: Some("2026-02-01T00:00:00.000Z".to_string()),
                updated_at: None,
            },
        );
        settings.refresh_projections(Some("alice"));

        assert_eq!(settings.member_roles.get("bob").map(String::as_str), Some("admin"));
        assert!(!settings.member_roles.contains_key("carol"));
        assert!(settings.admin_user_ids.contains(&"alice".to_string()));
        assert!(settings.admin_user_ids.contains(&"bob".to_string()));
        assert_eq!(settings.owner_user_id.as_deref(), Some("alice"));
    }

    #[test]
    fn test_doc_view_is_lenient() {
        let doc = json!({
            "owner_user_id": "alice",
            "member_roles": {"bob": "viewer", "mallory": "root"},
            "settings": {
                "user_groups": {"bob": ["research", ""]},
            }
        });
        let view = SpaceDoc::new(&doc);
        assert_eq!(view.owner_user_id(), Some("alice"));
        assert_eq!(view.member_role("bob"), Some(SpaceRole::Viewer));
        assert_eq!(view.member_role("mallory"), None);
        assert!(!view.is_admin("bob"));
        assert_eq!(view.groups_for("bob"), ["research".to_string()].into());
    }
}
