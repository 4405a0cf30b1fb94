//! Form-level ACL principals and form definitions.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::identity::RequestIdentity;
use std::collections::BTreeSet;

/// Kind of principal an ACL entry refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrincipalKind {
    /// Matched against the identity's user id.
    User,
    /// Matched against the identity's group memberships.
    UserGroup,
}

/// One entry of a form read/write principal list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AclPrincipal {
    /// Whether `id` names a user or a group.
    pub kind: PrincipalKind,
    /// User id or group name.
    pub id: String,
}

impl AclPrincipal {
    /// Whether this entry matches the identity or its groups.
    pub fn matches(&self, identity: &RequestIdentity, groups: &BTreeSet<String>) -> bool {
        match self.kind {
            PrincipalKind::User => self.id == identity.user_id,
            PrincipalKind::UserGroup => groups.contains(&self.id),
        }
    }
}

/// Read/write ACL overlay for a single form.
///
/// `None` means no restriction: the role check alone governs. An empty
/// list denies everyone except owner/admin.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormAcl {
    /// Principals allowed to read entries of this form.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub read_principals: Option<Vec<AclPrincipal>>,
    /// Principals allowed to write entries of this form.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub write_principals: Option<Vec<AclPrincipal>>,
}

/// Form definition as consumed from the external form store.
///
/// Only the ACL-relevant fields are modeled; everything else the form
/// carries is preserved opaquely.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FormDefinition {
    /// Form name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Principals allowed to read entries of this form.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub read_principals: Option<Vec<AclPrincipal>>,
    /// Principals allowed to write entries of this form.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub write_principals: Option<Vec<AclPrincipal>>,
    /// Remaining form fields, untouched.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::AuthMethod;

    #[test]
    fn test_principal_matching() {
        let identity = RequestIdentity::user("bob", AuthMethod::Bearer);
        let groups: BTreeSet<String> = ["research".to_string()].into();

        let by_user = AclPrincipal {
            kind: PrincipalKind::User,
            id: "bob".to_string(),
        };
        let by_group = AclPrincipal {
            kind: PrincipalKind::UserGroup,
            id: "research".to_string(),
        };
        let other = AclPrincipal {
            kind: PrincipalKind::User,
            id: "research".to_string(),
        };

        assert!(by_user.matches(&identity, &groups));
        assert!(by_group.matches(&identity, &groups));
        assert!(!other.matches(&identity, &groups));
    }

    #[test]
    fn test_principal_wire_format() {
        let parsed: AclPrincipal =
            serde_json::from_value(serde_json::json!({"kind": "user_group", "id": "ops"}))
                .unwrap();
        assert_eq!(parsed.kind, PrincipalKind::UserGroup);
    }
}
