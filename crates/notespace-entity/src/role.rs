//! Space role enumeration and its permission table.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use notespace_core::AppError;

use crate::action::SpaceAction;

/// Coarse-grained permission tier for a principal within a space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpaceRole {
    /// The space owner. Immutable, never revocable, holds every action.
    Owner,
    /// Space administrator. Holds every action.
    Admin,
    /// Can read and write content but not administer the space.
    Editor,
    /// Read-only access.
    Viewer,
    /// Automation principal tier resolved for service accounts.
    Service,
}

impl SpaceRole {
    /// Whether this role permits the given action.
    pub fn permits(&self, action: SpaceAction) -> bool {
        match self {
            Self::Owner | Self::Admin => true,
            Self::Editor => action != SpaceAction::SpaceAdmin,
            Self::Viewer => matches!(
                action,
                SpaceAction::SpaceList
                    | SpaceAction::SpaceRead
                    | SpaceAction::EntryRead
                    | SpaceAction::FormRead
                    | SpaceAction::AssetRead
                    | SpaceAction::SqlRead
            ),
            Self::Service => {
                !matches!(action, SpaceAction::SpaceAdmin | SpaceAction::FormWrite)
            }
        }
    }

    /// Owner and admin bypass form-level ACL overlays.
    pub fn is_privileged(&self) -> bool {
        matches!(self, Self::Owner | Self::Admin)
    }

    /// Whether the role can be assigned to or changed on a member.
    ///
    /// Owner is fixed at space creation and service is never a member role.
    pub fn is_assignable(&self) -> bool {
        matches!(self, Self::Admin | Self::Editor | Self::Viewer)
    }

    /// Return the role as a lowercase string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Owner => "owner",
            Self::Admin => "admin",
            Self::Editor => "editor",
            Self::Viewer => "viewer",
            Self::Service => "service",
        }
    }
}

impl fmt::Display for SpaceRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for SpaceRole {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "owner" => Ok(Self::Owner),
            "admin" => Ok(Self::Admin),
            "editor" => Ok(Self::Editor),
            "viewer" => Ok(Self::Viewer),
            "service" => Ok(Self::Service),
            _ => Err(AppError::validation(format!(
                "Invalid space role: '{s}'. Expected one of: owner, admin, editor, viewer, service"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_owner_admin_hold_everything() {
        for action in SpaceAction::ALL {
            assert!(SpaceRole::Owner.permits(action));
            assert!(SpaceRole::Admin.permits(action));
        }
    }

    #[test]
    fn test_editor_excludes_space_admin() {
        assert!(SpaceRole::Editor.permits(SpaceAction::EntryWrite));
        assert!(SpaceRole::Editor.permits(SpaceAction::FormWrite));
        assert!(!SpaceRole::Editor.permits(SpaceAction::SpaceAdmin));
    }

    #[test]
    fn test_viewer_is_read_only() {
        assert!(SpaceRole::Viewer.permits(SpaceAction::EntryRead));
        assert!(!SpaceRole::Viewer.permits(SpaceAction::EntryWrite));
        assert!(!SpaceRole::Viewer.permits(SpaceAction::AssetWrite));
        assert!(!SpaceRole::Viewer.permits(SpaceAction::SpaceAdmin));
    }

    #[test]
    fn test_service_excludes_admin_and_form_write() {
        assert!(SpaceRole::Service.permits(SpaceAction::EntryWrite));
        assert!(SpaceRole::Service.permits(SpaceAction::SqlWrite));
        assert!(SpaceRole::Service.permits(SpaceAction::FormRead));
        assert!(!SpaceRole::Service.permits(SpaceAction::SpaceAdmin));
        assert!(!SpaceRole::Service.permits(SpaceAction::FormWrite));
    }

    #[test]
    fn test_from_str() {
        assert_eq!("admin".parse::<SpaceRole>().unwrap(), SpaceRole::Admin);
        assert_eq!("VIEWER".parse::<SpaceRole>().unwrap(), SpaceRole::Viewer);
        assert!("superuser".parse::<SpaceRole>().is_err());
    }

    #[test]
    fn test_assignable_roles() {
        assert!(SpaceRole::Admin.is_assignable());
        assert!(SpaceRole::Viewer.is_assignable());
        assert!(!SpaceRole::Owner.is_assignable());
        assert!(!SpaceRole::Service.is_assignable());
    }
}
