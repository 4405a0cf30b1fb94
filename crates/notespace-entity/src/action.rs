//! Space-scoped action enumeration.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use notespace_core::AppError;

/// Actions a principal can perform within a space.
///
/// This is the fixed permission vocabulary: role permission tables and
/// service-account scopes are both expressed in terms of these actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpaceAction {
    /// Enumerate spaces visible to the principal.
    SpaceList,
    /// Read space metadata.
    SpaceRead,
    /// Administer space settings, members, and service accounts.
    SpaceAdmin,
    /// Read entries.
    EntryRead,
    /// Create or update entries.
    EntryWrite,
    /// Read form definitions.
    FormRead,
    /// Create or update form definitions.
    FormWrite,
    /// Read assets.
    AssetRead,
    /// Upload or delete assets.
    AssetWrite,
    /// Run read-only SQL.
    SqlRead,
    /// Run mutating SQL.
    SqlWrite,
}

impl SpaceAction {
    /// Every action, in declaration order.
    pub const ALL: [SpaceAction; 11] = [
        Self::SpaceList,
        Self::SpaceRead,
        Self::SpaceAdmin,
        Self::EntryRead,
        Self::EntryWrite,
        Self::FormRead,
        Self::FormWrite,
        Self::AssetRead,
        Self::AssetWrite,
        Self::SqlRead,
        Self::SqlWrite,
    ];

    /// Return the action as its wire string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SpaceList => "space_list",
            Self::SpaceRead => "space_read",
            Self::SpaceAdmin => "space_admin",
            Self::EntryRead => "entry_read",
            Self::EntryWrite => "entry_write",
            Self::FormRead => "form_read",
            Self::FormWrite => "form_write",
            Self::AssetRead => "asset_read",
            Self::AssetWrite => "asset_write",
            Self::SqlRead => "sql_read",
            Self::SqlWrite => "sql_write",
        }
    }
}

impl fmt::Display for SpaceAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for SpaceAction {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|action| action.as_str() == s.trim())
            .ok_or_else(|| AppError::validation(format!("invalid action: '{s}'")))
    }
}
