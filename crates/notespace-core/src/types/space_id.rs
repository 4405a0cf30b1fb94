//! Validated space identifier.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Maximum space id length in bytes.
const MAX_SPACE_ID_LEN: usize = 128;

/// A validated space identifier.
///
/// Space ids are embedded in storage paths, so they are restricted to a
/// conservative character set: a leading ASCII alphanumeric followed by up
/// to 127 alphanumerics, dots, underscores, or dashes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SpaceId(String);

impl SpaceId {
    /// Validate and wrap a raw space id.
    pub fn parse(raw: &str) -> Result<Self, AppError> {
        let normalized = raw.trim();
        if normalized.is_empty() {
            return Err(AppError::validation("space_id must not be empty"));
        }
        if normalized.len() > MAX_SPACE_ID_LEN {
            return Err(AppError::validation(format!(
                "invalid space_id: '{normalized}'"
            )));
        }
        let mut chars = normalized.chars();
        let first_ok = chars.next().is_some_and(|c| c.is_ascii_alphanumeric());
        let rest_ok = chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'));
        if !first_ok || !rest_ok {
            return Err(AppError::validation(format!(
                "invalid space_id: '{normalized}'"
            )));
        }
        Ok(Self(normalized.to_string()))
    }

    /// Return the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SpaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for SpaceId {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
