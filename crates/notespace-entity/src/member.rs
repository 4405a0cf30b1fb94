//! Space membership and invitation records.

use serde::{Deserialize, Serialize};

use crate::role::SpaceRole;

/// Lifecycle state of a space member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MemberState {
    /// Invitation issued, not yet accepted.
    Invited,
    /// Invitation accepted; member holds their role.
    Active,
    /// Access revoked; record retained for audit purposes.
    Revoked,
    /// Invitation lapsed before acceptance.
    Expired,
}

/// A member record persisted in per-space settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Member {
    /// Member user id.
    pub user_id: String,
    /// Assigned role. The owner is tracked separately in space metadata
    /// and is never represented as a mutable member record.
    pub role: SpaceRole,
    /// Current lifecycle state.
    pub state: MemberState,
    /// User id of the inviter.
    pub invited_by: String,
    /// When the invitation was issued.
    pub invited_at: String,
    /// When the member accepted, if they have.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub activated_at: Option<String>,
    /// When access was revoked, if it was.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revoked_at: Option<String>,
    /// Last role change timestamp.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

/// Lifecycle state of an invitation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvitationState {
    /// Token issued and redeemable.
    Pending,
    /// Token redeemed by the invited user.
    Accepted,
    /// Token passed its expiry before redemption.
    Expired,
    /// Withdrawn, directly or by member revocation cascade.
    Revoked,
}

/// An invitation record persisted in per-space settings.
///
/// Only the SHA-256 hash of the one-time token is stored; the raw token is
/// returned exactly once at creation and never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Invitation {
    /// Invitation id.
    pub id: String,
    /// SHA-256 hex digest of the one-time token.
    pub token_hash: String,
    /// Invited user id.
    pub user_id: String,
    /// Role granted on acceptance.
    pub role: SpaceRole,
    /// Optional delivery address.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Current lifecycle state.
    pub state: InvitationState,
    /// User id of the inviter.
    pub invited_by: String,
    /// When the invitation was issued.
    pub invited_at: String,
    /// When the token stops being redeemable.
    pub expires_at: String,
    /// When the token was redeemed, if it was.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accepted_at: Option<String>,
    /// Who redeemed the token.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accepted_by: Option<String>,
    /// When the invitation was withdrawn.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revoked_at: Option<String>,
    /// Who withdrew the invitation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revoked_by: Option<String>,
}
