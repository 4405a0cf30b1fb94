//! Space membership and invitation lifecycle.
//!
//! Member state machine per user: `(none) -> invited -> active -> revoked`;
//! invitations separately: `pending -> accepted | expired | revoked`. Every
//! mutation bumps the space's `membership_version`, recomputes the
//! role-projection maps the authorization engine reads, persists through
//! the locked read-modify-write path, and returns a structured audit
//! payload for the caller to log.

use std::sync::Arc;

use chrono::Utc;

use notespace_core::types::time;
use notespace_core::AppError;
use notespace_entity::audit::{AuditEventInput, AuditOutcome};
use notespace_entity::{
    Invitation, InvitationState, Member, MemberState, SpaceDoc, SpaceRole, SpaceSettings,
};
use notespace_store::{SpaceLocks, SpaceStore};

use crate::secrets;

/// Default invitation lifetime.
pub const DEFAULT_INVITATION_TTL_SECS: u64 = 7 * 24 * 60 * 60;
/// Shortest invitation lifetime a caller can request.
pub const MIN_INVITATION_TTL_SECS: u64 = 60;

/// Payload for invitation creation.
#[derive(Debug, Clone)]
pub struct InviteMemberInput {
    /// User to invite.
    pub user_id: String,
    /// Role granted on acceptance. Must be assignable (admin/editor/viewer).
    pub role: SpaceRole,
    /// Acting principal.
    pub invited_by: String,
    /// Optional delivery address recorded on the invitation.
    pub email: Option<String>,
    /// Requested token lifetime; floored to [`MIN_INVITATION_TTL_SECS`].
    pub expires_in_secs: u64,
}

impl InviteMemberInput {
    /// Invitation with the default lifetime.
    pub fn new(user_id: impl Into<String>, role: SpaceRole, invited_by: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            role,
            invited_by: invited_by.into(),
            email: None,
            expires_in_secs: DEFAULT_INVITATION_TTL_SECS,
        }
    }
}

/// Payload for invitation acceptance.
#[derive(Debug, Clone)]
pub struct AcceptInvitationInput {
    /// The raw one-time token.
    pub token: String,
    /// Principal redeeming the token. Must equal the invited user.
    pub accepted_by: String,
}

/// Payload for a member role change.
#[derive(Debug, Clone)]
pub struct UpdateMemberRoleInput {
    /// Member whose role changes.
    pub member_user_id: String,
    /// New role. Must be assignable.
    pub role: SpaceRole,
    /// Acting principal.
    pub changed_by: String,
}

/// Payload for member revocation.
#[derive(Debug, Clone)]
pub struct RevokeMemberInput {
    /// Member to revoke.
    pub member_user_id: String,
    /// Acting principal.
    pub revoked_by: String,
}

/// Result of invitation creation. `token` is the only copy of the raw
/// token that will ever exist; the stored invitation holds its hash.
#[derive(Debug, Clone)]
pub struct InvitationCreated {
    /// The persisted invitation (hash only, no raw token).
    pub invitation: Invitation,
    /// The one-time raw token.
    pub token: String,
    /// Structured audit payload for the caller to log.
    pub audit_event: AuditEventInput,
}

/// Result of a member mutation.
#[derive(Debug, Clone)]
pub struct MembershipChange {
    /// The member record after the mutation.
    pub member: Member,
    /// Structured audit payload for the caller to log.
    pub audit_event: AuditEventInput,
}

/// Manages invitation, acceptance, role change, and revocation transitions.
pub struct MembershipManager {
    store: Arc<dyn SpaceStore>,
    locks: Arc<SpaceLocks>,
}

impl std::fmt::Debug for MembershipManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MembershipManager").finish()
    }
}

impl MembershipManager {
    /// Create a manager over a space store.
    pub fn new(store: Arc<dyn SpaceStore>, locks: Arc<SpaceLocks>) -> Self {
        Self { store, locks }
    }

    /// Return all member records for a space, sorted by user id.
    pub async fn list_members(&self, space_id: &str) -> Result<Vec<Member>, AppError> {
        let doc = self.store.get_space(space_id).await?;
        let settings = SpaceSettings::from_doc(&doc)?;
        let mut members: Vec<Member> = settings.members.into_values().collect();
        members.sort_by(|a, b| a.user_id.cmp(&b.user_id));
        Ok(members)
    }

    /// Whether the user is an active member by lifecycle state.
    pub async fn is_active_member(&self, space_id: &str, user_id: &str) -> Result<bool, AppError> {
        let doc = self.store.get_space(space_id).await?;
        let settings = SpaceSettings::from_doc(&doc)?;
        Ok(settings
            .members
            .get(user_id)
            .is_some_and(|member| member.state == MemberState::Active))
    }

    /// Create an invitation and transition the member to `invited`.
    pub async fn create_invitation(
        &self,
        space_id: &str,
        input: InviteMemberInput,
    ) -> Result<InvitationCreated, AppError> {
        let user_id = input.user_id.trim().to_string();
        if user_id.is_empty() {
            return Err(AppError::validation("invited user_id must not be empty"));
        }
        if !input.role.is_assignable() {
            return Err(AppError::validation(
                "role must be one of admin/editor/viewer",
            ));
        }

        let lock = self.locks.for_space(space_id);
        let _guard = lock.lock().await;

        let doc = self.store.get_space(space_id).await?;
        let mut settings = SpaceSettings::from_doc(&doc)?;

        if settings
            .members
            .get(&user_id)
            .is_some_and(|member| member.state == MemberState::Active)
        {
            return Err(AppError::conflict(format!("Member already active: {user_id}")));
        }

        let token = secrets::token_urlsafe(24);
        let invited_at = time::now_iso();
        let ttl = input.expires_in_secs.max(MIN_INVITATION_TTL_SECS);
        let expires_at = (Utc::now() + chrono::Duration::seconds(ttl as i64))
            .to_rfc3339_opts(chrono::SecondsFormat::Millis, true);

        let invitation = Invitation {
            id: format!("inv-{}", secrets::token_hex(8)),
            token_hash: secrets::sha256_hex(&token),
            user_id: user_id.clone(),
            role: input.role,
            email: input.email.clone(),
            state: InvitationState::Pending,
            invited_by: input.invited_by.clone(),
            invited_at: invited_at.clone(),
            expires_at,
            accepted_at: None,
            accepted_by: None,
            revoked_at: None,
            revoked_by: None,
        };
        settings
            .invitations
            .insert(invitation.id.clone(), invitation.clone());

        settings.members.insert(
            user_id.clone(),
            Member {
                user_id: user_id.clone(),
                role: input.role,
                state: MemberState::Invited,
                invited_by: input.invited_by.clone(),
                invited_at,
                activated_at: None,
                revoked_at: None,
                updated_at: None,
            },
        );

        settings.bump_membership_version();
        self.persist(space_id, &doc, &mut settings).await?;

        tracing::info!(space_id, user_id = %user_id, role = %input.role, "member invited");
        Ok(InvitationCreated {
            invitation,
            token,
            audit_event: AuditEventInput::new(
                "member.invite",
                input.invited_by,
                AuditOutcome::Success,
            )
            .with_target("space_member", user_id)
            .with_metadata("role", input.role.as_str()),
        })
    }

    /// Redeem an invitation token and activate the member.
    ///
    /// The token must be pending, presented by the exact invited user, and
    /// unexpired. An expired token transitions the invitation to `expired`
    /// (persisted) and fails without activating the member.
    pub async fn accept_invitation(
        &self,
        space_id: &str,
        input: AcceptInvitationInput,
    ) -> Result<MembershipChange, AppError> {
        if input.token.trim().is_empty() {
            return Err(AppError::validation("token must not be empty"));
        }

        let lock = self.locks.for_space(space_id);
        let _guard = lock.lock().await;

        let doc = self.store.get_space(space_id).await?;
        let mut settings = SpaceSettings::from_doc(&doc)?;

        let requested_hash = secrets::sha256_hex(input.token.trim());
        let invitation_id = settings
            .invitations
            .values()
            .find(|candidate| candidate.token_hash == requested_hash)
            .map(|candidate| candidate.id.clone())
            .ok_or_else(|| AppError::not_found("Invitation token not found"))?;

        let invitation = settings
            .invitations
            .get(&invitation_id)
            .cloned()
            .ok_or_else(|| AppError::not_found("Invitation token not found"))?;

        if invitation.state != InvitationState::Pending {
            return Err(AppError::conflict("Invitation token is not pending"));
        }
        if invitation.user_id != input.accepted_by {
            return Err(AppError::conflict(
                "Invitation token is not valid for this user",
            ));
        }

        let expires_at = time::parse_iso(&invitation.expires_at)
            .map_err(|_| AppError::validation("Invitation token expiry is malformed"))?;
        if expires_at < Utc::now() {
            let entry = settings
                .invitations
                .get_mut(&invitation_id)
                .ok_or_else(|| AppError::not_found("Invitation token not found"))?;
            entry.state = InvitationState::Expired;
            settings.bump_membership_version();
            self.persist(space_id, &doc, &mut settings).await?;
            return Err(AppError::conflict("Invitation token expired"));
        }

        if !invitation.role.is_assignable() {
            return Err(AppError::validation("Invitation has invalid role"));
        }

        let now = time::now_iso();
        {
            let entry = settings
                .invitations
                .get_mut(&invitation_id)
                .ok_or_else(|| AppError::not_found("Invitation token not found"))?;
            entry.state = InvitationState::Accepted;
            entry.accepted_at = Some(now.clone());
            entry.accepted_by = Some(input.accepted_by.clone());
        }

        let member = Member {
            user_id: input.accepted_by.clone(),
            role: invitation.role,
            state: MemberState::Active,
            invited_by: invitation.invited_by.clone(),
            invited_at: invitation.invited_at.clone(),
            activated_at: Some(now),
            revoked_at: None,
            updated_at: None,
        };
        settings
            .members
            .insert(input.accepted_by.clone(), member.clone());

        settings.bump_membership_version();
        self.persist(space_id, &doc, &mut settings).await?;

        tracing::info!(space_id, user_id = %input.accepted_by, role = %member.role, "member activated");
        Ok(MembershipChange {
            audit_event: AuditEventInput::new(
                "member.accept",
                input.accepted_by.clone(),
                AuditOutcome::Success,
            )
            .with_target("space_member", input.accepted_by)
            .with_metadata("role", member.role.as_str()),
            member,
        })
    }

    /// Change the role of an invited or active member.
    pub async fn update_member_role(
        &self,
        space_id: &str,
        input: UpdateMemberRoleInput,
    ) -> Result<MembershipChange, AppError> {
        if !input.role.is_assignable() {
            return Err(AppError::validation(
                "role must be one of admin/editor/viewer",
            ));
        }

        let lock = self.locks.for_space(space_id);
        let _guard = lock.lock().await;

        let doc = self.store.get_space(space_id).await?;
        let mut settings = SpaceSettings::from_doc(&doc)?;

        let member = settings
            .members
            .get_mut(&input.member_user_id)
            .ok_or_else(|| {
                AppError::not_found(format!("Member not found: {}", input.member_user_id))
            })?;
        if member.state == MemberState::Revoked {
            return Err(AppError::conflict(format!(
                "Member is revoked: {}",
                input.member_user_id
            )));
        }
        member.role = input.role;
        member.updated_at = Some(time::now_iso());
        let member = member.clone();

        settings.bump_membership_version();
        self.persist(space_id, &doc, &mut settings).await?;

        tracing::info!(space_id, user_id = %input.member_user_id, role = %input.role, "member role updated");
        Ok(MembershipChange {
            member,
            audit_event: AuditEventInput::new(
                "member.role_change",
                input.changed_by,
                AuditOutcome::Success,
            )
            .with_target("space_member", input.member_user_id)
            .with_metadata("role", input.role.as_str()),
        })
    }

    /// Revoke a member's access and cascade to their pending invitations.
    ///
    /// The owner can never be revoked. Idempotent over invitations: only
    /// still-pending ones transition.
    pub async fn revoke_member(
        &self,
        space_id: &str,
        input: RevokeMemberInput,
    ) -> Result<MembershipChange, AppError> {
        let lock = self.locks.for_space(space_id);
        let _guard = lock.lock().await;

        let doc = self.store.get_space(space_id).await?;
        let mut settings = SpaceSettings::from_doc(&doc)?;

        let owner = SpaceDoc::new(&doc)
            .owner_user_id()
            .map(str::to_string)
            .or_else(|| settings.owner_user_id.clone());
        if owner.as_deref() == Some(input.member_user_id.as_str()) {
            return Err(AppError::conflict("Owner cannot be revoked"));
        }

        let revoked_at = time::now_iso();
        let member = settings
            .members
            .get_mut(&input.member_user_id)
            .ok_or_else(|| {
                AppError::not_found(format!("Member not found: {}", input.member_user_id))
            })?;
        member.state = MemberState::Revoked;
        member.revoked_at = Some(revoked_at.clone());
        let member = member.clone();

        for invitation in settings.invitations.values_mut() {
            if invitation.user_id == input.member_user_id
                && invitation.state == InvitationState::Pending
            {
                invitation.state = InvitationState::Revoked;
                invitation.revoked_at = Some(revoked_at.clone());
                invitation.revoked_by = Some(input.revoked_by.clone());
            }
        }

        settings.bump_membership_version();
        self.persist(space_id, &doc, &mut settings).await?;

        tracing::info!(space_id, user_id = %input.member_user_id, "member revoked");
        Ok(MembershipChange {
            member,
            audit_event: AuditEventInput::new(
                "member.revoke",
                input.revoked_by,
                AuditOutcome::Success,
            )
            .with_target("space_member", input.member_user_id),
        })
    }

    /// Recompute projection maps and write the settings patch back.
    /// Callers hold the space lock.
    async fn persist(
        &self,
        space_id: &str,
        doc: &serde_json::Value,
        settings: &mut SpaceSettings,
    ) -> Result<(), AppError> {
        settings.refresh_projections(SpaceDoc::new(doc).owner_user_id());
        let patch = settings.to_patch()?;
        self.store.patch_space(space_id, &patch).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    use notespace_store::MemoryStore;

    fn manager_with_space() -> (MembershipManager, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        store.put_space("s1", json!({"owner_user_id": "alice", "settings": {}}));
        let manager = MembershipManager::new(store.clone(), Arc::new(SpaceLocks::new()));
        (manager, store)
    }

    #[tokio::test]
    async fn test_invite_then_accept_activates_member() {
        let (manager, store) = manager_with_space();

        let created = manager
            .create_invitation("s1", InviteMemberInput::new("bob", SpaceRole::Viewer, "alice"))
            .await
            .unwrap();
        assert_eq!(created.invitation.state, InvitationState::Pending);
        assert_ne!(created.token, created.invitation.token_hash);
        assert_eq!(created.audit_event.action, "member.invite");

        // The raw token never lands in the stored document.
        let doc = store.get_space("s1").await.unwrap();
        assert!(!serde_json::to_string(&doc).unwrap().contains(&created.token));

        let change = manager
            .accept_invitation(
                "s1",
                AcceptInvitationInput {
                    token: created.token.clone(),
                    accepted_by: "bob".to_string(),
                },
            )
            .await
            .unwrap();
        assert_eq!(change.member.state, MemberState::Active);
        assert_eq!(change.member.role, SpaceRole::Viewer);
        assert!(change.member.activated_at.is_some());

        // A redeemed token cannot be redeemed again.
        let err = manager
            .accept_invitation(
                "s1",
                AcceptInvitationInput {
                    token: created.token,
                    accepted_by: "bob".to_string(),
                },
            )
            .await
            .unwrap_err();
        assert!(err.message.contains("not pending"));
    }

    #[tokio::test]
    async fn test_accept_by_wrong_user_mutates_nothing() {
        let (manager, store) = manager_with_space();
        let created = manager
            .create_invitation("s1", InviteMemberInput::new("bob", SpaceRole::Editor, "alice"))
            .await
            .unwrap();
        let version_before = store.get_space("s1").await.unwrap()["settings"]
            ["membership_version"]
            .as_u64()
            .unwrap();

        let err = manager
            .accept_invitation(
                "s1",
                AcceptInvitationInput {
                    token: created.token,
                    accepted_by: "mallory".to_string(),
                },
            )
            .await
            .unwrap_err();
        assert!(err.message.contains("not valid for this user"));

        let doc = store.get_space("s1").await.unwrap();
        assert_eq!(
            doc["settings"]["membership_version"].as_u64().unwrap(),
            version_before
        );
        assert_eq!(doc["settings"]["members"]["bob"]["state"], "invited");
    }

    #[tokio::test]
    async fn test_expired_token_transitions_without_activation() {
        let (manager, store) = manager_with_space();
        let created = manager
            .create_invitation(
                "s1",
                InviteMemberInput {
                    expires_in_secs: 60,
                    ..InviteMemberInput::new("bob", SpaceRole::Viewer, "alice")
                },
            )
            .await
            .unwrap();

        // Backdate the stored expiry under the invitation id.
        let inv_id = created.invitation.id.as_str();
        store
            .patch_space(
                "s1",
                &json!({"settings": {"invitations": {inv_id: {"expires_at": "2000-01-01T00:00:00.000Z"}}}}),
            )
            .await
            .unwrap();

        let err = manager
            .accept_invitation(
                "s1",
                AcceptInvitationInput {
                    token: created.token,
                    accepted_by: "bob".to_string(),
                },
            )
            .await
            .unwrap_err();
        assert!(err.message.contains("expired"));

        let doc = store.get_space("s1").await.unwrap();
        assert_eq!(doc["settings"]["invitations"][inv_id]["state"], "expired");
        assert_eq!(doc["settings"]["members"]["bob"]["state"], "invited");
    }

    #[tokio::test]
    async fn test_invite_rejects_active_member_and_bad_role() {
        let (manager, _store) = manager_with_space();
        let created = manager
            .create_invitation("s1", InviteMemberInput::new("bob", SpaceRole::Viewer, "alice"))
            .await
            .unwrap();
        manager
            .accept_invitation(
                "s1",
                AcceptInvitationInput {
                    token: created.token,
                    accepted_by: "bob".to_string(),
                },
            )
            .await
            .unwrap();

        let err = manager
            .create_invitation("s1", InviteMemberInput::new("bob", SpaceRole::Editor, "alice"))
            .await
            .unwrap_err();
        assert!(err.message.contains("already active"));

        assert!(manager
            .create_invitation("s1", InviteMemberInput::new("carol", SpaceRole::Owner, "alice"))
            .await
            .is_err());
        assert!(manager
            .create_invitation("s1", InviteMemberInput::new("  ", SpaceRole::Viewer, "alice"))
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_role_update_rules() {
        let (manager, _store) = manager_with_space();
        let created = manager
            .create_invitation("s1", InviteMemberInput::new("bob", SpaceRole::Viewer, "alice"))
            .await
            .unwrap();
        manager
            .accept_invitation(
                "s1",
                AcceptInvitationInput {
                    token: created.token,
                    accepted_by: "bob".to_string(),
                },
            )
            .await
            .unwrap();

        let change = manager
            .update_member_role(
                "s1",
                UpdateMemberRoleInput {
                    member_user_id: "bob".to_string(),
                    role: SpaceRole::Admin,
                    changed_by: "alice".to_string(),
                },
            )
            .await
            .unwrap();
        assert_eq!(change.member.role, SpaceRole::Admin);
        assert!(change.member.updated_at.is_some());

        assert!(manager
            .update_member_role(
                "s1",
                UpdateMemberRoleInput {
                    member_user_id: "ghost".to_string(),
                    role: SpaceRole::Viewer,
                    changed_by: "alice".to_string(),
                },
            )
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_revoke_cascades_and_protects_owner() {
        let (manager, store) = manager_with_space();
        let created = manager
            .create_invitation("s1", InviteMemberInput::new("bob", SpaceRole::Viewer, "alice"))
            .await
            .unwrap();

        let err = manager
            .revoke_member(
                "s1",
                RevokeMemberInput {
                    member_user_id: "alice".to_string(),
                    revoked_by: "alice".to_string(),
                },
            )
            .await
            .unwrap_err();
        assert!(err.message.contains("Owner cannot be revoked"));

        let change = manager
            .revoke_member(
                "s1",
                RevokeMemberInput {
                    member_user_id: "bob".to_string(),
                    revoked_by: "alice".to_string(),
                },
            )
            .await
            .unwrap();
        assert_eq!(change.member.state, MemberState::Revoked);

        let doc = store.get_space("s1").await.unwrap();
        let inv_id = created.invitation.id.as_str();
        assert_eq!(doc["settings"]["invitations"][inv_id]["state"], "revoked");

        // Revoked members cannot have their role changed.
        assert!(manager
            .update_member_role(
                "s1",
                UpdateMemberRoleInput {
                    member_user_id: "bob".to_string(),
                    role: SpaceRole::Editor,
                    changed_by: "alice".to_string(),
                },
            )
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_mutations_bump_membership_version_and_projections() {
        let (manager, store) = manager_with_space();
        let created = manager
            .create_invitation("s1", InviteMemberInput::new("bob", SpaceRole::Admin, "alice"))
            .await
            .unwrap();
        manager
            .accept_invitation(
                "s1",
                AcceptInvitationInput {
                    token: created.token,
                    accepted_by: "bob".to_string(),
                },
            )
            .await
            .unwrap();

        let doc = store.get_space("s1").await.unwrap();
        assert_eq!(doc["settings"]["membership_version"], 2);
        assert_eq!(doc["member_roles"]["bob"], "admin");
        let admins: Vec<String> = doc["admin_user_ids"]
            .as_array()
            .unwrap()
            .iter()
            .map(|v| v.as_str().unwrap().to_string())
            .collect();
        assert!(admins.contains(&"alice".to_string()));
        assert!(admins.contains(&"bob".to_string()));

        assert!(manager.is_active_member("s1", "bob").await.unwrap());
        assert!(!manager.is_active_member("s1", "carol").await.unwrap());
        assert_eq!(manager.list_members("s1").await.unwrap().len(), 1);
    }
}
