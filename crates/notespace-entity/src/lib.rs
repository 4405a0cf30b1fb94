//! # notespace-entity
//!
//! Domain entity models for the NoteSpace identity and access-control core:
//! request identities, roles and actions, space membership, invitations,
//! service accounts, audit events, and the typed view over the per-space
//! settings document.

pub mod acl;
pub mod action;
pub mod audit;
pub mod identity;
pub mod member;
pub mod role;
pub mod service_account;
pub mod space;

pub use acl::{AclPrincipal, FormAcl, FormDefinition, PrincipalKind};
pub use action::SpaceAction;
pub use audit::{AuditChain, AuditEvent, AuditEventInput, AuditListFilter, AuditOutcome};
pub use identity::{AccessContext, AuthMethod, PrincipalType, RequestIdentity};
pub use member::{Invitation, InvitationState, Member, MemberState};
pub use role::SpaceRole;
pub use service_account::{
    ServiceAccount, ServiceAccountKey, ServiceAccountKeyView, ServiceAccountView,
};
pub use space::{SpaceDoc, SpaceSettings};
