//! # notespace-auth
//!
//! Identity and access control for the NoteSpace platform: request
//! authentication, role/ACL authorization, a tamper-evident audit chain,
//! space membership lifecycle, and scoped service-account credentials.
//!
//! ## Modules
//!
//! - `credentials` — eager parsing and validation of configured credentials
//! - `token` — `v1.<payload>.<signature>` signed bearer tokens (HMAC-SHA256)
//! - `manager` — header-based authentication, including the space-scoped
//!   service-key fallback
//! - `authz` — role precedence, action permissions, form-level ACL overlays
//! - `audit` — hash-chained per-space audit log with retention anchoring
//! - `membership` — invitation, acceptance, role change, and revocation
//! - `service_accounts` — scoped API-key issuance, verification, rotation
//!
//! All mutating components serialize per-space writes through
//! [`notespace_store::SpaceLocks`]; reads run unsynchronized. Nothing here
//! retries or caches an allow/deny decision across requests.

pub mod audit;
pub mod authz;
pub mod credentials;
pub mod error;
pub mod headers;
pub mod manager;
pub mod membership;
pub mod secrets;
pub mod service_accounts;
pub mod token;

pub use audit::AuditLog;
pub use authz::AuthzEngine;
pub use credentials::{CredentialRecord, CredentialSet};
pub use error::{AuthError, AuthErrorCode, AuthorizationError, Error};
pub use headers::{RequestHeaders, RequestMeta};
pub use manager::AuthManager;
pub use membership::{
    AcceptInvitationInput, InvitationCreated, InviteMemberInput, MembershipChange,
    MembershipManager, RevokeMemberInput, UpdateMemberRoleInput,
};
pub use service_accounts::{
    CreateServiceAccountInput, CreateServiceAccountKeyInput, RevokeServiceAccountKeyInput,
    RotateServiceAccountKeyInput, ServiceAccountKeyCreated, ServiceAccountManager, ServiceKeyAuth,
};
pub use token::{SignedTokenClaims, issue as issue_signed_token};
