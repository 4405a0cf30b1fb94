//! Storage traits consumed from the external metadata/log engine.

use async_trait::async_trait;
use serde_json::Value;

use notespace_core::AppError;
use notespace_entity::{AuditChain, FormDefinition};

/// Per-space metadata document access.
///
/// The underlying engine offers whole-document replace only, no
/// field-level transactions: callers must hold the space's lock from
/// [`crate::SpaceLocks`] around every read-modify-write cycle.
#[async_trait]
pub trait SpaceStore: Send + Sync {
    /// Fetch the metadata document for a space.
    async fn get_space(&self, space_id: &str) -> Result<Value, AppError>;

    /// Apply a JSON merge patch (RFC 7386) to the space document and
    /// return the updated document.
    async fn patch_space(&self, space_id: &str, patch: &Value) -> Result<Value, AppError>;
}

/// Per-space audit chain persistence.
#[async_trait]
pub trait AuditLogStore: Send + Sync {
    /// Load the stored chain for a space. A space with no log yet yields
    /// an empty chain anchored at the root sentinel.
    async fn load_chain(&self, space_id: &str) -> Result<AuditChain, AppError>;

    /// Atomically replace the stored chain for a space.
    async fn replace_chain(&self, space_id: &str, chain: &AuditChain) -> Result<(), AppError>;
}

/// Read-only lookup of form definitions, used by the authorization engine
/// for form-level ACL checks. The form store itself is an external
/// collaborator.
#[async_trait]
pub trait FormSource: Send + Sync {
    /// Fetch a form definition by name, or `None` when the form does not
    /// exist.
    async fn get_form(
        &self,
        space_id: &str,
        form_name: &str,
    ) -> Result<Option<FormDefinition>, AppError>;
}
