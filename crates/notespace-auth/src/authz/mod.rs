//! Role- and ACL-based authorization.
//!
//! [`AuthzEngine`] resolves an [`AccessContext`] from per-space metadata
//! and evaluates action permissions: coarse role checks first, service-key
//! scope narrowing second, and form-level ACL overlays on top for form and
//! entry operations.

pub mod forms;
mod resolver;

use std::sync::Arc;

use serde_json::Value;

use notespace_core::AppError;
use notespace_core::config::authz::AuthzConfig;
use notespace_entity::{AccessContext, AclPrincipal, RequestIdentity, SpaceAction, SpaceDoc};
use notespace_store::{FormSource, SpaceStore};

use crate::error::{AuthorizationError, Error};

pub use forms::{form_name_from_entry, form_name_from_markdown};
use resolver::{GroupOverrides, RoleDefaults};

/// Evaluates authorization decisions for space-scoped actions.
pub struct AuthzEngine {
    store: Arc<dyn SpaceStore>,
    forms: Arc<dyn FormSource>,
    defaults: RoleDefaults,
    group_overrides: GroupOverrides,
}

impl std::fmt::Debug for AuthzEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthzEngine")
            .field("defaults", &self.defaults)
            .finish()
    }
}

impl AuthzEngine {
    /// Create an engine over a space store and form source, validating the
    /// configured defaults and group overrides eagerly.
    pub fn new(
        store: Arc<dyn SpaceStore>,
        forms: Arc<dyn FormSource>,
        config: &AuthzConfig,
    ) -> Result<Self, AppError> {
        Ok(Self {
            store,
            forms,
            defaults: RoleDefaults::from_config(config)?,
            group_overrides: resolver::parse_group_overrides(config.user_groups_json.as_deref())?,
        })
    }

    /// Resolve role, groups, and form ACL overrides for a principal in a
    /// space. Read-only; never denies by itself.
    pub async fn resolve_access_context(
        &self,
        space_id: &str,
        identity: &RequestIdentity,
    ) -> Result<AccessContext, AppError> {
        let doc = self.store.get_space(space_id).await?;
        let view = SpaceDoc::new(&doc);
        Ok(AccessContext {
            space_id: space_id.to_string(),
            user_id: identity.user_id.clone(),
            role: resolver::resolve_role(&view, identity, &self.defaults),
            groups: resolver::resolve_groups(
                &view,
                &self.group_overrides,
                space_id,
                &identity.user_id,
            ),
            form_acls: view.form_acls(),
        })
    }

    /// Require role-based permission for a space-scoped action.
    ///
    /// Service-key identities with `scope_enforced` must additionally hold
    /// the action in their scope set; owner and admin are never denied.
    pub async fn require_space_action(
        &self,
        space_id: &str,
        identity: &RequestIdentity,
        action: SpaceAction,
    ) -> Result<AccessContext, Error> {
        let access = self.resolve_access_context(space_id, identity).await?;
        if !access.role.permits(action) {
            return Err(AuthorizationError::forbidden(
                action,
                format!(
                    "Principal '{}' with role '{}' is not allowed to perform '{}' in space '{}'.",
                    identity.user_id, access.role, action, space_id
                ),
            )
            .into());
        }
        if identity.scope_enforced
            && !access.role.is_privileged()
            && !identity.scopes.contains(&action)
        {
            return Err(AuthorizationError::forbidden(
                action,
                format!(
                    "Service key for '{}' does not include scope '{}' in space '{}'.",
                    identity.user_id, action, space_id
                ),
            )
            .into());
        }
        Ok(access)
    }

    /// Require read access to a form: the baseline `form_read` action plus
    /// the form's `read_principals` overlay.
    pub async fn require_form_read(
        &self,
        space_id: &str,
        identity: &RequestIdentity,
        form_name: &str,
    ) -> Result<AccessContext, Error> {
        let access = self
            .require_space_action(space_id, identity, SpaceAction::FormRead)
            .await?;
        let principals = self
            .effective_principals(space_id, &access, form_name, AclField::Read)
            .await?;
        check_form_acl(
            principals.as_deref(),
            form_name,
            AclField::Read,
            identity,
            &access,
            SpaceAction::FormRead,
        )?;
        Ok(access)
    }

    /// Require write access to a form: the baseline `entry_write` action
    /// plus the form's `write_principals` overlay.
    pub async fn require_form_write(
        &self,
        space_id: &str,
        identity: &RequestIdentity,
        form_name: &str,
    ) -> Result<AccessContext, Error> {
        let access = self
            .require_space_action(space_id, identity, SpaceAction::EntryWrite)
            .await?;
        let principals = self
            .effective_principals(space_id, &access, form_name, AclField::Write)
            .await?;
        check_form_acl(
            principals.as_deref(),
            form_name,
            AclField::Write,
            identity,
            &access,
            SpaceAction::EntryWrite,
        )?;
        Ok(access)
    }

    /// Require read access for an entry based on its declared form, or the
    /// baseline `entry_read` action when it declares none.
    pub async fn require_entry_read(
        &self,
        space_id: &str,
        identity: &RequestIdentity,
        entry: &Value,
    ) -> Result<AccessContext, Error> {
        match forms::form_name_from_entry(entry) {
            Some(form_name) => self.require_form_read(space_id, identity, &form_name).await,
            None => {
                self.require_space_action(space_id, identity, SpaceAction::EntryRead)
                    .await
            }
        }
    }

    /// Require write access for an entry based on its declared form, or
    /// the baseline `entry_write` action when it declares none.
    pub async fn require_entry_write(
        &self,
        space_id: &str,
        identity: &RequestIdentity,
        entry: &Value,
    ) -> Result<AccessContext, Error> {
        match forms::form_name_from_entry(entry) {
            Some(form_name) => self.require_form_write(space_id, identity, &form_name).await,
            None => {
                self.require_space_action(space_id, identity, SpaceAction::EntryWrite)
                    .await
            }
        }
    }

    /// Require write access for a markdown payload based on its front
    /// matter form declaration.
    pub async fn require_markdown_write(
        &self,
        space_id: &str,
        identity: &RequestIdentity,
        markdown: &str,
    ) -> Result<AccessContext, Error> {
        match forms::form_name_from_markdown(markdown) {
            Some(form_name) => self.require_form_write(space_id, identity, &form_name).await,
            None => {
                self.require_space_action(space_id, identity, SpaceAction::EntryWrite)
                    .await
            }
        }
    }

    /// Keep only the entries the identity may read. Denied and errored
    /// entries are silently dropped; list filtering is deny-by-default and
    /// never reports the reason to the caller.
    pub async fn filter_readable_entries(
        &self,
        space_id: &str,
        identity: &RequestIdentity,
        entries: Vec<Value>,
    ) -> Vec<Value> {
        let mut readable = Vec::with_capacity(entries.len());
        for entry in entries {
            if self
                .require_entry_read(space_id, identity, &entry)
                .await
                .is_ok()
            {
                readable.push(entry);
            }
        }
        readable
    }

    /// The principal list governing a form operation: the form
    /// definition's own field when it carries one, otherwise the
    /// space-settings ACL override for that form.
    async fn effective_principals(
        &self,
        space_id: &str,
        access: &AccessContext,
        form_name: &str,
        field: AclField,
    ) -> Result<Option<Vec<AclPrincipal>>, AppError> {
        let form = self.forms.get_form(space_id, form_name).await?;
        let from_form = form.as_ref().and_then(|f| match field {
            AclField::Read => f.read_principals.clone(),
            AclField::Write => f.write_principals.clone(),
        });
        Ok(from_form.or_else(|| {
            access.form_acls.get(form_name).and_then(|acl| match field {
                AclField::Read => acl.read_principals.clone(),
                AclField::Write => acl.write_principals.clone(),
            })
        }))
    }
}

/// Which principal list a form check consults.
#[derive(Debug, Clone, Copy)]
enum AclField {
    Read,
    Write,
}

impl AclField {
    fn as_str(&self) -> &'static str {
        match self {
            Self::Read => "read_principals",
            Self::Write => "write_principals",
        }
    }
}

/// Evaluate a form ACL overlay. No list means no restriction; owner and
/// admin always pass; otherwise the identity must match an entry by user
/// id or group membership.
fn check_form_acl(
    principals: Option<&[AclPrincipal]>,
    form_name: &str,
    field: AclField,
    identity: &RequestIdentity,
    access: &AccessContext,
    action: SpaceAction,
) -> Result<(), AuthorizationError> {
    let Some(principals) = principals else {
        return Ok(());
    };
    if access.role.is_privileged() {
        return Ok(());
    }
    if principals
        .iter()
        .any(|principal| principal.matches(identity, &access.groups))
    {
        return Ok(());
    }
    Err(AuthorizationError::forbidden(
        action,
        format!(
            "Principal '{}' is not allowed by '{}' for form '{}'.",
            identity.user_id,
            field.as_str(),
            form_name
        ),
    ))
}
