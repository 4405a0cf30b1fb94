//! In-memory store backend for tests and embedded use.

use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::Value;

use notespace_core::AppError;
use notespace_entity::{AuditChain, FormDefinition};

use crate::merge::merge_patch;
use crate::store::{AuditLogStore, FormSource, SpaceStore};

/// Stores space documents, audit chains, and form definitions in process
/// memory. Implements every storage contract the core consumes.
#[derive(Debug, Default)]
pub struct MemoryStore {
    spaces: DashMap<String, Value>,
    chains: DashMap<String, AuditChain>,
    forms: DashMap<(String, String), FormDefinition>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed or replace a space document.
    pub fn put_space(&self, space_id: impl Into<String>, doc: Value) {
        self.spaces.insert(space_id.into(), doc);
    }

    /// Seed or replace a form definition.
    pub fn put_form(
        &self,
        space_id: impl Into<String>,
        form_name: impl Into<String>,
        form: FormDefinition,
    ) {
        self.forms.insert((space_id.into(), form_name.into()), form);
    }
}

#[async_trait]
impl SpaceStore for MemoryStore {
    async fn get_space(&self, space_id: &str) -> Result<Value, AppError> {
        self.spaces
            .get(space_id)
            .map(|doc| doc.clone())
            .ok_or_else(|| AppError::not_found(format!("Space not found: {space_id}")))
    }

    async fn patch_space(&self, space_id: &str, patch: &Value) -> Result<Value, AppError> {
        let mut entry = self
            .spaces
            .get_mut(space_id)
            .ok_or_else(|| AppError::not_found(format!("Space not found: {space_id}")))?;
        merge_patch(entry.value_mut(), patch);
        Ok(entry.clone())
    }
}

#[async_trait]
impl AuditLogStore for MemoryStore {
    async fn load_chain(&self, space_id: &str) -> Result<AuditChain, AppError> {
        Ok(self
            .chains
            .get(space_id)
            .map(|chain| chain.clone())
            .unwrap_or_default())
    }

    async fn replace_chain(&self, space_id: &str, chain: &AuditChain) -> Result<(), AppError> {
        self.chains.insert(space_id.to_string(), chain.clone());
        Ok(())
    }
}

#[async_trait]
impl FormSource for MemoryStore {
    async fn get_form(
        &self,
        space_id: &str,
        form_name: &str,
    ) -> Result<Option<FormDefinition>, AppError> {
        Ok(self
            .forms
            .get(&(space_id.to_string(), form_name.to_string()))
            .map(|form| form.clone()))
    }
}
