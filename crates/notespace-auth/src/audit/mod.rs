//! Tamper-evident per-space audit log.

pub mod chain;

use std::sync::Arc;

use uuid::Uuid;

use notespace_core::config::audit::AuditConfig;
use notespace_core::types::{Page, SpaceId, time};
use notespace_core::AppError;
use notespace_entity::audit::{
    AuditChain, AuditEvent, AuditEventInput, AuditListFilter, AuditOutcome,
};
use notespace_store::{AuditLogStore, SpaceLocks};

pub use chain::{event_hash, verify_chain};

/// Default page size for audit listings.
pub const DEFAULT_AUDIT_LIMIT: usize = 100;
/// Largest permitted page size for audit listings.
pub const MAX_AUDIT_LIMIT: usize = 500;

/// Appends and verifies hash-chained audit events, one chain per space.
///
/// Appends acquire the space lock, re-verify the stored chain, link the
/// new event to its predecessor, and atomically replace the persisted
/// chain. Retention trims only from the oldest end and advances the
/// chain's anchor to the newest trimmed hash, so stored events are never
/// rewritten.
pub struct AuditLog {
    store: Arc<dyn AuditLogStore>,
    locks: Arc<SpaceLocks>,
    retention: usize,
}

impl std::fmt::Debug for AuditLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuditLog")
            .field("retention", &self.retention)
            .finish()
    }
}

impl AuditLog {
    /// Create an audit log over a chain store.
    pub fn new(store: Arc<dyn AuditLogStore>, locks: Arc<SpaceLocks>, config: &AuditConfig) -> Self {
        Self {
            store,
            locks,
            retention: config.retention_limit(),
        }
    }

    /// Append an event to a space's chain and return it as persisted.
    pub async fn append(
        &self,
        space_id: &str,
        input: AuditEventInput,
    ) -> Result<AuditEvent, AppError> {
        let space_id = SpaceId::parse(space_id)?;
        let action = input.action.trim();
        if action.is_empty() {
            return Err(AppError::validation("audit action must not be empty"));
        }
        let actor_user_id = input.actor_user_id.trim();
        if actor_user_id.is_empty() {
            return Err(AppError::validation("actor_user_id must not be empty"));
        }

        let lock = self.locks.for_space(space_id.as_str());
        let _guard = lock.lock().await;

        let mut chain = self.store.load_chain(space_id.as_str()).await?;
        chain::verify_chain(&chain)?;

        let prev_hash = chain
            .events
            .last()
            .map(|event| event.event_hash.clone())
            .unwrap_or_else(|| chain.anchor.clone());

        let mut event = AuditEvent {
            id: format!("audit-{}", Uuid::new_v4().simple()),
            timestamp: time::now_iso(),
            space_id: space_id.as_str().to_string(),
            action: action.to_string(),
            actor_user_id: actor_user_id.to_string(),
            outcome: input.outcome.unwrap_or(AuditOutcome::Success),
            target_type: input.target_type,
            target_id: input.target_id,
            request_method: input.request_method,
            request_path: input.request_path,
            request_id: input.request_id,
            metadata: input.metadata,
            prev_hash: prev_hash.clone(),
            event_hash: String::new(),
        };
        event.event_hash = chain::event_hash(&event, &prev_hash)?;
        chain.events.push(event.clone());

        trim_to_retention(&mut chain, self.retention);

        self.store.replace_chain(space_id.as_str(), &chain).await?;
        tracing::debug!(
            space_id = %space_id,
            action = %event.action,
            outcome = %event.outcome,
            "appended audit event"
        );
        Ok(event)
    }

    /// List a space's events, newest first, after fully re-verifying the
    /// stored chain.
    pub async fn list(
        &self,
        space_id: &str,
        filter: AuditListFilter,
    ) -> Result<Page<AuditEvent>, AppError> {
        let space_id = SpaceId::parse(space_id)?;

        let chain = {
            let lock = self.locks.for_space(space_id.as_str());
            let _guard = lock.lock().await;
            let chain = self.store.load_chain(space_id.as_str()).await?;
            chain::verify_chain(&chain)?;
            chain
        };

        let action = normalize_filter(filter.action);
        let actor = normalize_filter(filter.actor_user_id);
        let outcome = filter.outcome;

        let mut events: Vec<AuditEvent> = chain
            .events
            .into_iter()
            .filter(|event| action.as_deref().is_none_or(|value| event.action == value))
            .filter(|event| actor.as_deref().is_none_or(|value| event.actor_user_id == value))
            .filter(|event| outcome.is_none_or(|value| event.outcome == value))
            .collect();
        events.sort_by(|left, right| right.timestamp.cmp(&left.timestamp));

        let limit = filter.limit.clamp(1, MAX_AUDIT_LIMIT);
        Ok(Page::slice(events, filter.offset, limit))
    }
}

/// Drop oldest events past the retention ceiling and advance the anchor to
/// the newest trimmed hash so the retained suffix still verifies.
fn trim_to_retention(chain: &mut AuditChain, retention: usize) {
    if chain.events.len() <= retention {
        return;
    }
    let excess = chain.events.len() - retention;
    let trimmed: Vec<AuditEvent> = chain.events.drain(..excess).collect();
    if let Some(newest_trimmed) = trimmed.last() {
        chain.anchor = newest_trimmed.event_hash.clone();
    }
}

fn normalize_filter(value: Option<String>) -> Option<String> {
    value
        .map(|raw| raw.trim().to_string())
        .filter(|raw| !raw.is_empty())
}
