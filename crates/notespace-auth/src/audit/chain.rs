//! Audit chain hashing and verification.
//!
//! Every event binds to its predecessor:
//! `event_hash = hex(SHA256(prev_hash ":" canonical_json(event sans event_hash)))`
//! where canonical JSON is compact with sorted object keys. The oldest
//! retained event links to the chain's stored anchor (`"root"` until a
//! retention trim advances it), so a single flipped byte anywhere in the
//! retained history breaks verification.

use serde_json::Value;
use sha2::{Digest, Sha256};

use notespace_core::AppError;
use notespace_entity::audit::{AuditChain, AuditEvent};

/// Canonical JSON payload of an event, without its own hash.
fn canonical_payload(event: &AuditEvent) -> Result<Value, AppError> {
    let mut value = serde_json::to_value(event)?;
    let object = value
        .as_object_mut()
        .ok_or_else(|| AppError::integrity("Audit log contains malformed JSON"))?;
    object.remove("event_hash");
    Ok(value)
}

/// Compute the chain hash for an event given its predecessor's hash.
pub fn event_hash(event: &AuditEvent, prev_hash: &str) -> Result<String, AppError> {
    let canonical = serde_json::to_string(&canonical_payload(event)?)?;
    let material = format!("{prev_hash}:{canonical}");
    Ok(hex::encode(Sha256::digest(material.as_bytes())))
}

/// Re-verify the whole chain from its anchor.
///
/// Recomputes every event hash and checks `prev_hash` linkage. Any
/// mismatch is an unrecoverable integrity error; the log is never
/// repaired here.
pub fn verify_chain(chain: &AuditChain) -> Result<(), AppError> {
    let mut prev_hash = chain.anchor.as_str();
    for event in &chain.events {
        if event.prev_hash != prev_hash {
            return Err(AppError::integrity("Audit chain prev_hash mismatch"));
        }
        let actual = event_hash(event, prev_hash)?;
        if actual != event.event_hash {
            return Err(AppError::integrity("Audit chain integrity check failed"));
        }
        prev_hash = event.event_hash.as_str();
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    use notespace_entity::audit::{AuditOutcome, CHAIN_ROOT};

    fn build_event(id: &str, prev_hash: &str) -> AuditEvent {
        let mut event = AuditEvent {
            id: id.to_string(),
            timestamp: "2026-01-01T00:00:00.000Z".to_string(),
            space_id: "s1".to_string(),
            action: "member.invite".to_string(),
            actor_user_id: "alice".to_string(),
            outcome: AuditOutcome::Success,
            target_type: Some("space_member".to_string()),
            target_id: Some("bob".to_string()),
            request_method: None,
            request_path: None,
            request_id: None,
            metadata: BTreeMap::from([("role".to_string(), "viewer".to_string())]),
            prev_hash: prev_hash.to_string(),
            event_hash: String::new(),
        };
        event.event_hash = event_hash(&event, prev_hash).unwrap();
        event
    }

    fn build_chain(len: usize) -> AuditChain {
        let mut chain = AuditChain::empty();
        let mut prev = CHAIN_ROOT.to_string();
        for i in 0..len {
            let event = build_event(&format!("audit-{i}"), &prev);
            prev = event.event_hash.clone();
            chain.events.push(event);
        }
        chain
    }

    #[test]
    fn test_hash_is_deterministic() {
        let event = build_event("audit-1", CHAIN_ROOT);
        assert_eq!(
            event_hash(&event, CHAIN_ROOT).unwrap(),
            event_hash(&event, CHAIN_ROOT).unwrap()
        );
    }

    #[test]
    fn test_valid_chain_verifies() {
        verify_chain(&build_chain(5)).unwrap();
    }

    #[test]
    fn test_any_field_mutation_breaks_verification() {
        let mut chain = build_chain(3);
        chain.events[1].actor_user_id = "mallory".to_string();
        let err = verify_chain(&chain).unwrap_err();
        assert_eq!(err.kind, notespace_core::error::ErrorKind::Integrity);

        let mut chain = build_chain(3);
        chain.events[2]
            .metadata
            .insert("role".to_string(), "admin".to_string());
        assert!(verify_chain(&chain).is_err());
    }

    #[test]
    fn test_broken_linkage_is_detected() {
        let mut chain = build_chain(3);
        chain.events.remove(1);
        let err = verify_chain(&chain).unwrap_err();
        assert!(err.message.contains("prev_hash"));
    }

    #[test]
    fn test_anchor_mismatch_is_detected() {
        let mut chain = build_chain(2);
        chain.anchor = "somewhere-else".to_string();
        assert!(verify_chain(&chain).is_err());
    }

    #[test]
    fn test_chain_reanchored_at_trim_point_verifies() {
        let mut chain = build_chain(5);
        let dropped: Vec<_> = chain.events.drain(..2).collect();
        chain.anchor = dropped.last().unwrap().event_hash.clone();
        verify_chain(&chain).unwrap();
    }
}
