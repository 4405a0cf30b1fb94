//! Filesystem-backed audit chain storage.
//!
//! Each space's chain lives at `<root>/spaces/<space_id>/audit/events.jsonl`:
//! a header line carrying the chain anchor, followed by one event per line.
//! Replacement writes a temp file and renames it over the old one so a
//! crash never leaves a half-written log.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde_json::{Value, json};

use notespace_core::AppError;
use notespace_entity::audit::{AuditChain, AuditEvent, CHAIN_ROOT};

use crate::store::AuditLogStore;

/// Persists per-space audit chains as JSONL files under a root directory.
#[derive(Debug, Clone)]
pub struct FsAuditLog {
    root: PathBuf,
}

impl FsAuditLog {
    /// Create a log store rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn events_path(&self, space_id: &str) -> Result<PathBuf, AppError> {
        // Space ids are validated upstream; reject separators anyway so a
        // bad caller cannot escape the root.
        if space_id.contains(['/', '\\']) || space_id.contains("..") {
            return Err(AppError::validation(format!("invalid space_id: '{space_id}'")));
        }
        Ok(self
            .root
            .join("spaces")
            .join(space_id)
            .join("audit")
            .join("events.jsonl"))
    }

    fn parse_chain(content: &str) -> Result<AuditChain, AppError> {
        let mut anchor = CHAIN_ROOT.to_string();
        let mut events = Vec::new();
        let mut saw_header = false;
        for line in content.lines() {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            let parsed: Value = serde_json::from_str(trimmed)
                .map_err(|_| AppError::integrity("Audit log contains malformed JSON"))?;
            let Some(object) = parsed.as_object() else {
                return Err(AppError::integrity("Audit log contains malformed JSON"));
            };
            if !saw_header && !object.contains_key("event_hash") {
                // Header line. Logs written before anchors carried one
                // start directly with an event and keep the root anchor.
                saw_header = true;
                if let Some(stored) = object.get("anchor").and_then(Value::as_str) {
                    anchor = stored.to_string();
                }
                continue;
            }
            saw_header = true;
            let event: AuditEvent = serde_json::from_value(parsed)
                .map_err(|_| AppError::integrity("Audit log contains malformed JSON"))?;
            events.push(event);
        }
        Ok(AuditChain { anchor, events })
    }
}

#[async_trait]
impl AuditLogStore for FsAuditLog {
    async fn load_chain(&self, space_id: &str) -> Result<AuditChain, AppError> {
        let path = self.events_path(space_id)?;
        match tokio::fs::read_to_string(&path).await {
            Ok(content) => Self::parse_chain(&content),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(AuditChain::empty()),
            Err(err) => Err(AppError::with_source(
                notespace_core::error::ErrorKind::Storage,
                format!("failed to read audit log for space '{space_id}': {err}"),
                err,
            )),
        }
    }

    async fn replace_chain(&self, space_id: &str, chain: &AuditChain) -> Result<(), AppError> {
        let path = self.events_path(space_id)?;
        let dir = path.parent().unwrap_or(Path::new("."));
        tokio::fs::create_dir_all(dir).await?;

        let mut payload = String::new();
        payload.push_str(&serde_json::to_string(&json!({
            "version": 1,
            "anchor": chain.anchor,
        }))?);
        payload.push('\n');
        for event in &chain.events {
            payload.push_str(&serde_json::to_string(event)?);
            payload.push('\n');
        }

        let tmp_path = path.with_extension("jsonl.tmp");
        tokio::fs::write(&tmp_path, payload.as_bytes()).await?;
        tokio::fs::rename(&tmp_path, &path).await?;
        Ok(())
    }
}
