//! Tamper-evident audit events and the persisted hash chain.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Sentinel hash the chain starts from.
pub const CHAIN_ROOT: &str = "root";

/// Outcome of the audited action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuditOutcome {
    /// The action completed.
    Success,
    /// The action was denied by authentication or authorization.
    Deny,
    /// The action failed.
    Error,
}

impl AuditOutcome {
    /// Return the outcome as its wire string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Deny => "deny",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for AuditOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for AuditOutcome {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "success" => Ok(Self::Success),
            "deny" => Ok(Self::Deny),
            "error" => Ok(Self::Error),
            _ => Err(()),
        }
    }
}

/// A persisted audit event.
///
/// Events are created only by append and never mutated. Every field is
/// serialized unconditionally (optionals as `null`) so the canonical JSON
/// encoding used for chain hashing is stable:
/// `event_hash = hex(SHA256(prev_hash ":" canonical_json(event sans event_hash)))`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEvent {
    /// Event id.
    pub id: String,
    /// Append timestamp, RFC 3339 UTC with `Z` suffix.
    pub timestamp: String,
    /// Space the event belongs to.
    pub space_id: String,
    /// Action name, e.g. `"member.invite"`.
    pub action: String,
    /// Principal that performed the action.
    pub actor_user_id: String,
    /// Result of the action.
    pub outcome: AuditOutcome,
    /// Type of the target resource, when there is one.
    pub target_type: Option<String>,
    /// Target resource id.
    pub target_id: Option<String>,
    /// HTTP method of the originating request.
    pub request_method: Option<String>,
    /// Path of the originating request.
    pub request_path: Option<String>,
    /// Correlation id of the originating request.
    pub request_id: Option<String>,
    /// Additional string metadata.
    pub metadata: BTreeMap<String, String>,
    /// Hash of the previous event, or the chain anchor for the oldest.
    pub prev_hash: String,
    /// This event's chain hash.
    pub event_hash: String,
}

/// Input payload for audit event persistence.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuditEventInput {
    /// Action name. Must be non-empty.
    pub action: String,
    /// Acting principal. Must be non-empty.
    pub actor_user_id: String,
    /// Outcome; defaults to success when absent.
    #[serde(default)]
    pub outcome: Option<AuditOutcome>,
    /// Target resource type.
    #[serde(default)]
    pub target_type: Option<String>,
    /// Target resource id.
    #[serde(default)]
    pub target_id: Option<String>,
    /// HTTP method of the originating request.
    #[serde(default)]
    pub request_method: Option<String>,
    /// Path of the originating request.
    #[serde(default)]
    pub request_path: Option<String>,
    /// Correlation id of the originating request.
    #[serde(default)]
    pub request_id: Option<String>,
    /// Additional string metadata.
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

impl AuditEventInput {
    /// Minimal input with action, actor, and outcome.
    pub fn new(
        action: impl Into<String>,
        actor_user_id: impl Into<String>,
        outcome: AuditOutcome,
    ) -> Self {
        Self {
            action: action.into(),
            actor_user_id: actor_user_id.into(),
            outcome: Some(outcome),
            ..Self::default()
        }
    }

    /// Attach a target resource.
    pub fn with_target(mut self, target_type: impl Into<String>, target_id: impl Into<String>) -> Self {
        self.target_type = Some(target_type.into());
        self.target_id = Some(target_id.into());
        self
    }

    /// Attach one metadata entry.
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

/// Filter and pagination options for audit retrieval.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditListFilter {
    /// Number of newest-first events to skip.
    #[serde(default)]
    pub offset: usize,
    /// Page size; clamped to [1, 500] by the audit log.
    pub limit: usize,
    /// Exact-match action filter.
    #[serde(default)]
    pub action: Option<String>,
    /// Exact-match actor filter.
    #[serde(default)]
    pub actor_user_id: Option<String>,
    /// Exact-match outcome filter.
    #[serde(default)]
    pub outcome: Option<AuditOutcome>,
}

impl Default for AuditListFilter {
    fn default() -> Self {
        Self {
            offset: 0,
            limit: 100,
            action: None,
            actor_user_id: None,
            outcome: None,
        }
    }
}

/// The persisted per-space chain document.
///
/// `anchor` is the trusted hash the oldest retained event links to. It is
/// `"root"` until a retention trim discards history, after which it holds
/// the `event_hash` of the newest trimmed event so verification remains
/// closed over the retained suffix without rewriting any stored event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditChain {
    /// Trusted hash the oldest retained event must link to.
    pub anchor: String,
    /// Retained events, oldest first.
    pub events: Vec<AuditEvent>,
}

impl AuditChain {
    /// An empty chain anchored at the root sentinel.
    pub fn empty() -> Self {
        Self {
            anchor: CHAIN_ROOT.to_string(),
            events: Vec::new(),
        }
    }
}

impl Default for AuditChain {
    fn default() -> Self {
        Self::empty()
    }
}
