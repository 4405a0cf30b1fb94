//! Audit log configuration.

use serde::{Deserialize, Serialize};

/// Default retention ceiling for per-space audit logs.
pub const DEFAULT_AUDIT_RETENTION: usize = 5000;
/// Lowest permitted retention ceiling.
pub const MIN_AUDIT_RETENTION: usize = 100;
/// Highest permitted retention ceiling.
pub const MAX_AUDIT_RETENTION: usize = 50_000;

/// Audit log settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuditConfig {
    /// Maximum number of events retained per space. Oldest events are
    /// trimmed past this ceiling. Clamped to
    /// [`MIN_AUDIT_RETENTION`, `MAX_AUDIT_RETENTION`].
    pub retention_max_events: usize,
}

impl AuditConfig {
    /// Retention ceiling clamped into the permitted range.
    pub fn retention_limit(&self) -> usize {
        self.retention_max_events
            .clamp(MIN_AUDIT_RETENTION, MAX_AUDIT_RETENTION)
    }
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            retention_max_events: DEFAULT_AUDIT_RETENTION,
        }
    }
}
