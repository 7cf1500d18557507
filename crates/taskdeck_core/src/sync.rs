//! Device-sync protocol surface.
//!
//! # Responsibility
//! - Define the advertised service type and the serializable change
//!   delta a sync round exchanges.
//!
//! # Invariants
//! - Delta id lists are sorted, so equal change sets serialize to equal
//!   wire bytes.

use crate::monitor::ChangeMonitor;
use serde::{Deserialize, Serialize};

/// Zeroconf service type advertised by a listening desktop instance.
pub const SYNC_SERVICE_TYPE: &str = "_taskcoachsync._tcp";

/// One device's view of what changed since the last successful sync.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct SyncDelta {
    pub added: Vec<String>,
    pub removed: Vec<String>,
    pub modified: Vec<String>,
}

impl SyncDelta {
    /// Snapshots the monitor's current sets. The monitor keeps running;
    /// callers reset it once the sync round commits.
    pub fn from_monitor(monitor: &ChangeMonitor) -> SyncDelta {
        SyncDelta {
            added: monitor.added().iter().map(|id| id.to_string()).collect(),
            removed: monitor.removed().iter().map(|id| id.to_string()).collect(),
            modified: monitor.modified().iter().map(|id| id.to_string()).collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty() && self.modified.is_empty()
    }

    pub fn len(&self) -> usize {
        self.added.len() + self.removed.len() + self.modified.len()
    }
}
