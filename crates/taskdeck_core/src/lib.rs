//! Core domain model for TaskDeck.
//! This crate is the single source of truth for business invariants.

pub mod appearance;
pub mod attribute;
pub mod collection;
pub mod command;
pub mod error;
pub mod event;
pub mod filter;
pub mod logging;
pub mod model;
pub mod monitor;
pub mod sorter;
pub mod storage;
pub mod sync;
pub mod time;
pub mod workspace;

pub use appearance::{mix_colors, mix_fonts, FontSpec, FontWeight, Rgba};
pub use command::{
    CommandHistory, DeleteCommand, EditSubjectCommand, MarkCompletedCommand, NewTaskCommand,
    ToggleCategoryCommand, WorkspaceCommand,
};
pub use error::DomainError;
pub use event::{Event, EventBatch, EventBus, EventType, Payload, SubscriptionToken};
pub use filter::{CategoryFilter, FilterMode};
pub use logging::{init_logging, logging_status, LogConfig, LogLevel, LoggingError};
pub use model::attachment::{Attachment, AttachmentKind};
pub use model::category::Category;
pub use model::composite::{Composite, CompositeCore, Entity};
pub use model::effort::Effort;
pub use model::note::Note;
pub use model::task::Task;
pub use model::{EntityId, EntityKind, Recurrence, RecurrenceUnit};
pub use monitor::ChangeMonitor;
pub use sorter::{SortKey, SortSpec, Sorter};
pub use storage::{load_document, load_from_path, save_document, save_to_path, StorageError};
pub use sync::{SyncDelta, SYNC_SERVICE_TYPE};
pub use time::{parse_date, parse_time_delta, Date, TimeDelta};
pub use workspace::{RemovedGraph, Workspace};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
