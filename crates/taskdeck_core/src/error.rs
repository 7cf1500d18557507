//! Domain error taxonomy.
//!
//! # Responsibility
//! - Name every way a mutation can be refused.
//! - Keep invalid *input* out of the error path; bad input falls back to
//!   documented defaults at the parsing layer instead.
//!
//! # Invariants
//! - A returned error means the mutation left the model untouched.

use crate::model::{EntityId, EntityKind};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Error for refused domain mutations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// No entity with this id exists in the workspace.
    UnknownEntity(EntityId),
    /// An entity with this id already exists.
    DuplicateEntity(EntityId),
    /// The entity exists but has the wrong kind for the operation.
    WrongKind {
        id: EntityId,
        expected: EntityKind,
        actual: EntityKind,
    },
    /// The entity kind cannot belong to categories.
    NotCategorizable(EntityId),
    /// The entity exists but carries no composite attributes (efforts).
    NotComposite(EntityId),
    /// The child already lives under another parent.
    AlreadyHasParent { child: EntityId, parent: EntityId },
    /// The link would turn the forest into a cyclic graph.
    CycleDetected { child: EntityId, parent: EntityId },
    /// The ids do not form a parent/child pair.
    NotAChild { child: EntityId, parent: EntityId },
    /// The effort stop stamp lies before its start stamp.
    StopBeforeStart(EntityId),
}

impl Display for DomainError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownEntity(id) => write!(f, "unknown entity: {id}"),
            Self::DuplicateEntity(id) => write!(f, "entity already exists: {id}"),
            Self::WrongKind {
                id,
                expected,
                actual,
            } => write!(
                f,
                "entity {id} is a {} but a {} was expected",
                actual.label(),
                expected.label()
            ),
            Self::NotCategorizable(id) => write!(f, "entity {id} cannot belong to categories"),
            Self::NotComposite(id) => {
                write!(f, "entity {id} carries no composite attributes")
            }
            Self::AlreadyHasParent { child, parent } => {
                write!(f, "child {child} already has a parent other than {parent}")
            }
            Self::CycleDetected { child, parent } => {
                write!(f, "linking {child} under {parent} would create a cycle")
            }
            Self::NotAChild { child, parent } => {
                write!(f, "{child} is not a child of {parent}")
            }
            Self::StopBeforeStart(id) => {
                write!(f, "effort {id} would stop before it starts")
            }
        }
    }
}

impl Error for DomainError {}
