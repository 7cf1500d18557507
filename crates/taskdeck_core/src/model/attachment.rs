//! Attachment record.
//!
//! # Responsibility
//! - Reference an external resource by kind and location.
//! - Resolve file locations against a working directory.
//!
//! # Invariants
//! - The core never reads attachment contents; locations are opaque
//!   strings until an embedder resolves them.

use crate::attribute::{SetCell, ValueCell};
use crate::event::EventBatch;
use crate::model::composite::{Composite, CompositeCore, Entity};
use crate::model::{EntityId, EntityKind};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// How an attachment location is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttachmentKind {
    /// Path, relative locations resolved against the working directory.
    File,
    /// Arbitrary URI, used verbatim.
    Uri,
    /// Mail message reference, used verbatim.
    Mail,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Attachment {
    core: CompositeCore,
    attachment_kind: AttachmentKind,
    location: ValueCell<String>,
    pub(crate) categories: SetCell,
}

impl Attachment {
    pub fn new(
        attachment_kind: AttachmentKind,
        location: impl Into<String>,
        subject: impl Into<String>,
    ) -> Attachment {
        Self::with_id(Uuid::new_v4(), attachment_kind, location, subject)
    }

    pub fn with_id(
        id: EntityId,
        attachment_kind: AttachmentKind,
        location: impl Into<String>,
        subject: impl Into<String>,
    ) -> Attachment {
        Attachment {
            core: CompositeCore::with_id(id, EntityKind::Attachment, subject),
            attachment_kind,
            location: ValueCell::new("attachment.location", location.into()),
            categories: SetCell::new(None, None, Some("attachment.categories")),
        }
    }

    pub fn attachment_kind(&self) -> AttachmentKind {
        self.attachment_kind
    }

    pub fn location(&self) -> &str {
        self.location.get()
    }

    pub fn set_location(&mut self, value: impl Into<String>, batch: &mut EventBatch) -> bool {
        let id = self.id();
        self.location.set(id, value.into(), batch)
    }

    pub fn category_ids(&self) -> Vec<EntityId> {
        self.categories.ids().collect()
    }

    /// Location with relative file paths resolved against `working_dir`.
    /// URI and mail locations come back unchanged.
    pub fn resolved_location(&self, working_dir: &Path) -> PathBuf {
        match self.attachment_kind {
            AttachmentKind::File => {
                let path = Path::new(self.location());
                if path.is_absolute() {
                    path.to_path_buf()
                } else {
                    working_dir.join(path)
                }
            }
            AttachmentKind::Uri | AttachmentKind::Mail => PathBuf::from(self.location()),
        }
    }
}

impl Entity for Attachment {
    fn id(&self) -> EntityId {
        self.core.id()
    }

    fn kind(&self) -> EntityKind {
        EntityKind::Attachment
    }
}

impl Composite for Attachment {
    fn core(&self) -> &CompositeCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut CompositeCore {
        &mut self.core
    }
}
