//! Category membership and inherited appearance.
//!
//! # Responsibility
//! - Maintain the bidirectional category link: both sides always change in
//!   the same batch, category side staged first.
//! - Answer containment queries (flat and tree-aware) and compute recursive
//!   member sets honouring the exclusive-subcategories flag.
//! - Resolve effective colours and fonts: own value, then category mix,
//!   then (tree mode) the parent's effective value.
//!
//! # Invariants
//! - `category.categorizables` contains `x` iff `x.categories` contains the
//!   category, for every live pair.
//! - Efforts never link to categories directly; their appearance delegates
//!   to the owning task.

use crate::appearance::{mix_colors, mix_fonts, FontSpec, Rgba};
use crate::attribute::SetCell;
use crate::error::DomainError;
use crate::event::EventBatch;
use crate::model::composite::{Composite, CompositeCore};
use crate::model::{EntityId, EntityKind};
use crate::workspace::Workspace;
use log::warn;
use std::collections::BTreeSet;

impl Workspace {
    /// Links `item` into `category`, updating both sides in one batch.
    pub fn add_category_link(
        &mut self,
        category: EntityId,
        item: EntityId,
        batch: Option<&mut EventBatch>,
    ) -> Result<(), DomainError> {
        self.transact(batch, |ws, batch| {
            ws.check_link(category, item)?;
            let category_record = ws
                .categories
                .get_mut(category)
                .ok_or(DomainError::UnknownEntity(category))?;
            category_record.categorizables.insert(category, item, batch);
            let cell = ws
                .item_categories_mut(item)
                .ok_or(DomainError::NotCategorizable(item))?;
            cell.insert(item, category, batch);
            Ok(())
        })
    }

    /// Unlinks `item` from `category`, updating both sides in one batch.
    pub fn remove_category_link(
        &mut self,
        category: EntityId,
        item: EntityId,
        batch: Option<&mut EventBatch>,
    ) -> Result<(), DomainError> {
        self.transact(batch, |ws, batch| {
            ws.check_link(category, item)?;
            let category_record = ws
                .categories
                .get_mut(category)
                .ok_or(DomainError::UnknownEntity(category))?;
            category_record.categorizables.remove(category, item, batch);
            let cell = ws
                .item_categories_mut(item)
                .ok_or(DomainError::NotCategorizable(item))?;
            cell.remove(item, category, batch);
            Ok(())
        })
    }

    /// Toggles a category in or out of the active filter.
    pub fn set_category_filtered(
        &mut self,
        category: EntityId,
        filtered: bool,
        batch: Option<&mut EventBatch>,
    ) -> Result<(), DomainError> {
        self.transact(batch, |ws, batch| {
            let record = ws
                .categories
                .get_mut(category)
                .ok_or(DomainError::UnknownEntity(category))?;
            record.set_filtered(filtered, batch);
            Ok(())
        })
    }

    pub fn set_exclusive_subcategories(
        &mut self,
        category: EntityId,
        exclusive: bool,
        batch: Option<&mut EventBatch>,
    ) -> Result<(), DomainError> {
        self.transact(batch, |ws, batch| {
            let record = ws
                .categories
                .get_mut(category)
                .ok_or(DomainError::UnknownEntity(category))?;
            record.set_exclusive_subcategories(exclusive, batch);
            Ok(())
        })
    }

    fn check_link(&self, category: EntityId, item: EntityId) -> Result<(), DomainError> {
        let category_kind = self
            .kind_of(category)
            .ok_or(DomainError::UnknownEntity(category))?;
        if category_kind != EntityKind::Category {
            return Err(DomainError::WrongKind {
                id: category,
                expected: EntityKind::Category,
                actual: category_kind,
            });
        }
        let item_kind = self.kind_of(item).ok_or(DomainError::UnknownEntity(item))?;
        if !item_kind.is_categorizable() {
            return Err(DomainError::NotCategorizable(item));
        }
        Ok(())
    }

    /// Direct members of `category`, or the recursive set including every
    /// subcategory's members. A category flagged with exclusive
    /// subcategories keeps its children's members to themselves.
    pub fn category_member_ids(&self, category: EntityId, recursive: bool) -> BTreeSet<EntityId> {
        let mut members = BTreeSet::new();
        let Some(record) = self.categories.get(category) else {
            return members;
        };
        members.extend(record.categorizables.ids());
        if !recursive || record.has_exclusive_subcategories() {
            return members;
        }
        let mut visited = BTreeSet::new();
        visited.insert(category);
        let mut stack: Vec<EntityId> = record.core().children().to_vec();
        while let Some(current) = stack.pop() {
            if !visited.insert(current) {
                continue;
            }
            if let Some(child) = self.categories.get(current) {
                members.extend(child.categorizables.ids());
                if !child.has_exclusive_subcategories() {
                    stack.extend(child.core().children().iter().copied());
                }
            }
        }
        members
    }

    /// Whether `category` contains `item`. Flat mode asks about the item
    /// itself; tree mode asks about its whole family, so ancestors become
    /// visible when a descendant matches.
    pub fn category_contains(&self, category: EntityId, item: EntityId, tree_mode: bool) -> bool {
        let members = self.category_member_ids(category, true);
        if tree_mode {
            self.family(item).iter().any(|id| members.contains(id))
        } else {
            members.contains(&item)
        }
    }

    // ---- inherited appearance ------------------------------------------

    /// Own foreground colour, else the mix of the entity's categories'
    /// effective colours, else (tree mode) the parent's effective colour.
    pub fn effective_foreground_color(&self, id: EntityId, tree_mode: bool) -> Option<Rgba> {
        self.resolve_color(id, tree_mode, &mut BTreeSet::new(), CompositeCore::foreground_color)
    }

    pub fn effective_background_color(&self, id: EntityId, tree_mode: bool) -> Option<Rgba> {
        self.resolve_color(id, tree_mode, &mut BTreeSet::new(), CompositeCore::background_color)
    }

    /// Font resolution, same precedence as colours.
    pub fn effective_font(&self, id: EntityId, tree_mode: bool) -> Option<FontSpec> {
        self.resolve_font(id, tree_mode, &mut BTreeSet::new())
    }

    fn resolve_color(
        &self,
        id: EntityId,
        tree_mode: bool,
        visited: &mut BTreeSet<EntityId>,
        own: fn(&CompositeCore) -> Option<Rgba>,
    ) -> Option<Rgba> {
        if !visited.insert(id) {
            return None;
        }
        if let Some(effort) = self.efforts.get(id) {
            return self.resolve_color(effort.task_id(), tree_mode, visited, own);
        }
        let core = self.core(id)?;
        if let Some(color) = own(core) {
            return Some(color);
        }
        let from_categories: Vec<Rgba> = self
            .claimed_category_ids(id)
            .into_iter()
            .filter_map(|category| self.resolve_color(category, tree_mode, visited, own))
            .collect();
        if let Some(mixed) = mix_colors(&from_categories) {
            return Some(mixed);
        }
        if tree_mode {
            if let Some(parent) = core.parent() {
                return self.resolve_color(parent, tree_mode, visited, own);
            }
        }
        None
    }

    fn resolve_font(
        &self,
        id: EntityId,
        tree_mode: bool,
        visited: &mut BTreeSet<EntityId>,
    ) -> Option<FontSpec> {
        if !visited.insert(id) {
            return None;
        }
        if let Some(effort) = self.efforts.get(id) {
            return self.resolve_font(effort.task_id(), tree_mode, visited);
        }
        let core = self.core(id)?;
        if let Some(font) = core.font() {
            return Some(font.clone());
        }
        let from_categories: Vec<FontSpec> = self
            .claimed_category_ids(id)
            .into_iter()
            .filter_map(|category| self.resolve_font(category, tree_mode, visited))
            .collect();
        if let Some(mixed) = mix_fonts(&from_categories) {
            return Some(mixed);
        }
        if tree_mode {
            if let Some(parent) = core.parent() {
                return self.resolve_font(parent, tree_mode, visited);
            }
        }
        None
    }

    /// Category ids an entity claims, empty for kinds without membership.
    pub fn claimed_category_ids(&self, id: EntityId) -> Vec<EntityId> {
        self.item_categories(id)
            .map(|cell| cell.ids().collect())
            .unwrap_or_default()
    }

    // ---- link bookkeeping used by insert/remove/restore ----------------

    /// Re-establishes the category side of every link `item` claims. Loaded
    /// and restored entities arrive with their member side already filled.
    pub(crate) fn relink_claimed_categories(&mut self, item: EntityId, batch: &mut EventBatch) {
        let claimed = self.claimed_category_ids(item);
        for category in claimed {
            match self.categories.get_mut(category) {
                Some(record) => {
                    record.categorizables.insert(category, item, batch);
                }
                None => warn!(
                    "event=category_missing module=workspace item={} category={} status=skipped",
                    item, category
                ),
            }
        }
    }

    /// Drops `category` from the member's own category set. Used when the
    /// category is being removed and the member survives.
    pub(crate) fn unlink_member_side(
        &mut self,
        member: EntityId,
        category: EntityId,
        batch: &mut EventBatch,
    ) {
        if let Some(cell) = self.item_categories_mut(member) {
            cell.remove(member, category, batch);
        }
    }

    /// Puts `category` back into the member's own category set. Used when a
    /// removed category is restored.
    pub(crate) fn relink_member_side(
        &mut self,
        member: EntityId,
        category: EntityId,
        batch: &mut EventBatch,
    ) {
        if let Some(cell) = self.item_categories_mut(member) {
            cell.insert(member, category, batch);
        }
    }

    /// Removes every id in `removed` from the member sets of surviving
    /// categories. The member-side cells are left intact so a restore can
    /// re-establish the links from them.
    pub(crate) fn unlink_categories_for_removal(
        &mut self,
        removed: &[EntityId],
        batch: &mut EventBatch,
    ) {
        let survivors: Vec<EntityId> = self
            .categories
            .ids()
            .iter()
            .copied()
            .filter(|id| !removed.contains(id))
            .collect();
        for category in survivors {
            if let Some(record) = self.categories.get_mut(category) {
                for member in removed {
                    record.categorizables.remove(category, *member, batch);
                }
            }
        }
    }

    /// Scrubs removed task ids from surviving prerequisite sets. Returns
    /// the `(task, prerequisite)` pairs actually dropped, for undo.
    pub(crate) fn scrub_prerequisites(
        &mut self,
        removed: &[EntityId],
        batch: &mut EventBatch,
    ) -> Vec<(EntityId, EntityId)> {
        let survivors: Vec<EntityId> = self
            .tasks
            .ids()
            .iter()
            .copied()
            .filter(|id| !removed.contains(id))
            .collect();
        let mut scrubbed = Vec::new();
        for task_id in survivors {
            if let Some(task) = self.tasks.get_mut(task_id) {
                for prerequisite in removed {
                    if task.prerequisites.remove(task_id, *prerequisite, batch) {
                        scrubbed.push((task_id, *prerequisite));
                    }
                }
            }
        }
        scrubbed
    }

    fn item_categories(&self, id: EntityId) -> Option<&SetCell> {
        if let Some(task) = self.tasks.get(id) {
            return Some(&task.categories);
        }
        if let Some(note) = self.notes.get(id) {
            return Some(&note.categories);
        }
        if let Some(attachment) = self.attachments.get(id) {
            return Some(&attachment.categories);
        }
        None
    }

    fn item_categories_mut(&mut self, id: EntityId) -> Option<&mut SetCell> {
        if self.tasks.contains(id) {
            return self.tasks.get_mut(id).map(|task| &mut task.categories);
        }
        if self.notes.contains(id) {
            return self.notes.get_mut(id).map(|note| &mut note.categories);
        }
        if self.attachments.contains(id) {
            return self
                .attachments
                .get_mut(id)
                .map(|attachment| &mut attachment.categories);
        }
        None
    }
}
