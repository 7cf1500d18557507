//! Reversible workspace commands and the undo/redo history.
//!
//! # Responsibility
//! - Define the command contract: execute, unexecute, human label.
//! - Keep the done/undone stacks and derive the menu labels from them.
//!
//! # Invariants
//! - Running a fresh command clears the redo stack.
//! - Every command captures whatever it needs for reversal during
//!   `execute`, so `unexecute` never guesses.

use crate::error::DomainError;
use crate::model::task::Task;
use crate::model::{EntityId, Recurrence};
use crate::time::Date;
use crate::workspace::{RemovedGraph, Workspace};
use log::info;

/// A reversible mutation of the workspace.
pub trait WorkspaceCommand {
    /// Short imperative description, used for undo/redo menu labels.
    fn label(&self) -> &str;

    fn execute(&mut self, workspace: &mut Workspace) -> Result<(), DomainError>;

    fn unexecute(&mut self, workspace: &mut Workspace) -> Result<(), DomainError>;
}

/// Undo/redo stacks owned by the embedder.
#[derive(Default)]
pub struct CommandHistory {
    done: Vec<Box<dyn WorkspaceCommand>>,
    undone: Vec<Box<dyn WorkspaceCommand>>,
}

impl CommandHistory {
    pub fn new() -> CommandHistory {
        CommandHistory::default()
    }

    /// Executes the command and, on success, appends it to the history.
    /// Any redoable tail is discarded.
    pub fn run(
        &mut self,
        workspace: &mut Workspace,
        mut command: Box<dyn WorkspaceCommand>,
    ) -> Result<(), DomainError> {
        command.execute(workspace)?;
        info!("event=command_run module=command label={:?}", command.label());
        self.undone.clear();
        self.done.push(command);
        Ok(())
    }

    /// Reverts the newest command. Returns whether anything was undone.
    pub fn undo(&mut self, workspace: &mut Workspace) -> Result<bool, DomainError> {
        let Some(mut command) = self.done.pop() else {
            return Ok(false);
        };
        match command.unexecute(workspace) {
            Ok(()) => {
                self.undone.push(command);
                Ok(true)
            }
            Err(error) => {
                self.done.push(command);
                Err(error)
            }
        }
    }

    /// Re-applies the newest undone command. Returns whether anything was
    /// redone.
    pub fn redo(&mut self, workspace: &mut Workspace) -> Result<bool, DomainError> {
        let Some(mut command) = self.undone.pop() else {
            return Ok(false);
        };
        match command.execute(workspace) {
            Ok(()) => {
                self.done.push(command);
                Ok(true)
            }
            Err(error) => {
                self.undone.push(command);
                Err(error)
            }
        }
    }

    pub fn can_undo(&self) -> bool {
        !self.done.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.undone.is_empty()
    }

    /// Menu label for the undoable tail, e.g. `Undo new task`.
    pub fn undo_label(&self) -> Option<String> {
        self.done
            .last()
            .map(|command| format!("Undo {}", command.label().to_lowercase()))
    }

    pub fn redo_label(&self) -> Option<String> {
        self.undone
            .last()
            .map(|command| format!("Redo {}", command.label().to_lowercase()))
    }

    pub fn clear(&mut self) {
        self.done.clear();
        self.undone.clear();
    }
}

// ---- concrete commands -------------------------------------------------

/// Creates one top-level task.
pub struct NewTaskCommand {
    subject: String,
    created: Option<EntityId>,
    removed: Option<RemovedGraph>,
}

impl NewTaskCommand {
    pub fn new(subject: impl Into<String>) -> NewTaskCommand {
        NewTaskCommand {
            subject: subject.into(),
            created: None,
            removed: None,
        }
    }

    /// Id of the created task, available after the first `execute`.
    pub fn created_id(&self) -> Option<EntityId> {
        self.created
    }
}

impl WorkspaceCommand for NewTaskCommand {
    fn label(&self) -> &str {
        "New task"
    }

    fn execute(&mut self, workspace: &mut Workspace) -> Result<(), DomainError> {
        if let Some(graph) = self.removed.take() {
            return workspace.restore_graph(graph, None);
        }
        let id = workspace.add_task(Task::new(self.subject.clone()), None)?;
        self.created = Some(id);
        Ok(())
    }

    fn unexecute(&mut self, workspace: &mut Workspace) -> Result<(), DomainError> {
        let id = self.created.ok_or_else(|| {
            DomainError::UnknownEntity(uuid::Uuid::nil())
        })?;
        self.removed = Some(workspace.remove_composite(id, None)?);
        Ok(())
    }
}

/// Deletes a composite with its whole cascade; undo restores everything.
pub struct DeleteCommand {
    target: EntityId,
    removed: Option<RemovedGraph>,
}

impl DeleteCommand {
    pub fn new(target: EntityId) -> DeleteCommand {
        DeleteCommand {
            target,
            removed: None,
        }
    }
}

impl WorkspaceCommand for DeleteCommand {
    fn label(&self) -> &str {
        "Delete"
    }

    fn execute(&mut self, workspace: &mut Workspace) -> Result<(), DomainError> {
        self.removed = Some(workspace.remove_composite(self.target, None)?);
        Ok(())
    }

    fn unexecute(&mut self, workspace: &mut Workspace) -> Result<(), DomainError> {
        let graph = self
            .removed
            .take()
            .ok_or(DomainError::UnknownEntity(self.target))?;
        workspace.restore_graph(graph, None)
    }
}

/// Renames one composite.
pub struct EditSubjectCommand {
    target: EntityId,
    subject: String,
    previous: Option<String>,
}

impl EditSubjectCommand {
    pub fn new(target: EntityId, subject: impl Into<String>) -> EditSubjectCommand {
        EditSubjectCommand {
            target,
            subject: subject.into(),
            previous: None,
        }
    }
}

impl WorkspaceCommand for EditSubjectCommand {
    fn label(&self) -> &str {
        "Edit subject"
    }

    fn execute(&mut self, workspace: &mut Workspace) -> Result<(), DomainError> {
        let previous = workspace
            .core(self.target)
            .ok_or(DomainError::UnknownEntity(self.target))?
            .subject()
            .to_string();
        workspace.set_subject(self.target, &self.subject, None)?;
        self.previous = Some(previous);
        Ok(())
    }

    fn unexecute(&mut self, workspace: &mut Workspace) -> Result<(), DomainError> {
        let previous = self
            .previous
            .take()
            .ok_or(DomainError::UnknownEntity(self.target))?;
        workspace.set_subject(self.target, &previous, None)
    }
}

/// Adds or removes one category membership, whichever applies.
pub struct ToggleCategoryCommand {
    category: EntityId,
    item: EntityId,
    /// Whether `execute` added the link (as opposed to removing it).
    added: Option<bool>,
}

impl ToggleCategoryCommand {
    pub fn new(category: EntityId, item: EntityId) -> ToggleCategoryCommand {
        ToggleCategoryCommand {
            category,
            item,
            added: None,
        }
    }
}

impl WorkspaceCommand for ToggleCategoryCommand {
    fn label(&self) -> &str {
        "Toggle category"
    }

    fn execute(&mut self, workspace: &mut Workspace) -> Result<(), DomainError> {
        let linked = workspace
            .claimed_category_ids(self.item)
            .contains(&self.category);
        if linked {
            workspace.remove_category_link(self.category, self.item, None)?;
            self.added = Some(false);
        } else {
            workspace.add_category_link(self.category, self.item, None)?;
            self.added = Some(true);
        }
        Ok(())
    }

    fn unexecute(&mut self, workspace: &mut Workspace) -> Result<(), DomainError> {
        match self.added.take() {
            Some(true) => workspace.remove_category_link(self.category, self.item, None),
            Some(false) => workspace.add_category_link(self.category, self.item, None),
            None => Err(DomainError::UnknownEntity(self.item)),
        }
    }
}

struct CompletionSnapshot {
    planned_start: Date,
    due: Date,
    actual_start: Date,
    completion: Date,
    percentage: u8,
    recurrence: Option<Recurrence>,
}

/// Marks a task completed, advancing it instead when it recurs.
pub struct MarkCompletedCommand {
    task: EntityId,
    completion: Date,
    snapshot: Option<CompletionSnapshot>,
}

impl MarkCompletedCommand {
    pub fn new(task: EntityId, completion: Date) -> MarkCompletedCommand {
        MarkCompletedCommand {
            task,
            completion,
            snapshot: None,
        }
    }
}

impl WorkspaceCommand for MarkCompletedCommand {
    fn label(&self) -> &str {
        "Mark completed"
    }

    fn execute(&mut self, workspace: &mut Workspace) -> Result<(), DomainError> {
        let record = workspace
            .tasks()
            .get(self.task)
            .ok_or(DomainError::UnknownEntity(self.task))?;
        self.snapshot = Some(CompletionSnapshot {
            planned_start: record.planned_start_date(),
            due: record.due_date(),
            actual_start: record.actual_start_date(),
            completion: record.completion_date(),
            percentage: record.percentage_complete(),
            recurrence: record.recurrence(),
        });
        workspace.mark_completed(self.task, self.completion, None)
    }

    fn unexecute(&mut self, workspace: &mut Workspace) -> Result<(), DomainError> {
        let snapshot = self
            .snapshot
            .take()
            .ok_or(DomainError::UnknownEntity(self.task))?;
        workspace.transact(None, |ws, batch| {
            ws.set_recurrence(self.task, snapshot.recurrence, Some(&mut *batch))?;
            ws.set_planned_start_date(self.task, snapshot.planned_start, Some(&mut *batch))?;
            ws.set_due_date(self.task, snapshot.due, Some(&mut *batch))?;
            ws.set_actual_start_date(self.task, snapshot.actual_start, Some(&mut *batch))?;
            ws.set_completion_date(self.task, snapshot.completion, Some(&mut *batch))?;
            ws.set_percentage_complete(self.task, snapshot.percentage, Some(&mut *batch))?;
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::{CommandHistory, NewTaskCommand};
    use crate::workspace::Workspace;

    #[test]
    fn undo_and_redo_labels_follow_the_stacks() {
        let mut workspace = Workspace::new();
        let mut history = CommandHistory::new();
        assert_eq!(history.undo_label(), None);

        history
            .run(&mut workspace, Box::new(NewTaskCommand::new("groceries")))
            .unwrap();
        assert_eq!(history.undo_label(), Some("Undo new task".to_string()));

        history.undo(&mut workspace).unwrap();
        assert_eq!(history.undo_label(), None);
        assert_eq!(history.redo_label(), Some("Redo new task".to_string()));
    }

    #[test]
    fn running_a_command_discards_the_redo_stack() {
        let mut workspace = Workspace::new();
        let mut history = CommandHistory::new();
        history
            .run(&mut workspace, Box::new(NewTaskCommand::new("a")))
            .unwrap();

        history.undo(&mut workspace).unwrap();
        assert!(history.can_redo());
        history
            .run(&mut workspace, Box::new(NewTaskCommand::new("b")))
            .unwrap();
        assert!(!history.can_redo());
    }
}
