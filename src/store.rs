// TaskStore: the authoritative task collection and its mutations

use crate::clock::Clock;
use crate::config::Config;
use crate::filter::{Filter, SortOrder};
use crate::models::{Task, TaskId};
use crate::persist::Persistence;
use eyre::Result;
use tracing::{debug, info, warn};

/// Behavior switches for a [`TaskStore`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StoreOptions {
    /// Refuse to commit an edit whose text is blank (after trimming)
    pub reject_blank_edits: bool,
}

impl From<&Config> for StoreOptions {
    fn from(config: &Config) -> Self {
        Self {
            reject_blank_edits: config.reject_blank_edits,
        }
    }
}

/// In-memory owner of the task collection.
///
/// Tasks are kept in insertion order. Every mutation that changes the
/// collection is written through to the persistence adapter. A failed write
/// is logged and leaves the store dirty; memory is never rolled back, and
/// [`TaskStore::flush`] retries the write.
///
/// At most one task is being edited at a time.
pub struct TaskStore<P, C> {
    tasks: Vec<Task>,
    editing: Option<TaskId>,
    last_id: TaskId,
    dirty: bool,
    persistence: P,
    clock: C,
    options: StoreOptions,
}

impl<P: Persistence, C: Clock> TaskStore<P, C> {
    /// Load the collection from `persistence` and take ownership of it
    pub fn open(mut persistence: P, clock: C, options: StoreOptions) -> Self {
        let tasks = persistence.load();
        let last_id = tasks.iter().map(|t| t.id).max().unwrap_or(0);

        info!(count = tasks.len(), "Opened task store");

        Self {
            tasks,
            editing: None,
            last_id,
            dirty: false,
            persistence,
            clock,
            options,
        }
    }

    // ========================================================================
    // Mutations
    // ========================================================================

    /// Append a new pending task.
    ///
    /// Blank text is ignored and returns `None`, as does an exhausted id space
    /// (a stored task already holds `u64::MAX`).
    pub fn add(&mut self, text: &str) -> Option<TaskId> {
        if text.trim().is_empty() {
            debug!("add: ignoring blank text");
            return None;
        }

        let now = self.clock.now();
        let Some(id) = self.fresh_id(now.timestamp_millis()) else {
            warn!(last_id = self.last_id, "add: no task ids left");
            return None;
        };
        self.tasks.push(Task::new(id, text, now));

        info!(id, "Added task");
        self.persist();
        Some(id)
    }

    /// Remove a task. Returns false if no task has this id.
    pub fn remove(&mut self, id: TaskId) -> bool {
        let Some(pos) = self.position(id) else {
            debug!(id, "remove: no such task");
            return false;
        };

        self.tasks.remove(pos);
        if self.editing == Some(id) {
            self.editing = None;
        }

        info!(id, "Removed task");
        self.persist();
        true
    }

    /// Flip a task's completion flag. Returns false if no task has this id.
    pub fn toggle(&mut self, id: TaskId) -> bool {
        let Some(task) = self.tasks.iter_mut().find(|t| t.id == id) else {
            debug!(id, "toggle: no such task");
            return false;
        };

        task.completed = !task.completed;
        info!(id, completed = task.completed, "Toggled task");
        self.persist();
        true
    }

    /// Put a task into edit mode and return its current text.
    ///
    /// Any edit already in progress is abandoned without applying it.
    /// Unknown ids return `None` and leave the edit slot alone.
    pub fn begin_edit(&mut self, id: TaskId) -> Option<String> {
        let text = self.get(id)?.text.clone();

        if let Some(previous) = self.editing.replace(id) {
            if previous != id {
                debug!(previous, id, "begin_edit: abandoning previous edit");
            }
        }

        Some(text)
    }

    /// Replace a task's text and leave edit mode.
    ///
    /// The text is stored as given, without trimming. Returns true if a task
    /// was updated. With `reject_blank_edits`, blank text is refused and the
    /// edit stays open.
    pub fn commit_edit(&mut self, id: TaskId, new_text: &str) -> bool {
        if self.options.reject_blank_edits && new_text.trim().is_empty() {
            debug!(id, "commit_edit: refusing blank text");
            return false;
        }

        self.editing = None;

        let Some(task) = self.tasks.iter_mut().find(|t| t.id == id) else {
            debug!(id, "commit_edit: no such task");
            return false;
        };

        task.text = new_text.to_string();
        info!(id, "Edited task");
        self.persist();
        true
    }

    /// Leave edit mode without applying anything
    pub fn cancel_edit(&mut self) {
        self.editing = None;
    }

    /// Write the collection if an earlier save failed
    pub fn flush(&mut self) -> Result<()> {
        if !self.dirty {
            return Ok(());
        }

        self.persistence.save(&self.tasks)?;
        self.dirty = false;
        Ok(())
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// Filtered and sorted projection; stored order is unaffected
    pub fn view(&self, filter: Filter, sort: SortOrder) -> Vec<&Task> {
        crate::filter::view(&self.tasks, filter, sort)
    }

    /// All tasks in insertion order
    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn get(&self, id: TaskId) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    /// Id of the task currently being edited
    pub fn editing(&self) -> Option<TaskId> {
        self.editing
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// True when the last write to persistence failed
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn persistence(&self) -> &P {
        &self.persistence
    }

    pub fn into_persistence(self) -> P {
        self.persistence
    }

    // ========================================================================
    // Helper methods
    // ========================================================================

    fn position(&self, id: TaskId) -> Option<usize> {
        self.tasks.iter().position(|t| t.id == id)
    }

    /// Time-derived id, bumped past the last issued id when the clock has not moved
    fn fresh_id(&mut self, now_ms: i64) -> Option<TaskId> {
        let candidate = u64::try_from(now_ms).unwrap_or(0);
        let id = candidate.max(self.last_id.checked_add(1)?);
        self.last_id = id;
        Some(id)
    }

    fn persist(&mut self) {
        match self.persistence.save(&self.tasks) {
            Ok(()) => self.dirty = false,
            Err(e) => {
                warn!(error = ?e, count = self.tasks.len(), "Failed to persist tasks, keeping in-memory state");
                self.dirty = true;
            }
        }
    }
}
