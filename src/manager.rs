//! In-memory task list and the transitions the user can apply to it.
//!
//! `TaskManager` is the single owner of the list for the lifetime of a
//! session. Every transition that changes the list hands a full snapshot to
//! the bridge before returning; the caller re-renders afterwards. Saves are
//! optimistic: a failed save is reported through `poll_saves` but the
//! in-memory list is kept as it is.

use chrono::Utc;
use tracing::{debug, error, info};

use crate::bridge::{Bridge, Pending};
use crate::db::StorageError;
use crate::fields::Filter;
use crate::task::{IdClock, Task};

/// Aggregate counts over the whole list, independent of the filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Stats {
    pub total: usize,
    pub completed: usize,
}

pub struct TaskManager<B: Bridge> {
    bridge: B,
    todos: Vec<Task>,
    filter: Filter,
    ids: IdClock,
    in_flight: Vec<Pending<()>>,
}

impl<B: Bridge> TaskManager<B> {
    /// Load the persisted list through `bridge` and start with the `all` filter.
    pub fn load(bridge: B) -> Self {
        let todos = match bridge.load_todos().wait() {
            Ok(todos) => todos,
            Err(e) => {
                error!(error = %e, "failed to load todos, starting empty");
                Vec::new()
            }
        };
        info!(count = todos.len(), "loaded todos");
        TaskManager {
            ids: IdClock::seeded(&todos),
            bridge,
            todos,
            filter: Filter::default(),
            in_flight: Vec::new(),
        }
    }

    pub fn bridge(&self) -> &B {
        &self.bridge
    }

    pub fn todos(&self) -> &[Task] {
        &self.todos
    }

    pub fn filter(&self) -> Filter {
        self.filter
    }

    pub fn get(&self, id: u64) -> Option<&Task> {
        self.todos.iter().find(|t| t.id == id)
    }

    fn get_mut(&mut self, id: u64) -> Option<&mut Task> {
        self.todos.iter_mut().find(|t| t.id == id)
    }

    /// Tasks visible under the current filter, in list order.
    pub fn filtered_todos(&self) -> Vec<&Task> {
        self.todos.iter().filter(|t| self.filter.matches(t)).collect()
    }

    pub fn stats(&self) -> Stats {
        Stats {
            total: self.todos.len(),
            completed: self.todos.iter().filter(|t| t.completed).count(),
        }
    }

    /// True when the list is non-empty and every task is completed.
    pub fn all_completed(&self) -> bool {
        !self.todos.is_empty() && self.todos.iter().all(|t| t.completed)
    }

    /// Add a task to the front of the list. Blank text is ignored.
    pub fn add(&mut self, text: &str) -> Option<u64> {
        let text = text.trim();
        if text.is_empty() {
            return None;
        }
        let now = Utc::now();
        let id = self.ids.next(now);
        self.todos.insert(0, Task::new(id, text.to_string(), now));
        debug!(id, "added todo");
        self.persist();
        Some(id)
    }

    /// Flip the completion flag of task `id`.
    pub fn toggle(&mut self, id: u64) -> bool {
        let Some(task) = self.get_mut(id) else {
            return false;
        };
        task.completed = !task.completed;
        self.persist();
        true
    }

    /// Replace the text of task `id`. Blank text leaves the task unchanged.
    pub fn edit(&mut self, id: u64, text: &str) -> bool {
        let text = text.trim();
        if text.is_empty() {
            return false;
        }
        let Some(task) = self.get_mut(id) else {
            return false;
        };
        task.text = text.to_string();
        self.persist();
        true
    }

    /// Remove task `id` from the list.
    pub fn delete(&mut self, id: u64) -> bool {
        let before = self.todos.len();
        self.todos.retain(|t| t.id != id);
        if self.todos.len() == before {
            return false;
        }
        debug!(id, "deleted todo");
        self.persist();
        true
    }

    /// Drop every completed task. Nothing is saved when none are completed.
    pub fn clear_completed(&mut self) -> usize {
        let before = self.todos.len();
        self.todos.retain(|t| !t.completed);
        let removed = before - self.todos.len();
        if removed > 0 {
            debug!(removed, "cleared completed todos");
            self.persist();
        }
        removed
    }

    /// Mark everything incomplete if all tasks are done, otherwise mark
    /// everything done.
    pub fn toggle_all(&mut self) -> bool {
        // The document on disk already matches an empty list; skip the save.
        if self.todos.is_empty() {
            return false;
        }
        let completed = !self.all_completed();
        for task in &mut self.todos {
            task.completed = completed;
        }
        self.persist();
        true
    }

    pub fn set_filter(&mut self, filter: Filter) {
        self.filter = filter;
    }

    /// Collect the outcome of saves that have finished. Returns the failures.
    pub fn poll_saves(&mut self) -> Vec<StorageError> {
        let mut failures = Vec::new();
        self.in_flight.retain(|pending| match pending.try_take() {
            None => true,
            Some(Ok(())) => false,
            Some(Err(e)) => {
                failures.push(e);
                false
            }
        });
        failures
    }

    /// Wait for every outstanding save. Returns the last failure, if any.
    pub fn flush(&mut self) -> Result<(), StorageError> {
        let mut outcome = Ok(());
        for pending in self.in_flight.drain(..) {
            if let Err(e) = pending.wait() {
                outcome = Err(e);
            }
        }
        outcome
    }

    fn persist(&mut self) {
        let pending = self.bridge.save_todos(self.todos.clone());
        self.in_flight.push(pending);
    }
}
