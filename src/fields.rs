//! View filter over the task list.

use clap::ValueEnum;

use crate::task::Task;

/// Which tasks the list shows. Pure view state; never written to disk.
#[derive(Debug, Clone, Copy, Default, ValueEnum, PartialEq, Eq)]
pub enum Filter {
    #[default]
    All,
    Active,
    Completed,
}

impl Filter {
    pub const ALL: [Filter; 3] = [Filter::All, Filter::Active, Filter::Completed];

    /// Whether `task` is visible under this filter.
    pub fn matches(self, task: &Task) -> bool {
        match self {
            Filter::All => true,
            Filter::Active => !task.completed,
            Filter::Completed => task.completed,
        }
    }

    /// Message shown when nothing passes the filter.
    pub fn empty_message(self) -> &'static str {
        match self {
            Filter::All => "No tasks yet! Add one above to get started.",
            Filter::Active => "All tasks completed! Great job!",
            Filter::Completed => "No completed tasks yet.",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Filter::All => "All",
            Filter::Active => "Active",
            Filter::Completed => "Completed",
        }
    }

    /// The filter after this one, wrapping around.
    pub fn next(self) -> Filter {
        match self {
            Filter::All => Filter::Active,
            Filter::Active => Filter::Completed,
            Filter::Completed => Filter::All,
        }
    }
}
