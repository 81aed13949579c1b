//! Pure projection of the task list into what the screen shows.

use crate::fields::Filter;
use crate::task::Task;

pub const CHECK_ALL: &str = "Check All";
pub const UNCHECK_ALL: &str = "Uncheck All";

/// One visible task row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowView {
    pub id: u64,
    pub text: String,
    pub completed: bool,
}

/// Everything the list screen needs, computed from the list and the filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TodoView {
    pub filter: Filter,
    pub rows: Vec<RowView>,
    /// Set when no task passes the filter.
    pub empty_message: Option<&'static str>,
    pub total: usize,
    pub completed: usize,
    pub toggle_all_label: &'static str,
    pub show_clear_completed: bool,
}

impl TodoView {
    pub fn build(todos: &[Task], filter: Filter) -> Self {
        let rows: Vec<RowView> = todos
            .iter()
            .filter(|t| filter.matches(t))
            .map(|t| RowView {
                id: t.id,
                text: display_text(&t.text),
                completed: t.completed,
            })
            .collect();
        let total = todos.len();
        let completed = todos.iter().filter(|t| t.completed).count();
        let all_completed = total > 0 && completed == total;

        TodoView {
            filter,
            empty_message: rows.is_empty().then(|| filter.empty_message()),
            rows,
            total,
            completed,
            toggle_all_label: if all_completed { UNCHECK_ALL } else { CHECK_ALL },
            show_clear_completed: completed > 0,
        }
    }

    /// "1 task" / "N tasks".
    pub fn total_label(&self) -> String {
        format!("{} task{}", self.total, if self.total == 1 { "" } else { "s" })
    }

    pub fn completed_label(&self) -> String {
        format!("{} completed", self.completed)
    }
}

/// Task text made safe to print: control characters, terminal escape
/// sequences included, are shown in escaped form instead of being emitted.
pub fn display_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if c.is_control() {
            out.extend(c.escape_default());
        } else {
            out.push(c);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn tasks(specs: &[(u64, &str, bool)]) -> Vec<Task> {
        specs
            .iter()
            .map(|&(id, text, completed)| {
                let mut t = Task::new(id, text.into(), Utc::now());
                t.completed = completed;
                t
            })
            .collect()
    }

    #[test]
    fn empty_messages_depend_on_filter() {
        let none = TodoView::build(&[], Filter::All);
        assert_eq!(none.empty_message, Some("No tasks yet! Add one above to get started."));

        let all_done = tasks(&[(1, "a", true)]);
        let active = TodoView::build(&all_done, Filter::Active);
        assert_eq!(active.empty_message, Some("All tasks completed! Great job!"));

        let open = tasks(&[(1, "a", false)]);
        let completed = TodoView::build(&open, Filter::Completed);
        assert_eq!(completed.empty_message, Some("No completed tasks yet."));
        assert_eq!(TodoView::build(&open, Filter::All).empty_message, None);
    }

    #[test]
    fn active_view_of_mixed_list() {
        let list = tasks(&[(2, "done", true), (1, "open", false)]);
        let view = TodoView::build(&list, Filter::Active);
        assert_eq!(view.rows.len(), 1);
        assert_eq!(view.rows[0].text, "open");
        assert_eq!(view.total, 2);
        assert_eq!(view.completed, 1);
        assert_eq!(view.total_label(), "2 tasks");
        assert_eq!(view.completed_label(), "1 completed");
        assert!(view.show_clear_completed);
        assert_eq!(view.toggle_all_label, CHECK_ALL);
    }

    #[test]
    fn bulk_label_and_clear_control_follow_completion() {
        let list = tasks(&[(1, "a", true)]);
        let view = TodoView::build(&list, Filter::All);
        assert_eq!(view.toggle_all_label, UNCHECK_ALL);
        assert_eq!(view.total_label(), "1 task");

        let empty = TodoView::build(&[], Filter::All);
        assert_eq!(empty.toggle_all_label, CHECK_ALL);
        assert!(!empty.show_clear_completed);
    }

    #[test]
    fn control_characters_are_escaped() {
        assert_eq!(display_text("plain <b>&</b>"), "plain <b>&</b>");
        assert_eq!(display_text("red\u{1b}[31m"), "red\\u{1b}[31m");
        assert_eq!(display_text("two\nlines"), "two\\nlines");
    }
}
