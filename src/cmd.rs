//! Command implementations for the CLI interface.
//!
//! Every mutating command goes through the same `TaskManager` the UI uses and
//! waits for its save to land before the process exits.

use std::path::Path;

use clap::Subcommand;
use clap_complete::{generate, Shell};

use crate::bridge::{Bridge, HostShell};
use crate::db::truncate;
use crate::fields::Filter;
use crate::manager::TaskManager;
use crate::tui::run::run_tui;
use crate::view::TodoView;

#[derive(Subcommand)]
pub enum Commands {
    /// Launch the interactive UI (default).
    Ui,

    /// Add a new task to the top of the list.
    Add {
        /// Task text. Surrounding whitespace is trimmed.
        text: String,
    },

    /// List tasks.
    List {
        /// Which tasks to show.
        #[arg(long, value_enum, default_value_t = Filter::All)]
        filter: Filter,
    },

    /// Flip a task between done and not done.
    Toggle {
        /// Task ID.
        id: u64,
    },

    /// Replace a task's text.
    Edit {
        /// Task ID.
        id: u64,
        /// New text. Blank text leaves the task unchanged.
        text: String,
    },

    /// Delete a task.
    Delete {
        /// Task ID.
        id: u64,
    },

    /// Remove every completed task.
    ClearCompleted,

    /// Check every task, or uncheck them all if they are all done.
    ToggleAll,

    /// Print the path of the todo file.
    Path,

    /// Generate shell completion scripts.
    Completions {
        /// Shell to generate completions for.
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Launch the terminal user interface.
pub fn cmd_ui<B: Bridge>(manager: TaskManager<B>, shell: HostShell) {
    if let Err(e) = run_tui(manager, shell) {
        eprintln!("UI error: {e}");
        std::process::exit(1);
    }
}

/// Add a new task.
pub fn cmd_add<B: Bridge>(manager: &mut TaskManager<B>, text: String) {
    match manager.add(&text) {
        Some(id) => {
            finish(manager);
            println!("Added {id}");
        }
        None => {
            eprintln!("Task text cannot be empty.");
            std::process::exit(1);
        }
    }
}

/// Print the list under `filter`, with the same counts the UI shows.
pub fn cmd_list<B: Bridge>(manager: &mut TaskManager<B>, filter: Filter) {
    manager.set_filter(filter);
    let view = TodoView::build(manager.todos(), manager.filter());
    if let Some(message) = view.empty_message {
        println!("{message}");
    } else {
        println!("{:<15} {:<5} {}", "ID", "Done", "Text");
        for row in &view.rows {
            println!(
                "{:<15} {:<5} {}",
                row.id,
                if row.completed { "[x]" } else { "[ ]" },
                truncate(&row.text, 80)
            );
        }
    }
    println!("{}, {}", view.total_label(), view.completed_label());
}

/// Toggle a task's completion flag.
pub fn cmd_toggle<B: Bridge>(manager: &mut TaskManager<B>, id: u64) {
    if !manager.toggle(id) {
        eprintln!("Task {id} not found.");
        std::process::exit(1);
    }
    finish(manager);
    let done = manager.get(id).is_some_and(|t| t.completed);
    println!("{id} is now {}", if done { "done" } else { "open" });
}

/// Replace a task's text.
pub fn cmd_edit<B: Bridge>(manager: &mut TaskManager<B>, id: u64, text: String) {
    if manager.get(id).is_none() {
        eprintln!("Task {id} not found.");
        std::process::exit(1);
    }
    if !manager.edit(id, &text) {
        println!("Blank text, {id} left unchanged.");
        return;
    }
    finish(manager);
    println!("Updated {id}");
}

/// Delete a task.
pub fn cmd_delete<B: Bridge>(manager: &mut TaskManager<B>, id: u64) {
    if !manager.delete(id) {
        eprintln!("Task {id} not found.");
        std::process::exit(1);
    }
    finish(manager);
    println!("Deleted {id}");
}

/// Remove all completed tasks.
pub fn cmd_clear_completed<B: Bridge>(manager: &mut TaskManager<B>) {
    let removed = manager.clear_completed();
    if removed == 0 {
        println!("No completed tasks.");
        return;
    }
    finish(manager);
    println!("Cleared {removed} completed task(s).");
}

/// Check all, or uncheck all when everything is already done.
pub fn cmd_toggle_all<B: Bridge>(manager: &mut TaskManager<B>) {
    if !manager.toggle_all() {
        println!("No tasks.");
        return;
    }
    finish(manager);
    let stats = manager.stats();
    println!("{} of {} completed", stats.completed, stats.total);
}

/// Print the todo file location.
pub fn cmd_path(data_file: &Path) {
    println!("{}", data_file.display());
}

/// Generate shell completion scripts.
pub fn cmd_completions(shell: Shell) {
    use clap::CommandFactory;
    use crate::cli::Cli;

    let mut app = Cli::command();
    let app_name = app.get_name().to_string();
    generate(shell, &mut app, app_name, &mut std::io::stdout());
}

/// Wait for the save to land; a failed save ends the process non-zero.
fn finish<B: Bridge>(manager: &mut TaskManager<B>) {
    if let Err(e) = manager.flush() {
        eprintln!("Failed to save todos: {e}");
        std::process::exit(1);
    }
}
