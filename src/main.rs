//! # todo - a file-backed to-do list
//!
//! A single list of tasks kept in one JSON file, driven from a terminal UI or
//! straight from the command line.
//!
//! ## Quick Start
//!
//! ```bash
//! # Open the list
//! todo
//!
//! # Add and list from scripts
//! todo add "buy milk"
//! todo list --filter active
//! ```
//!
//! ## How it fits together
//!
//! - **Storage** (`db`): reads and writes the whole list as pretty-printed JSON.
//!   A missing or corrupt file reads as an empty list.
//! - **Bridge** (`bridge`): the only way the UI reaches storage or the host
//!   shell. Saves go through a single writer queue, so the last save wins.
//! - **Task manager** (`manager`): owns the list, applies add / toggle / edit /
//!   delete / clear / toggle-all, and persists after each change.
//! - **View** (`view`, `tui`): a pure projection of list and filter, drawn
//!   with ratatui.
//!
//! Data lives in the platform data directory (`todo path` prints it); set
//! `--data-file` or `TODO_DESK_DATA` to use another file. Diagnostics go to a
//! log file next to it, filtered by `RUST_LOG`.

use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

pub mod bridge;
pub mod cli;
pub mod cmd;
pub mod db;
pub mod fields;
pub mod manager;
pub mod task;
pub mod view;
pub mod tui {
    pub mod app;
    pub mod colors;
    pub mod enums;
    pub mod input;
    pub mod run;
    pub mod utils;
}

use bridge::LocalBridge;
use cli::Cli;
use cmd::*;
use db::default_data_path;
use manager::TaskManager;

/// Route `tracing` output to `log_file`. The terminal belongs to the UI, so
/// when the file cannot be opened logging is simply off.
fn init_logging(log_file: &Path) {
    if let Some(dir) = log_file.parent() {
        let _ = std::fs::create_dir_all(dir);
    }
    let file = match OpenOptions::new().create(true).append(true).open(log_file) {
        Ok(file) => file,
        Err(e) => {
            eprintln!("Logging disabled, cannot open {}: {e}", log_file.display());
            return;
        }
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .finish();
    let _ = tracing::subscriber::set_global_default(subscriber);
}

fn main() {
    let cli = Cli::parse();
    let command = cli.command.unwrap_or(Commands::Ui);

    // These never touch the todo file.
    if let Commands::Completions { shell } = command {
        cmd_completions(shell);
        return;
    }
    let data_file = cli.data_file.unwrap_or_else(default_data_path);
    if let Commands::Path = command {
        cmd_path(&data_file);
        return;
    }

    let log_file = cli.log_file.unwrap_or_else(|| default_log_path(&data_file));
    init_logging(&log_file);
    info!(data_file = %data_file.display(), "starting");

    let bridge = match LocalBridge::open(&data_file) {
        Ok(bridge) => bridge,
        Err(e) => {
            eprintln!("Failed to start storage: {e}");
            std::process::exit(1);
        }
    };
    let shell = bridge.shell();
    let mut manager = TaskManager::load(bridge);

    match command {
        Commands::Ui => cmd_ui(manager, shell),
        Commands::Add { text } => cmd_add(&mut manager, text),
        Commands::List { filter } => cmd_list(&mut manager, filter),
        Commands::Toggle { id } => cmd_toggle(&mut manager, id),
        Commands::Edit { id, text } => cmd_edit(&mut manager, id, text),
        Commands::Delete { id } => cmd_delete(&mut manager, id),
        Commands::ClearCompleted => cmd_clear_completed(&mut manager),
        Commands::ToggleAll => cmd_toggle_all(&mut manager),
        Commands::Path | Commands::Completions { .. } => unreachable!("handled above"),
    }
}

/// `todo-desk.log` beside the todo file.
fn default_log_path(data_file: &Path) -> PathBuf {
    data_file
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_default()
        .join("todo-desk.log")
}
