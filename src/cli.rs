use std::path::PathBuf;

use clap::Parser;

use crate::cmd::Commands;

/// File-backed to-do list with a terminal UI.
/// Storage defaults to the platform data directory, or a path passed via --data-file.
#[derive(Parser)]
#[command(name = "todo", version, about = "Desktop to-do list")]
pub struct Cli {
    /// Path to the JSON todo file.
    #[arg(long, global = true, env = "TODO_DESK_DATA")]
    pub data_file: Option<PathBuf>,

    /// Where diagnostics are written. The UI owns the terminal, so logs never go there.
    #[arg(long, global = true, env = "TODO_DESK_LOG")]
    pub log_file: Option<PathBuf>,

    /// Defaults to `ui`.
    #[command(subcommand)]
    pub command: Option<Commands>,
}
