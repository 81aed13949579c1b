//! Enumerations for TUI state management.

/// Which part of the screen has the keyboard.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum AppState {
    TaskList,
    NewTask,
    EditTask,
    Help,
}

/// Host-shell menu commands, queued by the bridge handlers and applied on
/// the next tick of the event loop.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ShellCommand {
    FocusNewTask,
    ClearCompleted,
}
