//! Storage gateway for the task list.
//!
//! The whole list lives in one pretty-printed JSON document. Reads never fail:
//! a missing, unreadable or corrupt document reads as an empty list. Writes go
//! through a temp file and a rename so a reader never observes a half-written
//! document.

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, warn};

use crate::task::Task;

/// File name of the persisted list inside the data directory.
pub const DATA_FILE_NAME: &str = "todos.json";

/// Errors surfaced by `Store::save` and the bridge in front of it.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("failed to write {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to serialize todos: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("storage writer is no longer running")]
    Disconnected,
}

/// Reads and writes the task list document at a fixed path.
#[derive(Debug, Clone)]
pub struct Store {
    path: PathBuf,
}

impl Store {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Store { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Create the containing directory if it does not exist yet.
    pub fn ensure_dir(&self) -> io::Result<()> {
        match self.path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() && !dir.exists() => {
                debug!(dir = %dir.display(), "creating data directory");
                fs::create_dir_all(dir)
            }
            _ => Ok(()),
        }
    }

    /// Load the persisted list, or an empty one if there is nothing usable on disk.
    pub fn load(&self) -> Vec<Task> {
        let buf = match fs::read_to_string(&self.path) {
            Ok(buf) => buf,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "no todo file yet, starting empty");
                return Vec::new();
            }
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "error reading todo file, starting empty");
                return Vec::new();
            }
        };
        match serde_json::from_str(&buf) {
            Ok(tasks) => tasks,
            Err(e) => {
                let keep = self.corrupt_copy_path();
                match fs::write(&keep, &buf) {
                    Ok(()) => warn!(
                        path = %self.path.display(),
                        kept = %keep.display(),
                        error = %e,
                        "error parsing todo file, starting empty"
                    ),
                    Err(copy_err) => warn!(
                        path = %self.path.display(),
                        error = %e,
                        copy_error = %copy_err,
                        "error parsing todo file, starting empty; could not keep a copy"
                    ),
                }
                Vec::new()
            }
        }
    }

    /// Overwrite the persisted list with `tasks`.
    pub fn save(&self, tasks: &[Task]) -> Result<(), StorageError> {
        let data = serde_json::to_string_pretty(tasks)?;
        self.ensure_dir().map_err(|source| self.io_error(source))?;

        let tmp = self.temp_path();
        let write = || -> io::Result<()> {
            let mut f = File::create(&tmp)?;
            f.write_all(data.as_bytes())?;
            f.flush()?;
            f.sync_all()?;
            fs::rename(&tmp, &self.path)
        };
        if let Err(source) = write() {
            let _ = fs::remove_file(&tmp);
            return Err(self.io_error(source));
        }
        debug!(path = %self.path.display(), count = tasks.len(), "saved todos");
        Ok(())
    }

    /// Where an unparseable document is copied before it can be overwritten.
    pub fn corrupt_copy_path(&self) -> PathBuf {
        self.sibling("corrupt")
    }

    fn temp_path(&self) -> PathBuf {
        self.sibling("tmp")
    }

    fn sibling(&self, suffix: &str) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| DATA_FILE_NAME.into());
        name.push(".");
        name.push(suffix);
        self.path.with_file_name(name)
    }

    fn io_error(&self, source: io::Error) -> StorageError {
        StorageError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

/// Platform default for the todo document: `<data dir>/todo-desk/todos.json`,
/// or `./data/todos.json` where the platform has no data directory.
pub fn default_data_path() -> PathBuf {
    dirs::data_dir()
        .map(|d| d.join("todo-desk"))
        .unwrap_or_else(|| PathBuf::from("data"))
        .join(DATA_FILE_NAME)
}

/// Truncate a string to a maximum width, adding ellipsis if needed.
pub fn truncate(s: &str, width: usize) -> String {
    if s.chars().count() <= width {
        s.to_string()
    } else {
        let mut out = String::new();
        for (i, ch) in s.chars().enumerate() {
            if i + 1 >= width {
                out.push('…');
                break;
            }
            out.push(ch);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn sample() -> Vec<Task> {
        let at = Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();
        let mut done = Task::new(2, "walk dog".into(), at);
        done.completed = true;
        vec![done, Task::new(1, "buy milk".into(), at)]
    }

    #[test]
    fn missing_file_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::new(dir.path().join("todos.json"));
        assert!(store.load().is_empty());
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::new(dir.path().join("todos.json"));
        let tasks = sample();
        store.save(&tasks).unwrap();
        assert_eq!(store.load(), tasks);
        // A second load without a save in between sees the same list.
        assert_eq!(store.load(), tasks);
    }

    #[test]
    fn save_creates_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::new(dir.path().join("nested").join("data").join("todos.json"));
        store.save(&sample()).unwrap();
        assert!(store.path().exists());
        assert!(!store.temp_path().exists());
    }

    #[test]
    fn save_writes_pretty_json_array() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::new(dir.path().join("todos.json"));
        store.save(&sample()).unwrap();
        let raw = fs::read_to_string(store.path()).unwrap();
        assert!(raw.starts_with("[\n"));
        assert!(raw.contains("\"createdAt\": \"2024-01-02T03:04:05.000Z\""));
    }

    #[test]
    fn corrupt_file_loads_empty_and_keeps_a_copy() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::new(dir.path().join("todos.json"));
        fs::write(store.path(), "{ not json").unwrap();

        assert!(store.load().is_empty());
        assert!(store.load().is_empty());
        let kept = fs::read_to_string(store.corrupt_copy_path()).unwrap();
        assert_eq!(kept, "{ not json");
    }

    #[test]
    fn wrong_shape_is_treated_as_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::new(dir.path().join("todos.json"));
        fs::write(store.path(), r#"{"tasks": []}"#).unwrap();
        assert!(store.load().is_empty());
    }

    #[test]
    fn save_into_unwritable_location_reports_error() {
        let dir = tempfile::tempdir().unwrap();
        // A regular file where the parent directory should be.
        let blocker = dir.path().join("blocker");
        fs::write(&blocker, "").unwrap();
        let store = Store::new(blocker.join("todos.json"));
        let err = store.save(&sample()).unwrap_err();
        assert!(matches!(err, StorageError::Io { .. }));
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("a longer line", 6), "a lon…");
    }
}
