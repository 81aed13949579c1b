//! The capability surface between the view layer and everything else.
//!
//! The view never touches the filesystem or the host shell directly. It gets
//! exactly what `Bridge` offers: load the list, save the list, and subscribe
//! to the two menu commands the host shell can send.
//!
//! `LocalBridge` runs storage on one writer thread fed by a queue, so loads
//! and saves complete in the order they were issued and the last save wins.

use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};

use tracing::{debug, error, warn};

use crate::db::{StorageError, Store};
use crate::task::Task;

/// Named host-shell signals the view can listen for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    MenuNewTodo,
    MenuClearCompleted,
}

impl Channel {
    pub fn name(self) -> &'static str {
        match self {
            Channel::MenuNewTodo => "menu-new-todo",
            Channel::MenuClearCompleted => "menu-clear-completed",
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Callback for a host-shell signal. Signals carry no payload.
pub type Handler = Box<dyn Fn() + Send + Sync + 'static>;

/// A reply that resolves once the storage side has finished the request.
#[must_use = "a pending reply reports the outcome of the request"]
pub struct Pending<T> {
    rx: Receiver<Result<T, StorageError>>,
}

impl<T> Pending<T> {
    /// A reply that is already settled.
    pub fn ready(result: Result<T, StorageError>) -> Self {
        let (tx, rx) = mpsc::channel();
        let _ = tx.send(result);
        Pending { rx }
    }

    /// Block until the request has been handled.
    pub fn wait(self) -> Result<T, StorageError> {
        self.rx.recv().unwrap_or(Err(StorageError::Disconnected))
    }

    /// Take the outcome if it has arrived.
    pub fn try_take(&self) -> Option<Result<T, StorageError>> {
        match self.rx.try_recv() {
            Ok(result) => Some(result),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => Some(Err(StorageError::Disconnected)),
        }
    }
}

/// Everything the view layer may ask of the host.
pub trait Bridge {
    fn load_todos(&self) -> Pending<Vec<Task>>;
    fn save_todos(&self, todos: Vec<Task>) -> Pending<()>;
    fn on_menu_new_todo(&self, handler: Handler);
    fn on_menu_clear_completed(&self, handler: Handler);
    fn remove_all_listeners(&self, channel: Channel);
}

type Listeners = Arc<Mutex<HashMap<Channel, Vec<Arc<dyn Fn() + Send + Sync>>>>>;

/// Host side of the signal registry: emits menu commands to whatever the
/// view has subscribed.
#[derive(Clone, Default)]
pub struct HostShell {
    listeners: Listeners,
}

impl HostShell {
    /// Invoke every handler registered on `channel`, in registration order.
    /// Returns how many handlers ran.
    ///
    /// Handlers run with the registry unlocked, so they may subscribe or
    /// remove listeners themselves. Changes apply from the next emit.
    pub fn emit(&self, channel: Channel) -> usize {
        let handlers = {
            let listeners = match self.listeners.lock() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            listeners.get(&channel).cloned().unwrap_or_default()
        };
        debug!(%channel, handlers = handlers.len(), "host signal");
        for handler in &handlers {
            handler();
        }
        handlers.len()
    }

    fn register(&self, channel: Channel, handler: Handler) {
        let mut listeners = match self.listeners.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        listeners.entry(channel).or_default().push(Arc::from(handler));
    }

    fn clear(&self, channel: Channel) {
        let mut listeners = match self.listeners.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        listeners.remove(&channel);
    }
}

enum Job {
    Load(Sender<Result<Vec<Task>, StorageError>>),
    Save(Vec<Task>, Sender<Result<(), StorageError>>),
}

/// In-process bridge backed by a `Store` on a dedicated writer thread.
pub struct LocalBridge {
    jobs: Option<Sender<Job>>,
    writer: Option<JoinHandle<()>>,
    shell: HostShell,
}

impl LocalBridge {
    /// Start the writer thread for the document at `path`.
    pub fn open(path: &Path) -> std::io::Result<Self> {
        let store = Store::new(path);
        if let Err(e) = store.ensure_dir() {
            // Saves retry the directory; loads treat the file as absent.
            warn!(path = %path.display(), error = %e, "could not create data directory");
        }
        let (tx, rx) = mpsc::channel::<Job>();
        let writer = thread::Builder::new()
            .name("todo-writer".into())
            .spawn(move || run_writer(store, rx))?;
        Ok(LocalBridge {
            jobs: Some(tx),
            writer: Some(writer),
            shell: HostShell::default(),
        })
    }

    /// The emitting side of this bridge's signal registry.
    pub fn shell(&self) -> HostShell {
        self.shell.clone()
    }

    /// Queue `job` for the writer. False when the writer has stopped.
    fn submit(&self, job: Job) -> bool {
        let Some(jobs) = &self.jobs else { return false };
        if jobs.send(job).is_err() {
            error!("todo writer thread has stopped");
            return false;
        }
        true
    }
}

impl Bridge for LocalBridge {
    fn load_todos(&self) -> Pending<Vec<Task>> {
        let (tx, rx) = mpsc::channel();
        if !self.submit(Job::Load(tx)) {
            return Pending::ready(Err(StorageError::Disconnected));
        }
        Pending { rx }
    }

    fn save_todos(&self, todos: Vec<Task>) -> Pending<()> {
        let (tx, rx) = mpsc::channel();
        if !self.submit(Job::Save(todos, tx)) {
            return Pending::ready(Err(StorageError::Disconnected));
        }
        Pending { rx }
    }

    fn on_menu_new_todo(&self, handler: Handler) {
        self.shell.register(Channel::MenuNewTodo, handler);
    }

    fn on_menu_clear_completed(&self, handler: Handler) {
        self.shell.register(Channel::MenuClearCompleted, handler);
    }

    fn remove_all_listeners(&self, channel: Channel) {
        self.shell.clear(channel);
    }
}

impl Drop for LocalBridge {
    fn drop(&mut self) {
        // Closing the queue lets the writer drain what is left and exit.
        self.jobs.take();
        if let Some(writer) = self.writer.take() {
            if writer.join().is_err() {
                error!("todo writer thread panicked");
            }
        }
    }
}

fn run_writer(store: Store, jobs: Receiver<Job>) {
    for job in jobs {
        match job {
            Job::Load(reply) => {
                let _ = reply.send(Ok(store.load()));
            }
            Job::Save(todos, reply) => {
                let result = store.save(&todos);
                if let Err(e) = &result {
                    error!(error = %e, "failed to save todos");
                }
                let _ = reply.send(result);
            }
        }
    }
    debug!("todo writer stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use chrono::Utc;

    fn task(id: u64, text: &str) -> Task {
        Task::new(id, text.into(), Utc::now())
    }

    #[test]
    fn load_and_save_pass_through_to_storage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data").join("todos.json");
        let bridge = LocalBridge::open(&path).unwrap();

        assert!(bridge.load_todos().wait().unwrap().is_empty());
        let list = vec![task(1, "a")];
        bridge.save_todos(list.clone()).wait().unwrap();
        assert_eq!(bridge.load_todos().wait().unwrap(), list);
        assert_eq!(Store::new(&path).load(), list);
    }

    #[test]
    fn rapid_saves_land_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("todos.json");
        let bridge = LocalBridge::open(&path).unwrap();

        let mut replies = Vec::new();
        let mut list = Vec::new();
        for id in 1..=25 {
            list.insert(0, task(id, &format!("task {id}")));
            replies.push(bridge.save_todos(list.clone()));
        }
        for reply in replies {
            reply.wait().unwrap();
        }
        assert_eq!(Store::new(&path).load(), list);
    }

    #[test]
    fn dropping_the_bridge_flushes_queued_saves() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("todos.json");
        let list = vec![task(7, "late")];
        {
            let bridge = LocalBridge::open(&path).unwrap();
            let _ = bridge.save_todos(list.clone());
        }
        assert_eq!(Store::new(&path).load(), list);
    }

    #[test]
    fn save_failure_is_reported_to_the_caller() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, "").unwrap();
        let bridge = LocalBridge::open(&blocker.join("todos.json")).unwrap();
        assert!(bridge.save_todos(vec![task(1, "a")]).wait().is_err());
    }

    #[test]
    fn every_handler_on_a_channel_fires() {
        let dir = tempfile::tempdir().unwrap();
        let bridge = LocalBridge::open(&dir.path().join("todos.json")).unwrap();
        let shell = bridge.shell();
        let hits = Arc::new(AtomicUsize::new(0));

        for _ in 0..2 {
            let hits = hits.clone();
            bridge.on_menu_new_todo(Box::new(move || {
                hits.fetch_add(1, Ordering::SeqCst);
            }));
        }
        assert_eq!(shell.emit(Channel::MenuNewTodo), 2);
        assert_eq!(hits.load(Ordering::SeqCst), 2);
        assert_eq!(shell.emit(Channel::MenuClearCompleted), 0);
    }

    #[test]
    fn remove_all_listeners_clears_only_that_channel() {
        let dir = tempfile::tempdir().unwrap();
        let bridge = LocalBridge::open(&dir.path().join("todos.json")).unwrap();
        let shell = bridge.shell();
        bridge.on_menu_new_todo(Box::new(|| {}));
        bridge.on_menu_clear_completed(Box::new(|| {}));

        bridge.remove_all_listeners(Channel::MenuNewTodo);
        assert_eq!(shell.emit(Channel::MenuNewTodo), 0);
        assert_eq!(shell.emit(Channel::MenuClearCompleted), 1);
    }

    #[test]
    fn handler_can_remove_its_own_channel() {
        let dir = tempfile::tempdir().unwrap();
        let bridge = Arc::new(LocalBridge::open(&dir.path().join("todos.json")).unwrap());
        let shell = bridge.shell();
        let hits = Arc::new(AtomicUsize::new(0));
        {
            let weak = Arc::downgrade(&bridge);
            let hits = hits.clone();
            bridge.on_menu_new_todo(Box::new(move || {
                hits.fetch_add(1, Ordering::SeqCst);
                if let Some(bridge) = weak.upgrade() {
                    bridge.remove_all_listeners(Channel::MenuNewTodo);
                }
            }));
        }

        let (done_tx, done_rx) = mpsc::channel();
        let emitter = shell.clone();
        thread::spawn(move || {
            let _ = done_tx.send(emitter.emit(Channel::MenuNewTodo));
        });
        let ran = done_rx
            .recv_timeout(std::time::Duration::from_secs(2))
            .expect("emit returned");
        assert_eq!(ran, 1);
        assert_eq!(shell.emit(Channel::MenuNewTodo), 0);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn handler_can_subscribe_during_emit() {
        let shell = HostShell::default();
        let inner = shell.clone();
        shell.register(
            Channel::MenuClearCompleted,
            Box::new(move || inner.register(Channel::MenuClearCompleted, Box::new(|| {}))),
        );
        assert_eq!(shell.emit(Channel::MenuClearCompleted), 1);
        assert_eq!(shell.emit(Channel::MenuClearCompleted), 2);
        shell.clear(Channel::MenuClearCompleted);
    }

    #[test]
    fn pending_ready_resolves_immediately() {
        let pending: Pending<()> = Pending::ready(Err(StorageError::Disconnected));
        assert!(matches!(pending.try_take(), Some(Err(StorageError::Disconnected))));
    }

    #[test]
    fn channel_names_match_wire_names() {
        assert_eq!(Channel::MenuNewTodo.to_string(), "menu-new-todo");
        assert_eq!(Channel::MenuClearCompleted.name(), "menu-clear-completed");
    }
}
