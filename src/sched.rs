//! The contractual surface between the hook registry and the out-of-scope
//! scheduling subsystem: a keyed registry of task decorators that a
//! scheduler applies to every unit of deferred work it runs.

use parking_lot::Mutex;
use std::sync::{Arc, OnceLock};

/// A unit of deferred work handed to a scheduler.
pub type Task = Box<dyn FnOnce() + Send>;

/// A wrapping policy applied to every scheduled task.
pub type TaskDecorator = Arc<dyn Fn(Task) -> Task + Send + Sync>;

/// Keyed, insertion-ordered set of task decorators.
pub struct DecoratorRegistry {
    entries: Mutex<Vec<(String, TaskDecorator)>>,
}

impl DecoratorRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(Vec::new()),
        }
    }

    /// Add a decorator under `key` if that key is not already present.
    /// Returns whether it was added.
    pub fn add(&self, key: impl Into<String>, decorator: TaskDecorator) -> bool {
        let key = key.into();
        let mut entries = self.entries.lock();
        if entries.iter().any(|(k, _)| *k == key) {
            return false;
        }
        entries.push((key, decorator));
        true
    }

    /// Remove the decorator registered under `key`. Returns whether one was
    /// removed.
    pub fn remove(&self, key: &str) -> bool {
        let mut entries = self.entries.lock();
        let before = entries.len();
        entries.retain(|(k, _)| k != key);
        entries.len() != before
    }

    /// Whether a decorator is registered under `key`.
    pub fn contains(&self, key: &str) -> bool {
        self.entries.lock().iter().any(|(k, _)| k == key)
    }

    /// Registered keys in insertion order.
    pub fn keys(&self) -> Vec<String> {
        self.entries.lock().iter().map(|(k, _)| k.clone()).collect()
    }

    /// Apply every registered decorator to `task`, in registration order.
    pub fn decorate(&self, task: Task) -> Task {
        let decorators: Vec<TaskDecorator> = self
            .entries
            .lock()
            .iter()
            .map(|(_, d)| Arc::clone(d))
            .collect();
        decorators.into_iter().fold(task, |t, d| d(t))
    }
}

impl Default for DecoratorRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// The process-wide decorator registry schedulers consult.
pub fn global() -> &'static DecoratorRegistry {
    static REGISTRY: OnceLock<DecoratorRegistry> = OnceLock::new();
    REGISTRY.get_or_init(DecoratorRegistry::new)
}

/// Decorate a task with every process-wide policy, in registration order.
pub fn decorate(task: Task) -> Task {
    global().decorate(task)
}
