use std::collections::HashMap;
use std::future::Future;

use parking_lot::Mutex;
use tokio::task::JoinHandle;

use crate::model::Id;

/// Fire-and-forget background work, tracked by the id of the entity it
/// belongs to so completion can still be awaited when needed.
#[derive(Default)]
pub struct BackgroundTasks {
    handles: Mutex<HashMap<Id, JoinHandle<()>>>,
}

impl BackgroundTasks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn spawn<F>(&self, id: Id, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let handle = tokio::spawn(task);
        let mut handles = self.handles.lock();
        handles.retain(|_, handle| !handle.is_finished());
        handles.insert(id, handle);
    }

    /// Wait for the task tracked under `id`, if any
    pub async fn wait(&self, id: &str) {
        let handle = self.handles.lock().remove(id);
        if let Some(handle) = handle {
            if let Err(err) = handle.await {
                log::error!("Background task for {} did not complete: {}", id, err);
            }
        }
    }

    /// Stop tracking a task; it keeps running detached
    pub fn forget(&self, id: &str) {
        self.handles.lock().remove(id);
    }

    pub fn is_tracking(&self, id: &str) -> bool {
        self.handles.lock().contains_key(id)
    }
}
