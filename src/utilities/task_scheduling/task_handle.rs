//! Single-producer, single-consumer completion signal for work run on another thread.
//!
//! [`task_pair`] creates a [`TaskHandle`] for the submitter and a [`TaskCompletion`] for the
//! worker. The worker publishes exactly one value; the submitter polls with
//! [`TaskHandle::is_ready`], grabs it with [`TaskHandle::take`], or blocks in [`TaskHandle::wait`].

use crossbeam_utils::atomic::AtomicCell;
use crossbeam_utils::sync::{Parker, Unparker};
use std::sync::{Arc, Mutex, PoisonError};
use thiserror::Error;

/// Reasons a task cannot produce its value.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum TaskError {
    /// The worker dropped its completion without publishing a value, typically after a panic.
    #[error("task was abandoned before completing")]
    Abandoned,
    /// The value was already taken through this handle.
    #[error("task result was already taken")]
    AlreadyTaken,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TaskState {
    Pending,
    Ready,
    Abandoned,
}

struct TaskSlot<T> {
    state: AtomicCell<TaskState>,
    value: Mutex<Option<T>>,
}

/// Submitter side of a task.
pub struct TaskHandle<T> {
    slot: Arc<TaskSlot<T>>,
    parker: Parker,
}

/// Worker side of a task. Dropping it without calling [`TaskCompletion::complete`] marks the
/// task abandoned and wakes the waiter.
pub struct TaskCompletion<T> {
    slot: Arc<TaskSlot<T>>,
    unparker: Unparker,
    completed: bool,
}

/// Creates a connected handle/completion pair.
pub fn task_pair<T>() -> (TaskHandle<T>, TaskCompletion<T>) {
    let slot = Arc::new(TaskSlot {
        state: AtomicCell::new(TaskState::Pending),
        value: Mutex::new(None),
    });
    let parker = Parker::new();
    let unparker = parker.unparker().clone();
    (
        TaskHandle {
            slot: slot.clone(),
            parker,
        },
        TaskCompletion {
            slot,
            unparker,
            completed: false,
        },
    )
}

impl<T> TaskHandle<T> {
    /// Whether the worker has published its value. Does not block.
    #[inline]
    pub fn is_ready(&self) -> bool {
        self.slot.state.load() == TaskState::Ready
    }

    /// Takes the value if it has been published. Returns `None` while pending and after the
    /// value has been taken once.
    pub fn take(&mut self) -> Option<T> {
        if !self.is_ready() {
            return None;
        }
        self.slot
            .value
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }

    /// Blocks until the worker publishes, then returns the value.
    pub fn wait(mut self) -> Result<T, TaskError> {
        loop {
            match self.slot.state.load() {
                TaskState::Ready => return self.take().ok_or(TaskError::AlreadyTaken),
                TaskState::Abandoned => return Err(TaskError::Abandoned),
                TaskState::Pending => self.parker.park(),
            }
        }
    }
}

impl<T> TaskCompletion<T> {
    /// Publishes the value and wakes the waiting handle.
    pub fn complete(mut self, value: T) {
        *self
            .slot
            .value
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(value);
        self.completed = true;
        self.slot.state.store(TaskState::Ready);
        self.unparker.unpark();
    }
}

impl<T> Drop for TaskCompletion<T> {
    fn drop(&mut self) {
        if !self.completed {
            self.slot.state.store(TaskState::Abandoned);
            self.unparker.unpark();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_take_before_completion_is_none() {
        let (mut handle, completion) = task_pair::<u32>();
        assert!(!handle.is_ready());
        assert_eq!(handle.take(), None);
        completion.complete(5);
        assert!(handle.is_ready());
        assert_eq!(handle.take(), Some(5));
        assert_eq!(handle.take(), None);
    }

    #[test]
    fn test_wait_receives_value_from_other_thread() {
        let (handle, completion) = task_pair::<String>();
        let worker = thread::spawn(move || completion.complete("done".to_string()));
        assert_eq!(handle.wait().unwrap(), "done");
        worker.join().unwrap();
    }

    #[test]
    fn test_dropped_completion_abandons() {
        let (handle, completion) = task_pair::<u32>();
        drop(completion);
        assert_eq!(handle.wait(), Err(TaskError::Abandoned));
    }
}
