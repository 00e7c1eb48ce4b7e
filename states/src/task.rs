//! Task identity and cooperative cancellation.
//!
//! Every time a [`BusyGate`](crate::BusyGate) admits an operation it mints a
//! [`TaskHandle`]. The handle pairs a [`TaskId`] (gate name plus a generation
//! counter) with a `CancellationToken` from `tokio_util`, so a caller can abort
//! the running operation and logs can tell consecutive runs apart.
//!
//! ```ignore
//! let handle = TaskHandle::new(TaskId::new("store", 1), CancellationToken::new());
//! let token = handle.cancellation_token();
//!
//! tokio::select! {
//!     _ = token.cancelled() => { /* aborted */ }
//!     result = do_async_work() => { /* finished */ }
//! }
//! ```

use chrono::{DateTime, TimeDelta, Utc};
use tokio_util::sync::CancellationToken;

/// Identifier of one admitted run of a gated operation.
///
/// Generations increase monotonically per gate, so a higher generation always
/// denotes a more recent run of the same operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TaskId {
    name: &'static str,
    generation: u64,
}

impl TaskId {
    pub fn new(name: &'static str, generation: u64) -> Self {
        Self { name, generation }
    }

    /// Name of the gate that admitted the task.
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }
}

/// Handle to an in-flight operation.
///
/// Cancellation is cooperative: [`cancel`](Self::cancel) only signals the
/// token, the operation must observe `cancelled()` to stop.
#[derive(Debug, Clone)]
pub struct TaskHandle {
    id: TaskId,
    cancel_token: CancellationToken,
    started_at: DateTime<Utc>,
}

impl TaskHandle {
    pub fn new(id: TaskId, cancel_token: CancellationToken) -> Self {
        Self {
            id,
            cancel_token,
            started_at: Utc::now(),
        }
    }

    pub fn id(&self) -> TaskId {
        self.id
    }

    /// Returns a clone of the cancellation token.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel_token.clone()
    }

    pub fn cancel(&self) {
        self.cancel_token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel_token.is_cancelled()
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Time spent since the task was admitted.
    pub fn elapsed(&self) -> TimeDelta {
        Utc::now().signed_duration_since(self.started_at)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn task_id_accessors() {
        let id = TaskId::new("store", 42);
        assert_eq!(id.name(), "store");
        assert_eq!(id.generation(), 42);
    }

    #[test]
    fn task_id_equality() {
        let id1 = TaskId::new("store", 1);
        let id2 = TaskId::new("store", 1);
        let id3 = TaskId::new("store", 2);
        let id4 = TaskId::new("retrieve", 1);

        assert_eq!(id1, id2);
        assert_ne!(id1, id3);
        assert_ne!(id1, id4);
    }

    #[test]
    fn task_handle_cancel_is_shared_between_clones() {
        let handle1 = TaskHandle::new(TaskId::new("store", 1), CancellationToken::new());
        let handle2 = handle1.clone();
        let token = handle1.cancellation_token();

        assert!(!handle2.is_cancelled());
        handle1.cancel();

        assert!(handle2.is_cancelled());
        assert!(token.is_cancelled());
    }

    #[test]
    fn task_handle_elapsed_is_not_negative() {
        let handle = TaskHandle::new(TaskId::new("retrieve", 3), CancellationToken::new());
        assert!(handle.elapsed() >= TimeDelta::zero());
        assert!(handle.started_at() <= Utc::now());
    }
}
