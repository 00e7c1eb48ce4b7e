//! Busy gates for single-flight operations.
//!
//! A gate is either idle or holds the [`TaskHandle`] of the one operation it
//! admitted. Entering returns a [`GateGuard`]; dropping the guard clears the
//! gate whether the operation succeeded, failed or was cancelled.

use std::sync::{
    Arc, Mutex, MutexGuard, PoisonError,
    atomic::{AtomicU64, Ordering},
};

use log::{debug, trace};
use tokio_util::sync::CancellationToken;

use crate::{GateError, TaskHandle, TaskId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GateStatus {
    #[default]
    Idle,
    InFlight(TaskId),
}

impl GateStatus {
    pub fn is_in_flight(&self) -> bool {
        matches!(self, Self::InFlight(_))
    }
}

#[derive(Debug)]
pub struct BusyGate {
    name: &'static str,
    slot: Arc<Mutex<Option<TaskHandle>>>,
    generation: AtomicU64,
}

impl BusyGate {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            slot: Arc::new(Mutex::new(None)),
            generation: AtomicU64::new(0),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Admits a new operation, or rejects it if one is already in flight.
    pub fn try_enter(&self) -> Result<GateGuard, GateError> {
        let mut slot = lock(&self.slot);
        if let Some(running) = slot.as_ref() {
            debug!(
                target: "blobdrop_states::gate",
                "gate={} rejected, generation {} still in flight",
                self.name,
                running.id().generation()
            );
            return Err(GateError::busy(self.name, running.id()));
        }

        let generation = self.generation.fetch_add(1, Ordering::Relaxed) + 1;
        let handle = TaskHandle::new(TaskId::new(self.name, generation), CancellationToken::new());
        *slot = Some(handle.clone());

        trace!(
            target: "blobdrop_states::gate",
            "gate={} entered generation={}",
            self.name,
            generation
        );

        Ok(GateGuard {
            slot: Arc::clone(&self.slot),
            handle,
        })
    }

    pub fn status(&self) -> GateStatus {
        match lock(&self.slot).as_ref() {
            Some(handle) => GateStatus::InFlight(handle.id()),
            None => GateStatus::Idle,
        }
    }

    pub fn is_busy(&self) -> bool {
        self.status().is_in_flight()
    }

    /// Signals cancellation to the in-flight operation, if any.
    ///
    /// Returns `true` when there was an operation to cancel. The gate stays
    /// busy until that operation drops its guard.
    pub fn cancel(&self) -> bool {
        match lock(&self.slot).as_ref() {
            Some(handle) => {
                debug!(
                    target: "blobdrop_states::gate",
                    "gate={} cancelling generation={}",
                    self.name,
                    handle.id().generation()
                );
                handle.cancel();
                true
            }
            None => false,
        }
    }
}

/// Returns `true` if any of the given gates has an operation in flight.
pub fn any_busy(gates: &[&BusyGate]) -> bool {
    gates.iter().any(|gate| gate.is_busy())
}

/// Proof of admission through a [`BusyGate`]. Clears the gate on drop.
#[derive(Debug)]
pub struct GateGuard {
    slot: Arc<Mutex<Option<TaskHandle>>>,
    handle: TaskHandle,
}

impl GateGuard {
    pub fn handle(&self) -> &TaskHandle {
        &self.handle
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.handle.cancellation_token()
    }
}

impl Drop for GateGuard {
    fn drop(&mut self) {
        let mut slot = lock(&self.slot);
        let owns_slot = slot
            .as_ref()
            .is_some_and(|running| running.id() == self.handle.id());
        if owns_slot {
            *slot = None;
        }

        trace!(
            target: "blobdrop_states::gate",
            "gate={} released generation={} after {}ms",
            self.handle.id().name(),
            self.handle.id().generation(),
            self.handle.elapsed().num_milliseconds()
        );
    }
}

// A panic while holding the lock cannot leave the slot half-written.
fn lock(slot: &Mutex<Option<TaskHandle>>) -> MutexGuard<'_, Option<TaskHandle>> {
    slot.lock().unwrap_or_else(PoisonError::into_inner)
}
