//! Runtime primitives shared by the blobdrop client.
//!
//! Operations in the client are gated so that at most one instance of each
//! operation is in flight. A [`BusyGate`] tracks that state and hands out a
//! [`GateGuard`] which clears it on drop, together with a [`TaskHandle`] whose
//! cancellation token lets the caller abort the running operation.

mod error;
mod gate;
mod task;

pub use error::GateError;
pub use gate::{BusyGate, GateGuard, GateStatus, any_busy};
pub use task::{TaskHandle, TaskId};
