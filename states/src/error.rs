use thiserror::Error;

use crate::TaskId;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GateError {
    #[error("{name} is already in flight (task generation {})", .running.generation())]
    Busy {
        name: &'static str,
        running: TaskId,
    },
}

impl GateError {
    pub fn busy(name: &'static str, running: TaskId) -> Self {
        Self::Busy { name, running }
    }

    /// Name of the gate that rejected the entry.
    pub fn gate_name(&self) -> &'static str {
        match self {
            Self::Busy { name, .. } => name,
        }
    }
}
