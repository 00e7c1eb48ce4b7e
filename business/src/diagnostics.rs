//! Where operation outcomes are reported.

use std::fmt::Debug;

use log::{info, warn};

use crate::error::{ClientError, FailureKind};
use crate::protocol::Operation;

/// Receives every failure the client catches at its boundary.
pub trait Diagnostics: Send + Sync + Debug {
    fn failed(&self, operation: Operation, error: &ClientError);

    fn succeeded(&self, _operation: Operation) {}
}

/// Reports through the `log` facade.
#[derive(Debug, Default)]
pub struct LogDiagnostics;

impl Diagnostics for LogDiagnostics {
    fn failed(&self, operation: Operation, error: &ClientError) {
        match error.kind() {
            FailureKind::Validation | FailureKind::Busy | FailureKind::Cancelled => {
                info!(target: "blobdrop::client", "{operation} not completed: {error}");
            }
            kind => {
                warn!(target: "blobdrop::client", "{operation} failed ({kind}): {error}");
            }
        }
    }

    fn succeeded(&self, operation: Operation) {
        info!(target: "blobdrop::client", "{operation} succeeded");
    }
}
