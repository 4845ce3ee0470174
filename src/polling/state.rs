//! Poller-owned state and its update rules

use crate::snapshot::{ConnectionStatus, FragmentKind, FragmentValue, Snapshot};
use crate::transport::TransportError;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Snapshot plus connectivity, as seen by readers
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct SyncState {
    pub snapshot: Snapshot,
    pub status: ConnectionStatus,
}

impl SyncState {
    /// Apply the outcome of one poll.
    pub fn apply(
        &mut self,
        kind: FragmentKind,
        outcome: Result<FragmentValue, TransportError>,
        at: DateTime<Utc>,
    ) {
        match outcome {
            Ok(value) if value.kind() == kind => {
                self.snapshot.record_success(value, at);
                self.status = self.status.on_success();
            }
            Ok(value) => {
                // A parser returned the wrong variant; treat it like any other
                // contract violation.
                let error = TransportError::malformed(format!(
                    "Expected {kind} payload, got {}",
                    value.kind()
                ));
                self.record_failure(kind, &error, at);
            }
            Err(error) => self.record_failure(kind, &error, at),
        }
    }

    fn record_failure(&mut self, kind: FragmentKind, error: &TransportError, at: DateTime<Utc>) {
        self.snapshot.record_failure(kind, error, at);
        self.status = self.status.on_failure();
    }
}
