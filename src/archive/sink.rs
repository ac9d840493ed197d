//! The Archival Sink seam.
//!
//! One best-effort `submit` per completed session. The sink owns any
//! retry/backoff policy it wants; the dispatcher never re-queues and
//! never blocks call teardown on archival success.

use thiserror::Error;

use super::record::IntakeRecord;

#[derive(Error, Debug)]
pub enum ArchiveError {
    #[error("Cannot reach the archive backend at {0}")]
    Connection(String),

    #[error("Archive request timed out after {0}s")]
    Timeout(u64),

    #[error("Archive backend error: {status} - {body}")]
    Api { status: u16, body: String },

    #[error("HTTP client error: {0}")]
    HttpClient(String),
}

/// Downstream storage for completed intake records.
pub trait ArchivalSink: Send + Sync {
    fn submit(&self, record: &IntakeRecord) -> Result<(), ArchiveError>;
}

/// Sink used when no archive backend is configured: accepts and drops
/// every record with a log line.
pub struct NullSink;

impl ArchivalSink for NullSink {
    fn submit(&self, record: &IntakeRecord) -> Result<(), ArchiveError> {
        tracing::info!(
            record = %record.record_id,
            "Archive backend not configured; record dropped"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Verify the trait is object-safe (used as `Box<dyn ArchivalSink>`)
    #[test]
    fn trait_is_object_safe() {
        fn _assert(_: &dyn ArchivalSink) {}
    }
}
