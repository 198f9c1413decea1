//! Error types for export page decoding

use thiserror::Error;

use super::{EventId, EventKind};

/// Errors while decoding a single record of an export page.
///
/// These never abort a page: the record is skipped and the rest of the batch
/// is kept.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("malformed event record")]
    Malformed(#[source] serde_json::Error),

    #[error("event {id} has kind {actual}, expected {expected}")]
    KindMismatch {
        id: EventId,
        expected: EventKind,
        actual: EventKind,
    },
}
