use super::*;
use rayon::prelude::*;
use serde_json::Value;


/// Events decoded from one export page, in page order.
#[derive(Debug, Default)]
pub struct ParsedPage {
    pub events: Vec<Event>,
    /// Records dropped as malformed or of the wrong kind
    pub skipped: usize,
}

/// Decode a single export record and check it belongs to `kind`.
pub fn parse_record(kind: EventKind, record: Value) -> Result<Event, DecodeError> {
    let event: Event = serde_json::from_value(record).map_err(DecodeError::Malformed)?;
    let actual = event.kind();
    if actual != kind {
        return Err(DecodeError::KindMismatch {
            id: event.id,
            expected: kind,
            actual,
        });
    }
    Ok(event)
}

/// Decode a page of records for `kind`.
///
/// One bad record must not cost the whole batch: failures are logged and
/// skipped, everything else is kept in page order.
pub fn parse_page(kind: EventKind, records: Vec<Value>) -> ParsedPage {
    let total = records.len();
    let events: Vec<Event> = records
        .into_par_iter()
        .enumerate()
        .filter_map(|(idx, record)| match parse_record(kind, record) {
            Ok(event) => Some(event),
            Err(err) => {
                tracing::warn!(%kind, index = idx, error = %err, "Skipping export record");
                None
            }
        })
        .collect();

    let skipped = total - events.len();
    ParsedPage { events, skipped }
}
