use std::future::Future;
use std::sync::Arc;

use crate::combat_log::{Event, EventId, EventKind};
use crate::context::{Attempt, InstanceMeta, Participant};

use super::FetchError;

/// Where instance data comes from.
///
/// `fetch_events` returns events of `kind` with ids above `since`, in ascending
/// id order. An empty page means nothing new.
pub trait ExportSource: Send + Sync + 'static {
    fn fetch_events(
        &self,
        instance_id: u64,
        kind: EventKind,
        since: EventId,
    ) -> impl Future<Output = Result<Vec<Event>, FetchError>> + Send;

    fn fetch_meta(
        &self,
        instance_id: u64,
    ) -> impl Future<Output = Result<InstanceMeta, FetchError>> + Send;

    fn fetch_participants(
        &self,
        instance_id: u64,
    ) -> impl Future<Output = Result<Vec<Participant>, FetchError>> + Send;

    fn fetch_attempts(
        &self,
        instance_id: u64,
    ) -> impl Future<Output = Result<Vec<Attempt>, FetchError>> + Send;
}

impl<S: ExportSource> ExportSource for Arc<S> {
    fn fetch_events(
        &self,
        instance_id: u64,
        kind: EventKind,
        since: EventId,
    ) -> impl Future<Output = Result<Vec<Event>, FetchError>> + Send {
        (**self).fetch_events(instance_id, kind, since)
    }

    fn fetch_meta(
        &self,
        instance_id: u64,
    ) -> impl Future<Output = Result<InstanceMeta, FetchError>> + Send {
        (**self).fetch_meta(instance_id)
    }

    fn fetch_participants(
        &self,
        instance_id: u64,
    ) -> impl Future<Output = Result<Vec<Participant>, FetchError>> + Send {
        (**self).fetch_participants(instance_id)
    }

    fn fetch_attempts(
        &self,
        instance_id: u64,
    ) -> impl Future<Output = Result<Vec<Attempt>, FetchError>> + Send {
        (**self).fetch_attempts(instance_id)
    }
}
