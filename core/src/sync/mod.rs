//! Live synchronisation with the export service

mod error;
mod http;
mod poller;
mod source;

#[cfg(test)]
mod poller_tests;

pub use error::FetchError;
pub use http::HttpExportSource;
pub use poller::{LiveSync, SyncCommand, TickReport, ViewerHandle};
pub use source::ExportSource;
