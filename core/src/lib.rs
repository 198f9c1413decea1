pub mod combat_log;
pub mod context;
pub mod correlation;
pub mod filter;
pub mod index;
pub mod query;
pub mod session;
pub mod store;
pub mod sync;

#[cfg(test)]
mod test_support;

// Re-exports for convenience
pub use combat_log::*;
pub use context::{
    Attempt, AttemptInterval, ConfigError, InstanceMeta, Participant, ViewerConfig,
    ViewerConfigExt,
};
pub use correlation::{Attribution, Resolver};
pub use filter::{FilterState, FilteredView, ViewRow};
pub use index::DerivedIndex;
pub use query::{
    AbilityBreakdown, BreakdownQuery, BreakdownSource, HealMode, HitBreakdown, ability_breakdown,
};
pub use session::{
    ChangeBus, ChangedSubject, InstanceSession, KindWatch, SharedSession, Subscription,
};
pub use store::{EventStore, KindStore, StoreState};
pub use sync::{
    ExportSource, FetchError, HttpExportSource, LiveSync, SyncCommand, TickReport, ViewerHandle,
};
