mod background_tasks;
mod config;
mod error;
mod instance;
mod interner;

pub use background_tasks::SyncTasks;
pub use config::{DEFAULT_POLL_INTERVAL_SECS, ViewerConfig, ViewerConfigExt};
pub use error::ConfigError;
pub use instance::{
    Attempt, AttemptInterval, InstanceMeta, Participant, in_any_interval, total_duration,
};
pub use interner::{IStr, deserialize_istr, empty_istr, intern, interner, resolve};
