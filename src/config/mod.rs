pub mod load;
pub mod processing;
pub mod save;
pub mod types;

pub use processing::{ProcessingConfig, Roi};
pub use types::{
    BatchSettings, Config, DetectorSettings, Language, MAX_RECENT_PATHS, ProcessingSettings,
    UserSettings,
};
