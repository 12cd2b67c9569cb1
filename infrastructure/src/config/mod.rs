//! Configuration loading

mod file_config;
mod loader;

pub use file_config::{
    ConfigValidationError, FileConfig, FileParticipantConfig, FileResumptionConfig,
    FileThreadConfig,
};
pub use loader::ConfigLoader;
