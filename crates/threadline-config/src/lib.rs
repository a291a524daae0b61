//! `threadline.json5` model, validation and layered loading.

mod error;
mod loader;
mod model;

pub use error::ConfigError;
pub use loader::{ConfigLayer, ConfigLayerSource, LayeredConfig, LayeredConfigOptions};
pub use model::{
    CompletionConfig, MigrationConfig, TOOL_NAME_PLACEHOLDER, ThreadlineConfig,
    ThreadlineConfigBuilder,
};
