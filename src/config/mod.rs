pub mod error;
pub mod load_config;
pub mod settings;

pub use error::ConfigError;
pub use load_config::{JobClassConfig, LoadConfig};
pub use settings::{JobSettings, TaskSelection};
