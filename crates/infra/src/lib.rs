//! Infrastructure layer: configuration, engine wiring, external model
//! backends.

pub mod ai;
pub mod config;

pub use ai::build_engine;
pub use config::{ConfigError, load as load_config};
