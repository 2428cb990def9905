pub mod config;
pub mod state;

pub use config::{BackendConfig, ConfigError};
pub use state::{Module, OutputState, ResourceState, StateError, parse_state};
