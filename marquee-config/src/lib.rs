//! Hierarchical configuration loading for the marquee service binaries.
//!
//! Configuration is assembled from `configuration/base.(yaml|yml|json)`, an
//! environment-specific overlay selected by `APP_ENVIRONMENT`, and `APP_`-prefixed
//! environment variable overrides.

mod environment;
mod load;
pub mod shared;

pub use environment::Environment;
pub use load::{Config, LoadConfigError, load_config};
