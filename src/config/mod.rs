//! Configuration parsing, overrides and validation.

pub mod env;
pub mod parser;
pub mod types;
pub mod validate;

use std::path::Path;

use tracing::warn;

use crate::common::error::ConfigError;

use parser::load_config;
pub use types::Config;

/// Load a config file, apply environment overrides and validate the result.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<Config, ConfigError> {
    let config = env::apply_env_overrides(load_config(path)?);
    for var in env::check_empty_env_vars(&config) {
        warn!("Environment variable {} is set but empty", var);
    }
    validate::validate_config(&config)?;
    Ok(config)
}
