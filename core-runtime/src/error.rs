//! Runtime-level errors: configuration validation and missing host
//! capabilities. Resolution-level failures live in `core-resolver`.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// A configuration value failed validation.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A required host capability was not wired into the config.
    #[error("Capability missing: {capability} - {message}")]
    CapabilityMissing { capability: String, message: String },
}

pub type Result<T> = std::result::Result<T, Error>;
