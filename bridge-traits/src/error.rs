//! Error type shared by every bridge trait. Host implementations map their
//! platform-native failures into the closest variant; the core treats all of
//! them as "the host store misbehaved" and degrades rather than aborting.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum BridgeError {
    /// Catch-all for host-side failures with no better variant. Implementors
    /// of the bridge traits on new platforms start here.
    #[error("Bridge operation failed: {0}")]
    OperationFailed(String),

    /// The backing database rejected or failed an operation.
    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, BridgeError>;
