//! Errors raised while interpreting protocol values.

use thiserror::Error;

/// Protocol-level errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProtocolError {
    #[error("Invalid interval '{0}': expected a non-negative number of seconds")]
    InvalidInterval(String),
    #[error("Unrecognized payload: {0:?}")]
    UnrecognizedPayload(Vec<u8>),
}
