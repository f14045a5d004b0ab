//! Error types for the Case Control hardware library.

use thiserror::Error;

use crate::link::Tag;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur when talking to the controller.
#[derive(Error, Debug)]
pub enum Error {
    /// Serial device node does not exist.
    #[error("Controller not found at {0}")]
    PortNotFound(String),

    /// Serial port communication error.
    #[error("Serial port error: {0}")]
    Serial(#[from] tokio_serial::Error),

    /// Serial I/O error.
    #[error("Serial I/O error: {0}")]
    SerialIo(#[from] std::io::Error),

    /// No acknowledgement arrived in time.
    #[error("No ACK for {tag} packet within {timeout_ms}ms")]
    AckTimeout { tag: Tag, timeout_ms: u64 },

    /// The acknowledgement byte did not match the number of bytes sent.
    #[error("Bad ACK for {tag} packet: expected {expected}, got {actual}")]
    AckMismatch { tag: Tag, expected: u8, actual: u8 },

    /// Color string could not be parsed.
    #[error("Invalid color '{0}': expected R/G/B, #RRGGBB or a color name")]
    InvalidColor(String),
}

impl Error {
    /// Returns true if the link can no longer be used and must be reopened.
    pub fn is_link_lost(&self) -> bool {
        matches!(
            self,
            Error::PortNotFound(_) | Error::Serial(_) | Error::SerialIo(_)
        )
    }
}
