//! Link and registry error types

use thiserror::Error;

/// Errors raised by a flight-controller link
#[derive(Debug, Clone, Error, PartialEq)]
pub enum LinkError {
    /// Link establishment failed
    #[error("Failed to connect to {descriptor}: {reason}")]
    Connect {
        /// Connection descriptor that was attempted
        descriptor: String,
        /// Underlying failure
        reason: String,
    },

    /// No connector understands the descriptor
    #[error("Unsupported connection descriptor: {0}")]
    UnsupportedDescriptor(String),

    /// The link was closed or the session dropped
    #[error("Link to {0} is disconnected")]
    Disconnected(String),

    /// The controller refused a flight-mode change
    #[error("Flight mode {mode} rejected: {reason}")]
    ModeRejected {
        /// Requested mode
        mode: String,
        /// Controller-provided reason
        reason: String,
    },

    /// A command was not accepted by the controller
    #[error("Command {command} failed: {reason}")]
    CommandFailed {
        /// Command name
        command: String,
        /// Controller-provided reason
        reason: String,
    },

    /// Telemetry could not be read
    #[error("Telemetry unavailable: {0}")]
    Telemetry(String),
}

impl LinkError {
    /// Whether the error means the session itself is gone
    pub fn is_disconnect(&self) -> bool {
        matches!(self, LinkError::Disconnected(_))
    }
}

/// Drone registry errors
#[derive(Debug, Clone, Error, PartialEq)]
pub enum RegistryError {
    /// No link is registered under the identifier
    #[error("Drone {0} is not registered")]
    NotRegistered(String),

    /// Link establishment failed; nothing was registered
    #[error(transparent)]
    Link(#[from] LinkError),
}
