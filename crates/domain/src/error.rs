//! Common error types used across the workspace.
//!
//! Each layer defines its own typed errors and converts into
//! [`BridgeError`] when crossing a port boundary.

/// Top-level error shared by every crate in the workspace.
#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    NotFound(#[from] NotFoundError),

    /// A serial line or controller failure.
    #[error("transport error")]
    Transport(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// The persistence collaborator failed to record a change.
    #[error("storage error")]
    Storage(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// The message bus client failed or went away.
    #[error("bus error")]
    Bus(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// A lookup by name found nothing.
#[derive(Debug, thiserror::Error)]
#[error("{entity} {id} not found")]
pub struct NotFoundError {
    /// What kind of thing was looked up (`"Device"`, `"Controller"`).
    pub entity: &'static str,
    /// The name that was looked up.
    pub id: String,
}

/// Input rejected by a domain invariant.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("name must not be empty")]
    EmptyName,

    #[error("unknown device kind: {0}")]
    UnknownKind(String),

    #[error("{kind} needs {expected} relays in its wiring, got {actual}")]
    WiringLength {
        kind: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("invalid relay address: {0}")]
    InvalidRelayAddress(String),

    #[error("relay {0} does not exist on any attached controller")]
    UnknownRelay(String),

    #[error("invalid command on {device}: {command}")]
    UnrecognizedCommand { device: String, command: String },

    #[error("cannot derive a device name from topic {0}")]
    InvalidTopic(String),
}
