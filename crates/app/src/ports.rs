//! Port definitions — traits and message types shared with adapters.
//!
//! Ports are the boundaries between the application core and the outside world.
//! They are defined here (in `app`) so that both the use-case layer and the
//! adapter layer can depend on them without creating circular dependencies.

pub mod bus;
pub mod store;
pub mod transport;

pub use bus::{InboundMessage, OutboundMessage};
pub use store::DeviceStore;
pub use transport::{LineTransport, TransportError};
