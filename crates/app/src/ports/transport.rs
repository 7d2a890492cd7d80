//! Transport port — a synchronous request/response exchange on one
//! UDIN serial line.

use udin2mqtt_domain::protocol::Request;

/// Failure of a single exchange. Never retried at this layer.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("write of request {request} failed")]
    Write {
        request: String,
        #[source]
        source: std::io::Error,
    },

    #[error("read of response to {request} failed")]
    Read {
        request: String,
        #[source]
        source: std::io::Error,
    },
}

/// One owned serial line to a UDIN board.
///
/// # Exchange contract
///
/// `send` writes the request followed by `\r` and then reads in two phases:
///
/// 1. always exactly one echo line, terminated by `\n`;
/// 2. only when [`Request::expects_model_line`] holds, one more line with the
///    model string.
///
/// The returned line is the echo for ordinary requests and the model line
/// for [`Request::Identify`], with the trailing `\r\n` stripped. Each call
/// consumes its own framing completely; no partial line is carried over.
/// There is no timeout: a wedged line blocks the caller.
pub trait LineTransport: Send {
    /// Identifier of the endpoint, from which the controller name is derived.
    fn identifier(&self) -> &str;

    /// Perform one exchange.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Write`] or [`TransportError::Read`] when the
    /// line fails.
    fn send(&mut self, request: Request) -> Result<String, TransportError>;
}

impl<T: LineTransport + ?Sized> LineTransport for Box<T> {
    fn identifier(&self) -> &str {
        (**self).identifier()
    }

    fn send(&mut self, request: Request) -> Result<String, TransportError> {
        (**self).send(request)
    }
}
