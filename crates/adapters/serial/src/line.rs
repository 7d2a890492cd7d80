//! Line transport over any byte stream.

use std::io::{self, BufRead, BufReader, Read, Write};

use udin2mqtt_app::ports::{LineTransport, TransportError};
use udin2mqtt_domain::protocol::{Request, strip_line_ending};

/// A UDIN serial line: requests are written raw, responses are read as
/// `\n`-terminated lines.
#[derive(Debug)]
pub struct UdinLine<P> {
    identifier: String,
    port: BufReader<P>,
}

impl<P: Read + Write> UdinLine<P> {
    pub fn new(identifier: impl Into<String>, port: P) -> Self {
        Self {
            identifier: identifier.into(),
            port: BufReader::new(port),
        }
    }

    fn write_request(&mut self, request: Request) -> io::Result<()> {
        let port = self.port.get_mut();
        port.write_all(request.to_line().as_bytes())?;
        port.flush()
    }

    /// Read one line, waiting through read timeouts.
    fn read_line(&mut self) -> io::Result<String> {
        let mut buf = Vec::new();
        loop {
            match self.port.read_until(b'\n', &mut buf) {
                Ok(0) => return Err(io::ErrorKind::UnexpectedEof.into()),
                Ok(_) if buf.ends_with(b"\n") => break,
                Ok(_) => {}
                Err(err)
                    if matches!(
                        err.kind(),
                        io::ErrorKind::TimedOut | io::ErrorKind::Interrupted
                    ) => {}
                Err(err) => return Err(err),
            }
        }
        let line = String::from_utf8_lossy(&buf);
        Ok(strip_line_ending(&line).to_string())
    }
}

impl<P: Read + Write + Send> LineTransport for UdinLine<P> {
    fn identifier(&self) -> &str {
        &self.identifier
    }

    fn send(&mut self, request: Request) -> Result<String, TransportError> {
        let read_error = |source| TransportError::Read {
            request: request.to_string(),
            source,
        };

        self.write_request(request)
            .map_err(|source| TransportError::Write {
                request: request.to_string(),
                source,
            })?;
        let echo = self.read_line().map_err(read_error)?;
        tracing::trace!(endpoint = %self.identifier, %request, %echo, "read echo");
        if !request.expects_model_line() {
            return Ok(echo);
        }

        let model = self.read_line().map_err(read_error)?;
        tracing::trace!(endpoint = %self.identifier, %model, "read model");
        Ok(model)
    }
}
