//! UDIN line protocol requests.
//!
//! Each request is a short ASCII token. On the wire it is terminated with a
//! carriage return; the board answers with an echo of the token terminated
//! by `\r\n`. The identify request is followed by a second line carrying the
//! model string.

use std::fmt;

/// Terminator appended to every request before it is written.
pub const REQUEST_TERMINATOR: char = '\r';

/// A single request to a UDIN board.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Request {
    /// `?` — ask the board for its model line.
    Identify,
    /// `n<N>` — switch relay `N` on.
    On(u8),
    /// `f<N>` — switch relay `N` off.
    Off(u8),
    /// `r<N>` — set output `N`.
    Set(u8),
    /// `s<N>` — query relay `N` status.
    Status(u8),
    /// `i<N>` — query input `N`.
    Input(u8),
}

impl Request {
    /// Whether the response carries a second (model) line after the echo.
    #[must_use]
    pub fn expects_model_line(self) -> bool {
        matches!(self, Self::Identify)
    }

    /// The request as written to the line, terminator included.
    #[must_use]
    pub fn to_line(self) -> String {
        format!("{self}{REQUEST_TERMINATOR}")
    }
}

impl fmt::Display for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Identify => f.write_str("?"),
            Self::On(n) => write!(f, "n{n}"),
            Self::Off(n) => write!(f, "f{n}"),
            Self::Set(n) => write!(f, "r{n}"),
            Self::Status(n) => write!(f, "s{n}"),
            Self::Input(n) => write!(f, "i{n}"),
        }
    }
}

/// Strip the trailing `\r\n` (or any mix of them) from a response line.
#[must_use]
pub fn strip_line_ending(line: &str) -> &str {
    line.trim_end_matches(['\r', '\n'])
}
