//! UDIN board models and their relay/input counts.

use std::fmt;

/// Length of the model prefix that identifies a board family.
pub const MODEL_PREFIX_LEN: usize = 7;

/// A supported UDIN board family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BoardModel {
    /// `UDIN-8R`: eight relays.
    EightRelay,
    /// `UDIN-44`: four relays and four inputs.
    FourFour,
    /// `UDIN-8I`: eight inputs.
    EightInput,
}

impl BoardModel {
    /// Classify the model line a board returns to an identify request.
    ///
    /// Returns `None` for anything that does not start with a known prefix.
    #[must_use]
    pub fn from_model_line(line: &str) -> Option<Self> {
        let prefix = line.get(..MODEL_PREFIX_LEN)?;
        match prefix {
            "UDIN-8R" => Some(Self::EightRelay),
            "UDIN-44" => Some(Self::FourFour),
            "UDIN-8I" => Some(Self::EightInput),
            _ => None,
        }
    }

    #[must_use]
    pub fn prefix(self) -> &'static str {
        match self {
            Self::EightRelay => "UDIN-8R",
            Self::FourFour => "UDIN-44",
            Self::EightInput => "UDIN-8I",
        }
    }

    #[must_use]
    pub fn relay_count(self) -> u8 {
        match self {
            Self::EightRelay => 8,
            Self::FourFour => 4,
            Self::EightInput => 0,
        }
    }

    #[must_use]
    pub fn input_count(self) -> u8 {
        match self {
            Self::EightRelay => 0,
            Self::FourFour => 4,
            Self::EightInput => 8,
        }
    }
}

impl fmt::Display for BoardModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.prefix())
    }
}
