//! Error type shared by the edit session, operators, and codec boundary.

use std::fmt;

/// Error type for edit-session operations.
///
/// None of these are fatal: a failed operation leaves the timeline and the
/// adjustment state exactly as they were, and the session remains usable.
#[derive(Debug)]
pub enum EditError {
    /// An operator was invoked before any image was acquired.
    NoActiveImage,
    /// The timeline cursor was read while the timeline held no entries.
    EmptyHistory,
    /// A bitmap or viewport dimension was zero.
    InvalidDimensions,
    /// The encoded bitmap bytes could not be decoded.
    DecodeFailure(String),
    /// A bitmap could not be encoded into the requested container.
    EncodeFailure(String),
    /// A crop or transform region had zero area.
    EmptyFrame,
    /// Filesystem failure (CLI input/output).
    Io(std::io::Error),
}

impl fmt::Display for EditError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EditError::NoActiveImage => write!(f, "No active image: load an image first"),
            EditError::EmptyHistory => write!(f, "Edit history is empty"),
            EditError::InvalidDimensions => write!(f, "Invalid dimensions: width and height must be non-zero"),
            EditError::DecodeFailure(e) => write!(f, "Decode error: {}", e),
            EditError::EncodeFailure(e) => write!(f, "Encode error: {}", e),
            EditError::EmptyFrame => write!(f, "Empty frame: the selected region has zero area"),
            EditError::Io(e) => write!(f, "I/O error: {}", e),
        }
    }
}

impl std::error::Error for EditError {}

impl From<std::io::Error> for EditError {
    fn from(e: std::io::Error) -> Self {
        EditError::Io(e)
    }
}
