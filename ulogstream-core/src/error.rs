//! Error types for ULog stream reassembly

use alloc::string::String;

/// Errors that end a streaming session
#[cfg_attr(feature = "std", derive(thiserror::Error))]
#[derive(Debug, Clone, PartialEq)]
pub enum StreamError {
    /// The first accepted chunk was too short to hold the file preamble
    #[cfg_attr(feature = "std", error("First chunk too short for preamble: expected {expected} bytes, got {actual}"))]
    PreambleTooShort {
        /// The number of bytes required.
        expected: usize,
        /// The number of bytes actually available.
        actual: usize,
    },

    /// The producer rejected the start logging request
    #[cfg_attr(feature = "std", error("Logging start rejected by producer (result {0})"))]
    StartRejected(u8),

    /// No data arrived within the start grace period
    #[cfg_attr(feature = "std", error("Start timed out after {waited_ms} ms. Is the logger streaming over this link?"))]
    StartTimeout {
        /// How long the session waited, in milliseconds.
        waited_ms: u64,
    },

    /// A chunk declared more payload than its data field can carry
    #[cfg_attr(feature = "std", error("Chunk length {length} exceeds data capacity {capacity}"))]
    ChunkTooLong {
        /// Declared payload length.
        length: usize,
        /// Capacity of the data field.
        capacity: usize,
    },

    /// Chunk size outside the range the wire format can express
    #[cfg_attr(feature = "std", error("Invalid chunk size {0}: must be between {1} and {2}"))]
    InvalidChunkSize(usize, usize, usize),

    /// A record body does not fit the 16-bit length field
    #[cfg_attr(feature = "std", error("Record body of {0} bytes exceeds the 16-bit length field"))]
    RecordTooLarge(usize),

    /// IO error while writing the output
    #[cfg_attr(feature = "std", error("IO error: {0}"))]
    Io(String),

    /// Transport failure reported by the link collaborator
    #[cfg_attr(feature = "std", error("Transport error: {0}"))]
    Transport(String),
}

#[cfg(feature = "std")]
impl From<std::io::Error> for StreamError {
    fn from(err: std::io::Error) -> Self {
        StreamError::Io(err.to_string())
    }
}
