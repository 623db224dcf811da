//! Constants and limits for the ULog chunk stream

use core::time::Duration;

/// Length of the fixed ULog file preamble (magic, version, timestamp)
pub const PREAMBLE_LEN: usize = 16;

/// ULog magic bytes found at the start of the preamble
pub const ULOG_MAGIC: &[u8; 7] = b"ULog\x01\x12\x35";

/// Record header size: 2-byte little-endian body length + 1-byte type tag
pub const RECORD_HEADER_LEN: usize = 3;

/// Largest possible framed record
pub const MAX_RECORD_LEN: usize = u16::MAX as usize + RECORD_HEADER_LEN;

/// `first_record_offset` sentinel meaning "no record starts in this chunk"
pub const NO_RECORD_START: u8 = 255;

/// Capacity of the data field of a single chunk (MAVLink `LOGGING_DATA`)
pub const CHUNK_DATA_CAPACITY: usize = 249;

/// Type tag of a synthesized dropout record (ASCII 'O')
pub const DROPOUT_TYPE: u8 = b'O';

/// Body length of a dropout record (a single u16 duration)
pub const DROPOUT_BODY_LEN: u16 = 2;

/// Maximum number of missing chunks accounted for by one dropout record.
///
/// Together with [`DROPOUT_MS_PER_CHUNK`] this keeps the encoded duration at
/// or below 250 ms.
pub const MAX_DROPOUT_CHUNKS: u32 = 25;

/// Assumed duration of one missing chunk in milliseconds
pub const DROPOUT_MS_PER_CHUNK: u16 = 10;

/// Upper bound on the duration encoded in one dropout record, whatever the
/// configured dropout policy
pub const MAX_DROPOUT_MS: u16 = 250;

/// Half of the 16-bit sequence space, used to tell wrap-around from reordering
pub const SEQUENCE_HALF_RANGE: u16 = 1 << 15;

/// Size of the 16-bit sequence space
pub const SEQUENCE_SPACE: u32 = 1 << 16;

/// Grace period for the producer to start streaming after a start request
pub const DEFAULT_START_TIMEOUT: Duration = Duration::from_secs(4);

/// How long a single receive waits before returning control to the driver
pub const DEFAULT_RECV_TIMEOUT: Duration = Duration::from_millis(50);
