//! Core types for the ULog chunk stream

use crate::constants::{
    DROPOUT_BODY_LEN, DROPOUT_TYPE, NO_RECORD_START, RECORD_HEADER_LEN,
};
use crate::error::StreamError;
use bytes::{BufMut, Bytes, BytesMut};
use serde::{Deserialize, Serialize};

/// A fixed-size chunk of log data as delivered by the link
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    /// Wrapping 16-bit sequence number
    pub sequence: u16,

    /// Valid payload bytes (already truncated to the declared length)
    pub data: Bytes,

    /// Offset of the first record start in `data`, or [`NO_RECORD_START`]
    pub first_record_offset: u8,

    /// Whether the producer expects an acknowledgement for this chunk
    pub ack_required: bool,
}

impl Chunk {
    /// Create a new chunk that does not require an acknowledgement
    pub fn new(sequence: u16, data: Bytes, first_record_offset: u8) -> Self {
        Self {
            sequence,
            data,
            first_record_offset,
            ack_required: false,
        }
    }

    /// Flag this chunk as requiring an acknowledgement
    pub fn acked(mut self) -> Self {
        self.ack_required = true;
        self
    }

    /// Build a chunk from the raw wire fields.
    ///
    /// `data` is the full data field; only the first `length` bytes are kept.
    pub fn from_wire(
        sequence: u16,
        length: u8,
        first_record_offset: u8,
        data: &[u8],
        ack_required: bool,
    ) -> Result<Self, StreamError> {
        let length = length as usize;
        if length > data.len() {
            return Err(StreamError::ChunkTooLong {
                length,
                capacity: data.len(),
            });
        }

        Ok(Self {
            sequence,
            data: Bytes::copy_from_slice(&data[..length]),
            first_record_offset,
            ack_required,
        })
    }

    /// Declared payload length
    pub fn length(&self) -> usize {
        self.data.len()
    }

    /// Whether a record starts somewhere in this chunk
    pub fn has_record_start(&self) -> bool {
        self.first_record_offset != NO_RECORD_START
    }
}

/// A complete, self-length-prefixed log record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    bytes: Bytes,
}

impl Record {
    /// Wrap bytes already known to hold exactly one framed record
    pub(crate) fn from_framed(bytes: Bytes) -> Self {
        debug_assert!(bytes.len() >= RECORD_HEADER_LEN);
        Self { bytes }
    }

    /// Encode a record from its type tag and body
    pub fn encode(type_tag: u8, body: &[u8]) -> Result<Self, StreamError> {
        let body_len =
            u16::try_from(body.len()).map_err(|_| StreamError::RecordTooLarge(body.len()))?;

        let mut buf = BytesMut::with_capacity(RECORD_HEADER_LEN + body.len());
        buf.put_u16_le(body_len);
        buf.put_u8(type_tag);
        buf.put_slice(body);

        Ok(Self { bytes: buf.freeze() })
    }

    /// Synthesize a dropout marker covering `duration_ms` of lost data
    pub fn dropout(duration_ms: u16) -> Self {
        let mut buf = BytesMut::with_capacity(RECORD_HEADER_LEN + DROPOUT_BODY_LEN as usize);
        buf.put_u16_le(DROPOUT_BODY_LEN);
        buf.put_u8(DROPOUT_TYPE);
        buf.put_u16_le(duration_ms);

        Self { bytes: buf.freeze() }
    }

    /// Length of the record body (excluding the 3-byte header)
    pub fn body_len(&self) -> u16 {
        u16::from_le_bytes([self.bytes[0], self.bytes[1]])
    }

    /// Record type tag
    pub fn type_tag(&self) -> u8 {
        self.bytes[2]
    }

    /// Record body
    pub fn body(&self) -> &[u8] {
        &self.bytes[RECORD_HEADER_LEN..]
    }

    /// Total on-wire size (header + body)
    pub fn total_size(&self) -> usize {
        self.bytes.len()
    }

    /// The full encoded record
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Consume the record, returning its encoded bytes
    pub fn into_bytes(self) -> Bytes {
        self.bytes
    }

    /// Check if this is a dropout marker
    pub fn is_dropout(&self) -> bool {
        self.type_tag() == DROPOUT_TYPE && self.body_len() == DROPOUT_BODY_LEN
    }

    /// Duration carried by a dropout marker
    pub fn dropout_duration_ms(&self) -> Option<u16> {
        if self.is_dropout() {
            let body = self.body();
            Some(u16::from_le_bytes([body[0], body[1]]))
        } else {
            None
        }
    }
}

impl AsRef<[u8]> for Record {
    fn as_ref(&self) -> &[u8] {
        &self.bytes
    }
}

/// Control requests sent to the producer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ControlCommand {
    /// Ask the producer to start streaming its log
    StartLogging,
    /// Ask the producer to stop streaming
    StopLogging,
}

/// A message received from the link
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inbound {
    /// A record-bearing chunk
    Data(Chunk),

    /// Acknowledgement of a prior control request (`result == 0` is success)
    CommandAck {
        /// The command being acknowledged
        command: ControlCommand,
        /// Producer result code
        result: u8,
    },
}
