//! Producer-side chunking of a log
//!
//! Splits a complete log (preamble followed by records) into chunks the way
//! the producer streams it, computing the first record offset of each chunk.
//! Used to simulate links and to generate captures.

use crate::constants::{CHUNK_DATA_CAPACITY, NO_RECORD_START, PREAMBLE_LEN};
use crate::error::StreamError;
use crate::scanner::FrameScanner;
use crate::types::Chunk;
use alloc::vec::Vec;
use bytes::Bytes;

/// Iterator over the chunks of a log
#[derive(Debug, Clone)]
pub struct Chunker {
    log: Bytes,
    chunk_size: usize,
    pos: usize,
    sequence: u16,
    acked_chunks: usize,
    emitted: usize,
    boundaries: Vec<usize>,
    next_boundary: usize,
}

impl Chunker {
    /// Chunk `log` into pieces of at most `chunk_size` bytes
    pub fn new(log: Bytes, chunk_size: usize) -> Result<Self, StreamError> {
        if !(PREAMBLE_LEN..=CHUNK_DATA_CAPACITY).contains(&chunk_size) {
            return Err(StreamError::InvalidChunkSize(
                chunk_size,
                PREAMBLE_LEN,
                CHUNK_DATA_CAPACITY,
            ));
        }
        if log.len() < PREAMBLE_LEN {
            return Err(StreamError::PreambleTooShort {
                expected: PREAMBLE_LEN,
                actual: log.len(),
            });
        }

        let mut boundaries = Vec::new();
        let mut offset = PREAMBLE_LEN;
        for frame in FrameScanner::new(&log[PREAMBLE_LEN..]) {
            boundaries.push(offset);
            offset += frame.len();
        }

        Ok(Self {
            log,
            chunk_size,
            pos: 0,
            sequence: 0,
            acked_chunks: 0,
            emitted: 0,
            boundaries,
            next_boundary: 0,
        })
    }

    /// Sequence number of the first chunk
    pub fn start_sequence(mut self, sequence: u16) -> Self {
        self.sequence = sequence;
        self
    }

    /// Flag the first `count` chunks as requiring an acknowledgement
    pub fn acked_chunks(mut self, count: usize) -> Self {
        self.acked_chunks = count;
        self
    }
}

impl Iterator for Chunker {
    type Item = Chunk;

    fn next(&mut self) -> Option<Chunk> {
        if self.pos >= self.log.len() {
            return None;
        }

        let start = self.pos;
        let end = (start + self.chunk_size).min(self.log.len());

        while self
            .boundaries
            .get(self.next_boundary)
            .is_some_and(|&boundary| boundary < start)
        {
            self.next_boundary += 1;
        }

        let first_record_offset = match self.boundaries.get(self.next_boundary) {
            Some(&boundary) if boundary < end => (boundary - start) as u8,
            _ => NO_RECORD_START,
        };

        let mut chunk = Chunk::new(
            self.sequence,
            self.log.slice(start..end),
            first_record_offset,
        );
        chunk.ack_required = self.emitted < self.acked_chunks;

        self.pos = end;
        self.sequence = self.sequence.wrapping_add(1);
        self.emitted += 1;

        Some(chunk)
    }
}
