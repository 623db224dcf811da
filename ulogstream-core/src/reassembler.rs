//! Reassembly of log records from an unreliable chunk stream
//!
//! The reassembler receives chunks that the sequence tracker has already
//! accepted, together with the number of chunks lost just before each one.
//! It stitches records that straddle chunk boundaries, drops fragments that
//! can no longer be completed after a loss, and writes dropout markers so the
//! output remains a valid sequence of records.

use crate::constants::{
    DROPOUT_MS_PER_CHUNK, MAX_DROPOUT_CHUNKS, MAX_DROPOUT_MS, MAX_RECORD_LEN, NO_RECORD_START,
    PREAMBLE_LEN,
};
use crate::error::StreamError;
use crate::scanner::FrameScanner;
use crate::sink::OutputSink;
use crate::types::{Chunk, Record};
use bytes::BytesMut;
use serde::Serialize;

#[cfg(feature = "logging")]
use tracing::{debug, warn};

/// Progress of a session through the producer's log layout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StreamPhase {
    /// The 16-byte file preamble has not been written yet
    AwaitingPreamble,
    /// Preamble written; the producer is still sending its acknowledged
    /// definitions section
    AwaitingHeaderSection,
    /// Steady-state logging; losses are marked with dropout records
    Streaming,
}

/// When a chunk ends the header section
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum HeaderLatch {
    Never,
    BeforeLossCheck,
    AfterRecords,
}

/// Counters describing what the reassembler wrote
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReassemblyStats {
    /// Total bytes written to the sink, preamble included
    pub bytes_written: u64,

    /// Records written, including completed fragments and dropout markers
    pub records_written: u64,

    /// Dropout markers synthesized
    pub dropout_records: u64,

    /// Sum of the durations of all dropout markers in milliseconds
    pub dropout_ms: u64,

    /// Bytes thrown away because they could not be placed in a record
    pub bytes_discarded: u64,
}

/// Rebuilds the log byte stream from accepted chunks
#[derive(Debug)]
pub struct StreamReassembler<S: OutputSink> {
    sink: S,
    phase: StreamPhase,
    pending: BytesMut,
    max_dropout_chunks: u32,
    dropout_ms_per_chunk: u16,
    stats: ReassemblyStats,
}

impl<S: OutputSink> StreamReassembler<S> {
    /// Create a reassembler writing to `sink`
    pub fn new(sink: S) -> Self {
        Self {
            sink,
            phase: StreamPhase::AwaitingPreamble,
            pending: BytesMut::new(),
            max_dropout_chunks: MAX_DROPOUT_CHUNKS,
            dropout_ms_per_chunk: DROPOUT_MS_PER_CHUNK,
            stats: ReassemblyStats::default(),
        }
    }

    /// Override how missing chunks are converted into a dropout duration.
    ///
    /// The resulting duration is still capped at [`MAX_DROPOUT_MS`].
    pub fn with_dropout_policy(mut self, max_chunks: u32, ms_per_chunk: u16) -> Self {
        self.max_dropout_chunks = max_chunks;
        self.dropout_ms_per_chunk = ms_per_chunk;
        self
    }

    /// Current phase
    pub fn phase(&self) -> StreamPhase {
        self.phase
    }

    /// Number of bytes held for a record that is not complete yet
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Output counters
    pub fn stats(&self) -> &ReassemblyStats {
        &self.stats
    }

    /// Borrow the sink
    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Record that the producer has left its definitions section.
    ///
    /// Has no effect before the preamble was written or once streaming.
    pub fn mark_header_section_complete(&mut self) {
        if self.phase == StreamPhase::AwaitingHeaderSection {
            #[cfg(feature = "logging")]
            debug!("Header section complete, dropouts will be marked from now on");

            self.phase = StreamPhase::Streaming;
        }
    }

    /// Process an accepted chunk.
    ///
    /// A chunk that does not require an acknowledgement marks the end of the
    /// header section before its data is processed, so a loss reported with
    /// it is already marked. Acknowledged chunks never end the header section.
    pub fn ingest_chunk(&mut self, chunk: &Chunk, missing_count: u32) -> Result<(), StreamError> {
        let latch = if chunk.ack_required {
            HeaderLatch::Never
        } else {
            HeaderLatch::BeforeLossCheck
        };
        self.process(
            &chunk.data,
            chunk.first_record_offset,
            missing_count,
            latch,
        )
    }

    /// Process the payload of an accepted chunk that did not require an
    /// acknowledgement.
    ///
    /// `first_record_offset` is the offset of the first record start in
    /// `payload` ([`NO_RECORD_START`] if none) and `missing_count` the number
    /// of chunks lost right before this one.
    ///
    /// Once the payload is processed, a chunk in which a record starts ends
    /// the header section; losses reported from then on are marked with
    /// dropout records. Use [`ingest_chunk`](Self::ingest_chunk) when the
    /// stream carries acknowledged definition chunks.
    pub fn ingest(
        &mut self,
        payload: &[u8],
        first_record_offset: u8,
        missing_count: u32,
    ) -> Result<(), StreamError> {
        let latch = if first_record_offset == NO_RECORD_START {
            HeaderLatch::Never
        } else {
            HeaderLatch::AfterRecords
        };
        self.process(payload, first_record_offset, missing_count, latch)
    }

    fn process(
        &mut self,
        payload: &[u8],
        first_record_offset: u8,
        missing_count: u32,
        latch: HeaderLatch,
    ) -> Result<(), StreamError> {
        let mut payload = payload;
        let mut offset = first_record_offset;

        if self.phase == StreamPhase::AwaitingPreamble {
            payload = self.extract_preamble(payload)?;
            if offset != NO_RECORD_START {
                offset = offset.saturating_sub(PREAMBLE_LEN as u8);
            }
        }

        if latch == HeaderLatch::BeforeLossCheck {
            self.mark_header_section_complete();
        }

        self.place(payload, offset, missing_count)?;

        if latch == HeaderLatch::AfterRecords {
            self.mark_header_section_complete();
        }

        Ok(())
    }

    /// Write whatever `payload` completes or contains once the preamble is out
    fn place(
        &mut self,
        mut payload: &[u8],
        mut offset: u8,
        missing_count: u32,
    ) -> Result<(), StreamError> {
        if missing_count > 0 {
            if self.phase == StreamPhase::Streaming {
                self.write_dropout(missing_count)?;
            }

            self.flush_pending()?;

            if offset == NO_RECORD_START {
                #[cfg(feature = "logging")]
                debug!(
                    "Discarding {} bytes of continuation data after a loss",
                    payload.len()
                );

                self.stats.bytes_discarded += payload.len() as u64;
                return Ok(());
            }

            let skip = (offset as usize).min(payload.len());
            self.stats.bytes_discarded += skip as u64;
            payload = &payload[skip..];
            offset = 0;
        }

        if offset == NO_RECORD_START {
            if self.pending.is_empty() {
                // Nothing to continue and no record starts here
                self.stats.bytes_discarded += payload.len() as u64;
            } else {
                self.pending.extend_from_slice(payload);
                self.check_pending_bound();
            }
            return Ok(());
        }

        let split = (offset as usize).min(payload.len());
        let (tail, records) = payload.split_at(split);

        if !self.pending.is_empty() {
            self.pending.extend_from_slice(tail);
            let fragment = self.pending.split();
            self.write_record(&fragment)?;
        } else {
            self.stats.bytes_discarded += tail.len() as u64;
        }

        let mut scanner = FrameScanner::new(records);
        for frame in scanner.by_ref() {
            self.write_record(frame)?;
        }
        self.pending.extend_from_slice(scanner.remainder());

        Ok(())
    }

    /// Drop a pending fragment that has grown past any possible record
    fn check_pending_bound(&mut self) {
        if self.pending.len() <= MAX_RECORD_LEN {
            return;
        }

        let dropped = self.pending.len();

        #[cfg(feature = "logging")]
        warn!(
            "Pending fragment grew to {} bytes without completing, resynchronizing",
            dropped
        );

        self.pending.clear();
        self.stats.bytes_discarded += dropped as u64;
    }

    fn extract_preamble<'a>(&mut self, payload: &'a [u8]) -> Result<&'a [u8], StreamError> {
        if payload.len() < PREAMBLE_LEN {
            return Err(StreamError::PreambleTooShort {
                expected: PREAMBLE_LEN,
                actual: payload.len(),
            });
        }

        let (preamble, rest) = payload.split_at(PREAMBLE_LEN);
        self.emit(preamble)?;
        self.pending.clear();
        self.phase = StreamPhase::AwaitingHeaderSection;

        #[cfg(feature = "logging")]
        debug!("Wrote {} byte preamble", PREAMBLE_LEN);

        Ok(rest)
    }

    fn write_dropout(&mut self, missing_count: u32) -> Result<(), StreamError> {
        let chunks = missing_count.min(self.max_dropout_chunks);
        let duration = chunks
            .saturating_mul(u32::from(self.dropout_ms_per_chunk))
            .min(u32::from(MAX_DROPOUT_MS));
        let duration = duration as u16;

        #[cfg(feature = "logging")]
        warn!(
            "{} chunks lost, writing {} ms dropout",
            missing_count, duration
        );

        let record = Record::dropout(duration);
        self.write_record(record.as_bytes())?;
        self.stats.dropout_records += 1;
        self.stats.dropout_ms += u64::from(duration);
        Ok(())
    }

    /// Write the complete records of the pending fragment and drop the rest
    fn flush_pending(&mut self) -> Result<(), StreamError> {
        if self.pending.is_empty() {
            return Ok(());
        }

        let pending = self.pending.split();
        let mut scanner = FrameScanner::new(&pending);
        for frame in scanner.by_ref() {
            self.write_record(frame)?;
        }

        let lost = scanner.remainder().len();
        if lost > 0 {
            #[cfg(feature = "logging")]
            debug!("Dropping {} byte partial record after a loss", lost);

            self.stats.bytes_discarded += lost as u64;
        }
        Ok(())
    }

    fn write_record(&mut self, bytes: &[u8]) -> Result<(), StreamError> {
        self.emit(bytes)?;
        self.stats.records_written += 1;
        Ok(())
    }

    fn emit(&mut self, bytes: &[u8]) -> Result<(), StreamError> {
        self.sink.write_bytes(bytes)?;
        self.stats.bytes_written += bytes.len() as u64;
        Ok(())
    }

    /// Flush the sink and return it with the final counters.
    ///
    /// A pending fragment can never be completed at this point and is
    /// dropped; its size is returned as the third element.
    pub fn finish(mut self) -> Result<(S, ReassemblyStats, usize), StreamError> {
        let dropped = self.pending.len();
        if dropped > 0 {
            #[cfg(feature = "logging")]
            warn!("Dropping {} byte incomplete record at shutdown", dropped);

            self.stats.bytes_discarded += dropped as u64;
        }

        self.sink.flush_output()?;
        Ok((self.sink, self.stats, dropped))
    }
}
