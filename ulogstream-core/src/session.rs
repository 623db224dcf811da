//! Streaming session: sequence tracking, control acknowledgements and
//! reassembly wired together

use crate::constants::{
    DEFAULT_RECV_TIMEOUT, DEFAULT_START_TIMEOUT, DROPOUT_MS_PER_CHUNK, MAX_DROPOUT_CHUNKS,
};
use crate::error::StreamError;
use crate::reassembler::{ReassemblyStats, StreamPhase, StreamReassembler};
use crate::sequence::{SequenceTracker, SequenceVerdict};
use crate::sink::OutputSink;
use crate::types::{Chunk, ControlCommand, Inbound};
use core::time::Duration;
use serde::Serialize;

#[cfg(feature = "logging")]
use tracing::{debug, info};

/// Session parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// How long to wait for the producer to start streaming
    pub start_timeout: Duration,

    /// How long one receive may block before control returns to the driver
    pub recv_timeout: Duration,

    /// Cap on missing chunks accounted for by one dropout record
    pub max_dropout_chunks: u32,

    /// Assumed duration of one missing chunk in milliseconds
    pub dropout_ms_per_chunk: u16,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            start_timeout: DEFAULT_START_TIMEOUT,
            recv_timeout: DEFAULT_RECV_TIMEOUT,
            max_dropout_chunks: MAX_DROPOUT_CHUNKS,
            dropout_ms_per_chunk: DROPOUT_MS_PER_CHUNK,
        }
    }
}

impl SessionConfig {
    /// Create a config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the start timeout
    pub fn start_timeout(mut self, timeout: Duration) -> Self {
        self.start_timeout = timeout;
        self
    }

    /// Set the receive timeout
    pub fn recv_timeout(mut self, timeout: Duration) -> Self {
        self.recv_timeout = timeout;
        self
    }

    /// Set the dropout cap.
    ///
    /// Whatever the policy, one dropout record never encodes more than
    /// [`MAX_DROPOUT_MS`](crate::constants::MAX_DROPOUT_MS).
    pub fn max_dropout_chunks(mut self, chunks: u32) -> Self {
        self.max_dropout_chunks = chunks;
        self
    }

    /// Set the per-chunk dropout duration
    pub fn dropout_ms_per_chunk(mut self, ms: u16) -> Self {
        self.dropout_ms_per_chunk = ms;
        self
    }
}

/// Session counters
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SessionStats {
    /// Data chunks received, including duplicates
    pub chunks_received: u64,

    /// Chunks accepted as fresh
    pub chunks_accepted: u64,

    /// Chunks ignored as exact duplicates
    pub duplicates: u64,

    /// Chunks ignored as late or reordered
    pub reordered: u64,

    /// Chunks known to be lost on the link
    pub chunks_dropped: u64,

    /// Acknowledgements the caller was asked to send
    pub acks_requested: u64,

    /// Bytes of an incomplete record dropped at shutdown
    pub pending_dropped: u64,

    /// What was written to the output
    pub output: ReassemblyStats,
}

/// Outcome of processing one data chunk
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkDisposition {
    /// Sequence number of the chunk
    pub sequence: u16,

    /// Classification by the sequence tracker
    pub verdict: SequenceVerdict,

    /// Sequence number to acknowledge, if any
    pub ack: Option<u16>,
}

impl ChunkDisposition {
    /// Whether the chunk was processed
    pub fn accepted(&self) -> bool {
        self.verdict.is_fresh()
    }

    /// Chunks missing right before this one
    pub fn missing(&self) -> u32 {
        self.verdict.missing()
    }
}

/// What happened when an inbound message was handled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    /// A data chunk was classified (and processed if fresh)
    Chunk(ChunkDisposition),

    /// The producer confirmed the start request
    LoggingStarted,

    /// A control acknowledgement that needs no action
    Ignored,
}

/// A single streaming session writing one reconstructed log
#[derive(Debug)]
pub struct Session<S: OutputSink> {
    config: SessionConfig,
    tracker: SequenceTracker,
    reassembler: StreamReassembler<S>,
    logging_started: bool,
    stats: SessionStats,
}

impl<S: OutputSink> Session<S> {
    /// Create a session writing to `sink`
    pub fn new(sink: S, config: SessionConfig) -> Self {
        let reassembler = StreamReassembler::new(sink)
            .with_dropout_policy(config.max_dropout_chunks, config.dropout_ms_per_chunk);

        Self {
            config,
            tracker: SequenceTracker::new(),
            reassembler,
            logging_started: false,
            stats: SessionStats::default(),
        }
    }

    /// Session parameters
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Whether the producer is known to be streaming
    pub fn logging_started(&self) -> bool {
        self.logging_started
    }

    /// Current reassembly phase
    pub fn phase(&self) -> StreamPhase {
        self.reassembler.phase()
    }

    /// Snapshot of the session counters
    pub fn stats(&self) -> SessionStats {
        SessionStats {
            output: self.reassembler.stats().clone(),
            ..self.stats.clone()
        }
    }

    /// Handle one inbound message
    pub fn handle(&mut self, inbound: Inbound) -> Result<SessionEvent, StreamError> {
        match inbound {
            Inbound::Data(chunk) => self.handle_chunk(&chunk).map(SessionEvent::Chunk),
            Inbound::CommandAck { command, result } => self.handle_command_ack(command, result),
        }
    }

    /// Classify a data chunk and feed it to the reassembler when fresh
    pub fn handle_chunk(&mut self, chunk: &Chunk) -> Result<ChunkDisposition, StreamError> {
        self.stats.chunks_received += 1;

        let verdict = self.tracker.classify(chunk.sequence);
        let mut disposition = ChunkDisposition {
            sequence: chunk.sequence,
            verdict,
            ack: None,
        };

        match verdict {
            SequenceVerdict::Duplicate => {
                #[cfg(feature = "logging")]
                debug!("Duplicate chunk {}", chunk.sequence);

                self.stats.duplicates += 1;
                return Ok(disposition);
            }
            SequenceVerdict::Reordered => {
                #[cfg(feature = "logging")]
                debug!("Reordered chunk {}", chunk.sequence);

                self.stats.reordered += 1;
                return Ok(disposition);
            }
            SequenceVerdict::Fresh { missing } => {
                self.stats.chunks_accepted += 1;
                self.stats.chunks_dropped += u64::from(missing);
            }
        }

        if chunk.ack_required {
            self.stats.acks_requested += 1;
            disposition.ack = Some(chunk.sequence);
        } else if !self.logging_started {
            self.logging_started = true;
        }

        self.reassembler
            .ingest_chunk(chunk, disposition.missing())?;

        Ok(disposition)
    }

    /// Handle the acknowledgement of a control request
    pub fn handle_command_ack(
        &mut self,
        command: ControlCommand,
        result: u8,
    ) -> Result<SessionEvent, StreamError> {
        if command != ControlCommand::StartLogging || self.phase() == StreamPhase::Streaming {
            return Ok(SessionEvent::Ignored);
        }

        if result != 0 {
            return Err(StreamError::StartRejected(result));
        }

        #[cfg(feature = "logging")]
        info!("Logging started. Waiting for header...");

        self.logging_started = true;
        Ok(SessionEvent::LoggingStarted)
    }

    /// Fail if the producer has not started streaming within the grace period
    pub fn check_start_timeout(&self, elapsed: Duration) -> Result<(), StreamError> {
        if !self.logging_started && elapsed > self.config.start_timeout {
            return Err(StreamError::StartTimeout {
                waited_ms: elapsed.as_millis() as u64,
            });
        }
        Ok(())
    }

    /// End the session, returning the sink and the final counters
    pub fn finish(self) -> Result<(S, SessionStats), StreamError> {
        let (sink, output, dropped) = self.reassembler.finish()?;
        let stats = SessionStats {
            pending_dropped: dropped as u64,
            output,
            ..self.stats
        };
        Ok((sink, stats))
    }
}
