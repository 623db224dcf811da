//! # ulogstream Core
//!
//! Reassembles a ULog file from a lossy, possibly reordered stream of
//! fixed-size chunks.
//!
//! ## Modules
//!
//! - `chunker`: Producer-side chunking for simulation and captures
//! - `constants`: Stream format constants and limits
//! - `types`: Core types (Chunk, Record, Inbound)
//! - `sequence`: 16-bit sequence tracking with wrap-around
//! - `scanner`: Length-driven record framing
//! - `reassembler`: Fragment stitching and dropout markers
//! - `sink`: Output abstraction
//! - `session`: Session orchestration and counters
//! - `transport`: Link trait and blocking driver

#![cfg_attr(not(feature = "std"), no_std)]
#![warn(missing_docs)]

extern crate alloc;

pub mod chunker;
pub mod constants;
pub mod error;
pub mod reassembler;
pub mod scanner;
pub mod sequence;
pub mod session;
pub mod sink;
pub mod transport;
pub mod types;

// Re-export commonly used types
pub use chunker::Chunker;
pub use error::StreamError;
pub use reassembler::{StreamPhase, StreamReassembler};
pub use sequence::SequenceTracker;
pub use session::{Session, SessionConfig, SessionStats};
pub use sink::OutputSink;
pub use transport::Transport;
pub use types::{Chunk, ControlCommand, Inbound, Record};

#[cfg(feature = "std")]
pub use transport::run_session;

/// Result type alias for ulogstream operations
pub type Result<T> = core::result::Result<T, StreamError>;
