use crate::capture::{write_capture, CaptureEntry};
use anyhow::{Context, Result};
use bytes::Bytes;
use std::fs;
use tracing::{debug, info};
use ulogstream_core::{Chunker, ControlCommand};

/// How to turn a log into a capture
#[derive(Debug, Clone, Default)]
pub struct ChunkOptions {
    pub chunk_size: usize,
    pub start_sequence: u16,
    pub acked_chunks: usize,
    /// Sequence numbers to leave out
    pub drop: Vec<u16>,
    /// Sequence numbers to emit twice
    pub duplicate: Vec<u16>,
    /// Omit the leading start acknowledgement
    pub no_start_ack: bool,
}

pub fn execute(input: &str, output: &str, options: &ChunkOptions) -> Result<usize> {
    info!("Chunking log: {}", input);

    let log = fs::read(input).with_context(|| format!("Failed to read input file: {}", input))?;
    let chunker = Chunker::new(Bytes::from(log), options.chunk_size)
        .context("Invalid chunking parameters")?
        .start_sequence(options.start_sequence)
        .acked_chunks(options.acked_chunks);

    let mut entries = Vec::new();
    if !options.no_start_ack {
        entries.push(CaptureEntry::CommandAck {
            command: ControlCommand::StartLogging,
            result: 0,
        });
    }

    let mut produced = 0usize;
    let mut dropped = 0usize;
    for chunk in chunker {
        produced += 1;
        if options.drop.contains(&chunk.sequence) {
            debug!("Dropping chunk {}", chunk.sequence);
            dropped += 1;
            continue;
        }

        let entry = CaptureEntry::from_chunk(&chunk);
        if options.duplicate.contains(&chunk.sequence) {
            entries.push(entry.clone());
        }
        entries.push(entry);
    }

    write_capture(output, &entries)?;

    info!(
        "Wrote {} entries ({} chunks, {} dropped) to {}",
        entries.len(),
        produced,
        dropped,
        output
    );

    Ok(entries.len())
}
