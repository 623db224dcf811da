//! JSON-lines chunk captures and their replay as a transport

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fs;
use std::io::{self, Read};
use std::time::Duration;
use tracing::debug;
use ulogstream_core::{
    constants::CHUNK_DATA_CAPACITY, Chunk, ControlCommand, Inbound, StreamError, Transport,
};

/// One line of a capture file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CaptureEntry {
    /// A data chunk; `data` is hex encoded
    Data {
        sequence: u16,
        first_record_offset: u8,
        #[serde(default)]
        ack_required: bool,
        data: String,
    },
    /// Acknowledgement of a control request
    CommandAck {
        command: ControlCommand,
        #[serde(default)]
        result: u8,
    },
}

impl CaptureEntry {
    pub fn from_chunk(chunk: &Chunk) -> Self {
        CaptureEntry::Data {
            sequence: chunk.sequence,
            first_record_offset: chunk.first_record_offset,
            ack_required: chunk.ack_required,
            data: hex::encode(&chunk.data),
        }
    }

    pub fn into_inbound(self) -> Result<Inbound> {
        match self {
            CaptureEntry::Data {
                sequence,
                first_record_offset,
                ack_required,
                data,
            } => {
                let data = hex::decode(&data)
                    .with_context(|| format!("Invalid hex data in chunk {}", sequence))?;
                if data.len() > CHUNK_DATA_CAPACITY {
                    return Err(StreamError::ChunkTooLong {
                        length: data.len(),
                        capacity: CHUNK_DATA_CAPACITY,
                    })
                    .with_context(|| format!("Chunk {} is too long", sequence));
                }
                let chunk = Chunk::from_wire(
                    sequence,
                    data.len() as u8,
                    first_record_offset,
                    &data,
                    ack_required,
                )?;
                Ok(Inbound::Data(chunk))
            }
            CaptureEntry::CommandAck { command, result } => {
                Ok(Inbound::CommandAck { command, result })
            }
        }
    }
}

/// Read a capture file ("-" for stdin)
pub fn read_capture(input: &str) -> Result<Vec<CaptureEntry>> {
    let content = if input == "-" {
        let mut buf = String::new();
        io::stdin().read_to_string(&mut buf)?;
        buf
    } else {
        fs::read_to_string(input)
            .with_context(|| format!("Failed to read capture file: {}", input))?
    };

    let mut entries = Vec::new();
    for (line_no, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let entry: CaptureEntry = serde_json::from_str(line)
            .with_context(|| format!("Failed to parse capture line {}", line_no + 1))?;
        entries.push(entry);
    }

    if entries.is_empty() {
        bail!("Capture {} contains no entries", input);
    }

    Ok(entries)
}

/// Write a capture file, one JSON object per line
pub fn write_capture(output: &str, entries: &[CaptureEntry]) -> Result<()> {
    let mut content = String::new();
    for entry in entries {
        let line = serde_json::to_string(entry).context("Failed to serialize capture entry")?;
        content.push_str(&line);
        content.push('\n');
    }

    fs::write(output, content)
        .with_context(|| format!("Failed to write capture file: {}", output))?;
    Ok(())
}

/// Replays a capture as if it were a live link
#[derive(Debug, Default)]
pub struct CaptureReplay {
    inbound: VecDeque<Inbound>,
    acks: Vec<u16>,
    commands: Vec<ControlCommand>,
}

impl CaptureReplay {
    pub fn new(entries: Vec<CaptureEntry>) -> Result<Self> {
        let inbound = entries
            .into_iter()
            .map(CaptureEntry::into_inbound)
            .collect::<Result<VecDeque<_>>>()?;

        Ok(Self {
            inbound,
            ..Default::default()
        })
    }

    /// Acknowledgements sent so far
    pub fn acks(&self) -> &[u16] {
        &self.acks
    }

    /// Control requests sent so far
    pub fn commands(&self) -> &[ControlCommand] {
        &self.commands
    }
}

impl Transport for CaptureReplay {
    fn send_command(&mut self, command: ControlCommand) -> Result<(), StreamError> {
        debug!("Control request: {:?}", command);
        self.commands.push(command);
        Ok(())
    }

    fn recv(&mut self, _timeout: Duration) -> Result<Option<Inbound>, StreamError> {
        Ok(self.inbound.pop_front())
    }

    fn send_ack(&mut self, sequence: u16) -> Result<(), StreamError> {
        self.acks.push(sequence);
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.inbound.is_empty()
    }
}
