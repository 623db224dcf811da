//! Length-driven record scanner
//!
//! Records are framed purely by their 2-byte little-endian body length. The
//! scanner never looks at the type tag or body, so it tolerates any payload
//! bytes, and it never yields a partial record.

use crate::constants::{PREAMBLE_LEN, RECORD_HEADER_LEN, ULOG_MAGIC};
use crate::types::Record;
use alloc::vec::Vec;
use bytes::Bytes;
use serde::Serialize;

#[cfg(feature = "logging")]
use tracing::debug;

/// Total size of the record starting at `buf[0]`, if its header is present
pub fn record_size(buf: &[u8]) -> Option<usize> {
    if buf.len() < RECORD_HEADER_LEN {
        return None;
    }
    let body_len = u16::from_le_bytes([buf[0], buf[1]]) as usize;
    Some(body_len + RECORD_HEADER_LEN)
}

/// Iterator over the complete records at the front of a buffer
///
/// The buffer must start at a record boundary. Iteration stops at the first
/// record that is not fully present; [`FrameScanner::remainder`] then holds
/// the unread tail.
#[derive(Debug, Clone)]
pub struct FrameScanner<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> FrameScanner<'a> {
    /// Create a scanner over `buf`
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    /// Bytes consumed by the records yielded so far
    pub fn consumed(&self) -> usize {
        self.pos
    }

    /// Bytes not yet consumed
    pub fn remainder(&self) -> &'a [u8] {
        &self.buf[self.pos..]
    }
}

impl<'a> Iterator for FrameScanner<'a> {
    type Item = &'a [u8];

    fn next(&mut self) -> Option<Self::Item> {
        let rest = &self.buf[self.pos..];
        let total = record_size(rest)?;
        if total > rest.len() {
            return None;
        }
        self.pos += total;
        Some(&rest[..total])
    }
}

/// Split `buf` into its complete records and the trailing partial bytes
pub fn scan(buf: &[u8]) -> (Vec<Record>, &[u8]) {
    let mut scanner = FrameScanner::new(buf);
    let records = scanner
        .by_ref()
        .map(|frame| Record::from_framed(Bytes::copy_from_slice(frame)))
        .collect();
    (records, scanner.remainder())
}

/// Like [`scan`], but slices records out of `buf` without copying
pub fn scan_zero_copy(buf: Bytes) -> (Vec<Record>, Bytes) {
    let mut records = Vec::new();
    let mut start = 0;
    for frame in FrameScanner::new(&buf) {
        let end = start + frame.len();
        records.push(Record::from_framed(buf.slice(start..end)));
        start = end;
    }
    let remainder = buf.slice(start..);
    (records, remainder)
}

/// A record found at a specific offset of a log file
#[derive(Debug, Clone)]
pub struct LocatedRecord {
    /// Byte offset of the record header in the file
    pub offset: usize,

    /// The record
    pub record: Record,
}

/// Statistics about a scanned log file
#[derive(Debug, Clone, Default, Serialize)]
pub struct ScanStats {
    /// Total bytes scanned
    pub bytes_scanned: usize,

    /// Whether the file starts with the ULog magic
    pub has_magic: bool,

    /// Number of complete records found
    pub records_found: usize,

    /// Number of dropout markers among them
    pub dropouts_found: usize,

    /// Sum of all dropout durations in milliseconds
    pub dropout_ms: u64,

    /// Bytes after the last complete record
    pub trailing_bytes: usize,
}

impl ScanStats {
    /// Percentage of the bytes covered by the preamble and complete records
    pub fn coverage(&self) -> f64 {
        if self.bytes_scanned == 0 {
            0.0
        } else {
            let framed = self.bytes_scanned - self.trailing_bytes;
            (framed as f64 / self.bytes_scanned as f64) * 100.0
        }
    }
}

/// Scan a reconstructed log file: a 16-byte preamble followed by records
pub fn scan_log(data: &[u8]) -> (Vec<LocatedRecord>, ScanStats) {
    let mut stats = ScanStats {
        bytes_scanned: data.len(),
        has_magic: data.starts_with(ULOG_MAGIC),
        ..Default::default()
    };

    if data.len() < PREAMBLE_LEN {
        stats.trailing_bytes = data.len();
        return (Vec::new(), stats);
    }

    let mut results = Vec::new();
    let mut scanner = FrameScanner::new(&data[PREAMBLE_LEN..]);
    let mut offset = PREAMBLE_LEN;

    for frame in scanner.by_ref() {
        let record = Record::from_framed(Bytes::copy_from_slice(frame));
        if let Some(ms) = record.dropout_duration_ms() {
            stats.dropouts_found += 1;
            stats.dropout_ms += u64::from(ms);
        }
        results.push(LocatedRecord { offset, record });
        offset += frame.len();
    }

    stats.records_found = results.len();
    stats.trailing_bytes = scanner.remainder().len();

    #[cfg(feature = "logging")]
    debug!(
        "Scanned {} bytes: {} records, {} dropouts, {} trailing bytes",
        stats.bytes_scanned, stats.records_found, stats.dropouts_found, stats.trailing_bytes
    );

    (results, stats)
}
