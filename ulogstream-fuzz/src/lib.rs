//! Fuzzing entry points for ulogstream-core
//!
//! To use with cargo-fuzz:
//! 1. Install cargo-fuzz: cargo install cargo-fuzz
//! 2. Run fuzzer: cargo fuzz run fuzz_ingest

use bytes::Bytes;
use ulogstream_core::{Chunk, Session, SessionConfig};

pub fn fuzz_scan(data: &[u8]) {
    use ulogstream_core::scanner::{scan, scan_log};

    // Try to scan - should never panic
    let _ = scan(data);
    let _ = scan_log(data);
}

/// Interpret `data` as a stream of `[seq_lo, seq_hi, offset, len, payload..]`
/// chunk headers and feed them through a session
pub fn fuzz_ingest(data: &[u8]) {
    let mut session = Session::new(Vec::new(), SessionConfig::default());
    let mut rest = data;

    while rest.len() >= 4 {
        let sequence = u16::from_le_bytes([rest[0], rest[1]]);
        let offset = rest[2];
        let len = (rest[3] as usize).min(rest.len() - 4);
        let payload = Bytes::copy_from_slice(&rest[4..4 + len]);
        rest = &rest[4 + len..];

        let chunk = Chunk::new(sequence, payload, offset);
        if session.handle_chunk(&chunk).is_err() {
            return;
        }
    }

    let _ = session.finish();
}
