//! Integration tests for the complete chunk → track → reassemble → scan flow

use bytes::Bytes;
use ulogstream_core::{
    constants::{NO_RECORD_START, PREAMBLE_LEN, ULOG_MAGIC},
    scanner::scan_log,
    Chunk, Chunker, Record, Session, SessionConfig, StreamReassembler,
};

fn preamble() -> Vec<u8> {
    let mut p = ULOG_MAGIC.to_vec();
    p.push(1);
    p.extend_from_slice(&123_456u64.to_le_bytes());
    assert_eq!(p.len(), PREAMBLE_LEN);
    p
}

/// A log with a header section of format records followed by data records
fn sample_log(data_records: usize) -> (Vec<u8>, Vec<Record>) {
    let mut records = Vec::new();
    for i in 0..4 {
        let body = format!("format {}: uint64_t timestamp;float x;", i);
        records.push(Record::encode(b'F', body.as_bytes()).unwrap());
    }
    for i in 0..data_records {
        let body: Vec<u8> = (0..(i % 60 + 5)).map(|b| (b + i) as u8).collect();
        records.push(Record::encode(b'D', &body).unwrap());
    }

    let mut log = preamble();
    for r in &records {
        log.extend_from_slice(r.as_bytes());
    }
    (log, records)
}

fn replay(chunks: impl IntoIterator<Item = Chunk>) -> (Vec<u8>, ulogstream_core::SessionStats) {
    let mut session = Session::new(Vec::new(), SessionConfig::default());
    for chunk in chunks {
        session.handle_chunk(&chunk).unwrap();
    }
    session.finish().unwrap()
}

#[test]
fn test_clean_stream_reproduces_log() {
    let (log, _) = sample_log(200);
    let chunks = Chunker::new(Bytes::from(log.clone()), 249)
        .unwrap()
        .acked_chunks(1);

    let (output, stats) = replay(chunks);

    assert_eq!(output, log);
    assert_eq!(stats.chunks_dropped, 0);
    assert_eq!(stats.output.dropout_records, 0);
    assert_eq!(stats.pending_dropped, 0);
}

#[test]
fn test_duplicates_and_late_chunks_are_ignored() {
    let (log, _) = sample_log(100);
    let chunks: Vec<_> = Chunker::new(Bytes::from(log.clone()), 64)
        .unwrap()
        .acked_chunks(2)
        .collect();

    let mut noisy = Vec::new();
    for (i, chunk) in chunks.iter().enumerate() {
        noisy.push(chunk.clone());
        if i % 3 == 0 {
            noisy.push(chunk.clone());
        }
        if i > 2 && i % 5 == 0 {
            noisy.push(chunks[i - 2].clone());
        }
    }

    let (output, stats) = replay(noisy);

    assert_eq!(output, log);
    assert!(stats.duplicates > 0);
    assert!(stats.reordered > 0);
    assert_eq!(stats.chunks_accepted, chunks.len() as u64);
}

#[test]
fn test_stream_across_sequence_wrap() {
    let (log, _) = sample_log(300);
    let chunks = Chunker::new(Bytes::from(log.clone()), 100)
        .unwrap()
        .start_sequence(65530);

    let (output, stats) = replay(chunks);

    assert_eq!(output, log);
    assert_eq!(stats.chunks_dropped, 0);
}

#[test]
fn test_losses_keep_output_well_formed() {
    let (log, records) = sample_log(400);
    let chunks: Vec<_> = Chunker::new(Bytes::from(log), 80)
        .unwrap()
        .acked_chunks(1)
        .collect();

    // drop a single chunk and a burst of 30
    let lost: Vec<usize> = std::iter::once(10).chain(40..70).collect();
    let received = chunks
        .iter()
        .enumerate()
        .filter(|(i, _)| !lost.contains(i))
        .map(|(_, c)| c.clone());

    let (output, stats) = replay(received);
    let (located, scan) = scan_log(&output);

    assert_eq!(scan.trailing_bytes, 0);
    assert!(scan.has_magic);
    assert_eq!(stats.chunks_dropped, 31);
    assert_eq!(scan.dropouts_found, 2);
    assert_eq!(scan.dropout_ms, 10 + 250);

    // every surviving record is an original record, in order
    let mut originals = records.iter();
    for found in located.iter().filter(|l| !l.record.is_dropout()) {
        assert!(originals.any(|r| r == &found.record));
    }
}

#[test]
fn test_end_to_end_gap_with_continuation() {
    let rec1 = Record::encode(b'I', b"first record").unwrap();
    let rec2 = Record::encode(b'D', b"second record body").unwrap();

    let mut first = preamble();
    first.extend_from_slice(rec1.as_bytes());
    let chunk0 = Chunk::new(0, Bytes::from(first), PREAMBLE_LEN as u8);

    let tail = Bytes::copy_from_slice(&rec2.as_bytes()[6..]);
    let chunk2 = Chunk::new(2, tail, NO_RECORD_START);

    let (output, stats) = replay([chunk0, chunk2]);

    let mut expected = preamble();
    expected.extend_from_slice(rec1.as_bytes());
    expected.extend_from_slice(Record::dropout(10).as_bytes());
    assert_eq!(output, expected);
    assert_eq!(stats.chunks_dropped, 1);
    assert_eq!(stats.pending_dropped, 0);
}

#[test]
fn test_header_section_losses_are_not_marked() {
    let (log, _) = sample_log(50);
    let chunks: Vec<_> = Chunker::new(Bytes::from(log), 32)
        .unwrap()
        .acked_chunks(6)
        .collect();

    // lose an acknowledged chunk while still in the header section
    let received = chunks
        .iter()
        .enumerate()
        .filter(|(i, _)| *i != 3)
        .map(|(_, c)| c.clone());

    let (output, stats) = replay(received);
    let (_, scan) = scan_log(&output);

    assert_eq!(stats.chunks_dropped, 1);
    assert_eq!(scan.dropouts_found, 0);
    assert_eq!(scan.trailing_bytes, 0);
}

#[test]
fn test_reassembler_with_file_sink() {
    let (log, _) = sample_log(20);
    let mut reassembler = StreamReassembler::new(std::io::Cursor::new(Vec::new()));

    for chunk in Chunker::new(Bytes::from(log.clone()), 249).unwrap() {
        reassembler.ingest(&chunk.data, chunk.first_record_offset, 0).unwrap();
    }

    let (sink, _, dropped) = reassembler.finish().unwrap();
    assert_eq!(dropped, 0);
    assert_eq!(sink.into_inner(), log);
}
