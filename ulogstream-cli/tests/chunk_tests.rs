use std::fs;
use tempfile::tempdir;

use ulogstream_cli::capture::{read_capture, CaptureEntry};
use ulogstream_cli::commands::chunk::{self, ChunkOptions};
use ulogstream_core::{constants::PREAMBLE_LEN, ControlCommand, Record};

/// Helper: a log with a preamble and `count` data records
fn create_test_log(count: usize) -> Vec<u8> {
    let mut log = b"ULog\x01\x12\x35\x01".to_vec();
    log.extend_from_slice(&42u64.to_le_bytes());
    assert_eq!(log.len(), PREAMBLE_LEN);

    for i in 0..count {
        let body = format!("record number {}", i);
        log.extend_from_slice(Record::encode(b'D', body.as_bytes()).unwrap().as_bytes());
    }
    log
}

fn options(chunk_size: usize) -> ChunkOptions {
    ChunkOptions {
        chunk_size,
        ..Default::default()
    }
}

fn data_sequences(entries: &[CaptureEntry]) -> Vec<u16> {
    entries
        .iter()
        .filter_map(|e| match e {
            CaptureEntry::Data { sequence, .. } => Some(*sequence),
            _ => None,
        })
        .collect()
}

#[test]
fn test_chunk_basic() {
    let td = tempdir().unwrap();
    let input_path = td.path().join("input.ulg");
    let output_path = td.path().join("capture.jsonl");

    let log = create_test_log(20);
    fs::write(&input_path, &log).unwrap();

    let written = chunk::execute(
        input_path.to_str().unwrap(),
        output_path.to_str().unwrap(),
        &options(100),
    )
    .unwrap();

    let entries = read_capture(output_path.to_str().unwrap()).unwrap();
    assert_eq!(entries.len(), written);
    assert_eq!(
        entries[0],
        CaptureEntry::CommandAck {
            command: ControlCommand::StartLogging,
            result: 0
        }
    );

    let expected_chunks = log.len().div_ceil(100);
    assert_eq!(data_sequences(&entries).len(), expected_chunks);

    // The chunk payloads concatenate back to the log
    let mut joined = Vec::new();
    for entry in &entries {
        if let CaptureEntry::Data { data, .. } = entry {
            joined.extend(hex::decode(data).unwrap());
        }
    }
    assert_eq!(joined, log);
}

#[test]
fn test_chunk_drop_and_duplicate() {
    let td = tempdir().unwrap();
    let input_path = td.path().join("input.ulg");
    let output_path = td.path().join("capture.jsonl");
    fs::write(&input_path, create_test_log(40)).unwrap();

    let opts = ChunkOptions {
        chunk_size: 64,
        start_sequence: 10,
        drop: vec![12, 13],
        duplicate: vec![15],
        no_start_ack: true,
        ..Default::default()
    };
    chunk::execute(
        input_path.to_str().unwrap(),
        output_path.to_str().unwrap(),
        &opts,
    )
    .unwrap();

    let entries = read_capture(output_path.to_str().unwrap()).unwrap();
    let seqs = data_sequences(&entries);

    assert_eq!(seqs.len(), entries.len());
    assert_eq!(&seqs[..5], &[10, 11, 14, 15, 15]);
    assert!(!seqs.contains(&12));
    assert!(!seqs.contains(&13));
}

#[test]
fn test_chunk_acked_prefix() {
    let td = tempdir().unwrap();
    let input_path = td.path().join("input.ulg");
    let output_path = td.path().join("capture.jsonl");
    fs::write(&input_path, create_test_log(30)).unwrap();

    let opts = ChunkOptions {
        chunk_size: 50,
        acked_chunks: 3,
        ..Default::default()
    };
    chunk::execute(
        input_path.to_str().unwrap(),
        output_path.to_str().unwrap(),
        &opts,
    )
    .unwrap();

    let acked: Vec<bool> = read_capture(output_path.to_str().unwrap())
        .unwrap()
        .iter()
        .filter_map(|e| match e {
            CaptureEntry::Data { ack_required, .. } => Some(*ack_required),
            _ => None,
        })
        .collect();

    assert_eq!(&acked[..4], &[true, true, true, false]);
}

#[test]
fn test_chunk_rejects_bad_size() {
    let td = tempdir().unwrap();
    let input_path = td.path().join("input.ulg");
    let output_path = td.path().join("capture.jsonl");
    fs::write(&input_path, create_test_log(5)).unwrap();

    let result = chunk::execute(
        input_path.to_str().unwrap(),
        output_path.to_str().unwrap(),
        &options(300),
    );
    assert!(result.is_err());
    assert!(!output_path.exists());
}

#[test]
fn test_chunk_missing_input() {
    let td = tempdir().unwrap();
    let result = chunk::execute(
        td.path().join("missing.ulg").to_str().unwrap(),
        td.path().join("capture.jsonl").to_str().unwrap(),
        &options(249),
    );
    assert!(result.is_err());
}
