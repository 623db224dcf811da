//! Example reassembling a log streamed over a lossy, noisy link

use bytes::Bytes;
use ulogstream_core::{
    constants::{CHUNK_DATA_CAPACITY, PREAMBLE_LEN, ULOG_MAGIC},
    scanner::scan_log,
    Chunker, Record, Session, SessionConfig,
};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("ulogstream Lossy Link Example\n");

    // Step 1: Build a log with a definitions section and data records
    println!("Step 1: Building a log...");
    let mut log = ULOG_MAGIC.to_vec();
    log.resize(PREAMBLE_LEN, 0);
    for i in 0..10 {
        let format = format!("sensor_{}:uint64_t timestamp;float value;", i);
        log.extend_from_slice(Record::encode(b'F', format.as_bytes())?.as_bytes());
    }
    for i in 0..2000u32 {
        let mut body = i.to_le_bytes().to_vec();
        body.extend_from_slice(&(i as f32 * 0.5).to_le_bytes());
        log.extend_from_slice(Record::encode(b'D', &body)?.as_bytes());
    }
    println!("Log size: {} bytes\n", log.len());

    // Step 2: Chunk it the way the producer streams it
    let chunks: Vec<_> = Chunker::new(Bytes::from(log.clone()), CHUNK_DATA_CAPACITY)?
        .acked_chunks(3)
        .collect();
    println!("Step 2: Split into {} chunks\n", chunks.len());

    // Step 3: Simulate the link: drop a burst, duplicate and reorder a few
    println!("Step 3: Simulating link damage...");
    let mut received = Vec::new();
    for (i, chunk) in chunks.iter().enumerate() {
        if (100..140).contains(&i) || i == 17 {
            continue;
        }
        received.push(chunk.clone());
        if i % 25 == 0 {
            received.push(chunk.clone());
        }
        if i % 60 == 0 && i > 1 {
            received.push(chunks[i - 1].clone());
        }
    }
    println!("Delivered {} chunks\n", received.len());

    // Step 4: Reassemble
    println!("Step 4: Reassembling...");
    let mut session = Session::new(Vec::new(), SessionConfig::default());
    let mut acks = Vec::new();
    for chunk in &received {
        let disposition = session.handle_chunk(chunk)?;
        if let Some(seq) = disposition.ack {
            acks.push(seq);
        }
    }
    let (output, stats) = session.finish()?;

    println!("Acknowledged:      {:?}", acks);
    println!("Accepted chunks:   {}", stats.chunks_accepted);
    println!("Duplicates:        {}", stats.duplicates);
    println!("Reordered:         {}", stats.reordered);
    println!("Lost chunks:       {}", stats.chunks_dropped);
    println!("Dropout markers:   {}", stats.output.dropout_records);
    println!();

    // Step 5: Check the result is still a well-formed log
    let (records, scan) = scan_log(&output);
    println!("Step 5: Output has {} records ({} bytes)", records.len(), output.len());
    println!("Dropout time:      {} ms", scan.dropout_ms);
    println!("Trailing bytes:    {}", scan.trailing_bytes);

    Ok(())
}
