use crate::capture::{read_capture, CaptureReplay};
use anyhow::{Context, Result};
use chrono::Local;
use colored::*;
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;
use ulogstream_core::{run_session, SessionConfig, SessionStats};

/// Pick the output file: `output` itself, or a timestamped name inside it
/// when it is a directory
pub fn resolve_output(output: &str) -> PathBuf {
    let path = Path::new(output);
    if path.is_dir() {
        let name = Local::now().format("%Y-%m-%d_%H-%M-%S.ulg").to_string();
        path.join(name)
    } else {
        path.to_path_buf()
    }
}

pub fn execute(
    input: &str,
    output: &str,
    start_timeout_ms: u64,
    stats_json: Option<&str>,
) -> Result<SessionStats> {
    info!("Replaying capture: {}", input);

    let entries = read_capture(input)?;
    info!("Capture entries: {}", entries.len());
    let mut link = CaptureReplay::new(entries)?;

    let output_path = resolve_output(output);
    let file = File::create(&output_path)
        .with_context(|| format!("Failed to create output file: {}", output_path.display()))?;

    info!("Opening {}", output_path.display());

    let config = SessionConfig::new().start_timeout(Duration::from_millis(start_timeout_ms));
    let (writer, stats) = run_session(&mut link, BufWriter::new(file), config, || false)
        .context("Streaming session failed")?;

    writer
        .into_inner()
        .map_err(|e| e.into_error())
        .context("Failed to flush output file")?;

    println!("\n=== Reassembly Results ===");
    println!("Chunks received:   {}", stats.chunks_received);
    println!("Chunks accepted:   {}", stats.chunks_accepted.to_string().green());
    println!("Duplicates:        {}", stats.duplicates);
    println!("Reordered:         {}", stats.reordered);
    if stats.chunks_dropped > 0 {
        println!("Chunks dropped:    {}", stats.chunks_dropped.to_string().red());
    } else {
        println!("Chunks dropped:    {}", "0".green());
    }
    println!("Acks sent:         {}", link.acks().len());
    println!("Records written:   {}", stats.output.records_written);
    println!(
        "Dropout markers:   {} ({} ms)",
        stats.output.dropout_records, stats.output.dropout_ms
    );
    println!("Bytes written:     {} bytes", stats.output.bytes_written);
    println!();

    if let Some(stats_path) = stats_json {
        let json = serde_json::to_string_pretty(&stats)
            .with_context(|| "Failed to serialize session statistics")?;

        fs::write(stats_path, json)
            .with_context(|| format!("Failed to write statistics file: {}", stats_path))?;

        info!("Statistics written to: {}", stats_path);
    }

    Ok(stats)
}
