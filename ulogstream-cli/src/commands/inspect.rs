use anyhow::{Context, Result};
use colored::*;
use serde::Serialize;
use std::fs;
use tracing::info;
use ulogstream_core::scanner::{scan_log, ScanStats};

#[derive(Serialize)]
struct RecordEntry {
    offset: usize,
    type_tag: char,
    size: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    dropout_ms: Option<u16>,
}

#[derive(Serialize)]
struct InspectReport {
    stats: ScanStats,
    coverage: f64,
    records: Vec<RecordEntry>,
}

pub fn execute(input: &str, output: Option<&str>, list: bool) -> Result<ScanStats> {
    info!("Inspecting file: {}", input);

    let data = fs::read(input).with_context(|| format!("Failed to read input file: {}", input))?;

    info!("File size: {} bytes", data.len());

    let (located, stats) = scan_log(&data);

    println!("\n=== Log Structure ===");
    println!("Bytes scanned:     {} bytes", stats.bytes_scanned);
    if stats.has_magic {
        println!("ULog magic:        {}", "present".green());
    } else {
        println!("ULog magic:        {}", "missing".red());
    }
    println!("Records:           {}", stats.records_found);
    println!(
        "Dropout markers:   {} ({} ms)",
        stats.dropouts_found, stats.dropout_ms
    );
    if stats.trailing_bytes > 0 {
        println!(
            "Trailing bytes:    {}",
            stats.trailing_bytes.to_string().red()
        );
    }
    println!("Coverage:          {:.2}%", stats.coverage());
    println!();

    let records: Vec<RecordEntry> = located
        .iter()
        .map(|lr| RecordEntry {
            offset: lr.offset,
            type_tag: lr.record.type_tag() as char,
            size: lr.record.total_size(),
            dropout_ms: lr.record.dropout_duration_ms(),
        })
        .collect();

    if list {
        println!("=== Records ===");
        for r in &records {
            match r.dropout_ms {
                Some(ms) => println!(
                    "{} @ offset {}: dropout of {} ms",
                    "O".yellow(),
                    r.offset,
                    ms
                ),
                None => println!("{} @ offset {}: {} bytes", r.type_tag, r.offset, r.size),
            }
        }
    }

    if stats.has_magic && stats.trailing_bytes == 0 {
        println!("{} Log is well-formed", "✓".green());
    } else {
        println!("{} Log is not well-formed", "✗".red());
    }

    if let Some(output_path) = output {
        let report = InspectReport {
            coverage: stats.coverage(),
            stats: stats.clone(),
            records,
        };
        let json = serde_json::to_string_pretty(&report)
            .with_context(|| "Failed to serialize inspection report")?;

        fs::write(output_path, json)
            .with_context(|| format!("Failed to write output file: {}", output_path))?;

        info!("Report written to: {}", output_path);
    }

    Ok(stats)
}
