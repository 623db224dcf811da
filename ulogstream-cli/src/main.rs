use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use ulogstream_cli::commands::{self, chunk::ChunkOptions};
use ulogstream_core::constants::CHUNK_DATA_CAPACITY;

#[derive(Parser)]
#[command(name = "ulogstream")]
#[command(about = "ulogstream - Reassemble ULog files from lossy chunk streams", long_about = None)]
#[command(version)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Reassemble a log from a chunk capture
    Reassemble {
        /// Input capture file (JSON lines, "-" for stdin)
        #[arg(short, long)]
        input: String,

        /// Output log file, or a directory for a timestamped name
        #[arg(short, long)]
        output: String,

        /// Give up if streaming has not started after this many milliseconds
        #[arg(long, default_value = "4000")]
        start_timeout_ms: u64,

        /// Write session statistics as JSON
        #[arg(long)]
        stats_json: Option<String>,
    },

    /// Inspect the record structure of a log file
    Inspect {
        /// Input log file
        #[arg(short, long)]
        input: String,

        /// Output JSON file for the report
        #[arg(short, long)]
        output: Option<String>,

        /// List every record
        #[arg(long)]
        list: bool,
    },

    /// Split a log file into a chunk capture
    Chunk {
        /// Input log file
        #[arg(short, long)]
        input: String,

        /// Output capture file
        #[arg(short, long)]
        output: String,

        /// Chunk payload size
        #[arg(long, default_value_t = CHUNK_DATA_CAPACITY)]
        chunk_size: usize,

        /// Sequence number of the first chunk
        #[arg(long, default_value = "0")]
        start_seq: u16,

        /// Number of leading chunks that require an acknowledgement
        #[arg(long, default_value = "0")]
        acked: usize,

        /// Sequence numbers to drop
        #[arg(long, value_delimiter = ',')]
        drop: Vec<u16>,

        /// Sequence numbers to duplicate
        #[arg(long, value_delimiter = ',')]
        duplicate: Vec<u16>,

        /// Do not emit a start acknowledgement
        #[arg(long)]
        no_start_ack: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();

    match cli.command {
        Commands::Reassemble {
            input,
            output,
            start_timeout_ms,
            stats_json,
        } => commands::reassemble::execute(&input, &output, start_timeout_ms, stats_json.as_deref())
            .map(|_| ()),

        Commands::Inspect {
            input,
            output,
            list,
        } => commands::inspect::execute(&input, output.as_deref(), list).map(|_| ()),

        Commands::Chunk {
            input,
            output,
            chunk_size,
            start_seq,
            acked,
            drop,
            duplicate,
            no_start_ack,
        } => {
            let options = ChunkOptions {
                chunk_size,
                start_sequence: start_seq,
                acked_chunks: acked,
                drop,
                duplicate,
                no_start_ack,
            };
            commands::chunk::execute(&input, &output, &options).map(|_| ())
        }
    }
}
