//! Library entry for ulogstream-cli used by integration tests and embedding.

pub mod capture;
pub mod commands;

// Re-export commands for convenience
pub use commands::*;
