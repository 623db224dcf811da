//! Append-only output for the reconstructed log

use crate::error::StreamError;

/// Destination of the reconstructed byte stream.
///
/// Writes must complete before the next chunk is processed so that the byte
/// order of the output matches the logical record order.
pub trait OutputSink {
    /// Append `bytes` to the output
    fn write_bytes(&mut self, bytes: &[u8]) -> Result<(), StreamError>;

    /// Flush buffered output
    fn flush_output(&mut self) -> Result<(), StreamError> {
        Ok(())
    }
}

#[cfg(feature = "std")]
impl<W: std::io::Write> OutputSink for W {
    fn write_bytes(&mut self, bytes: &[u8]) -> Result<(), StreamError> {
        self.write_all(bytes)?;
        Ok(())
    }

    fn flush_output(&mut self) -> Result<(), StreamError> {
        self.flush()?;
        Ok(())
    }
}

#[cfg(not(feature = "std"))]
impl OutputSink for alloc::vec::Vec<u8> {
    fn write_bytes(&mut self, bytes: &[u8]) -> Result<(), StreamError> {
        self.extend_from_slice(bytes);
        Ok(())
    }
}
