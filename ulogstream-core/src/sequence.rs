//! Sequence number tracking for the chunk stream
//!
//! Chunks carry a 16-bit wrapping counter. A number is considered newer than
//! the last accepted one when it lies less than half the sequence space ahead;
//! anything else is a duplicate or a late arrival from before the last one.

use crate::constants::{SEQUENCE_HALF_RANGE, SEQUENCE_SPACE};

/// How an incoming sequence number relates to the stream so far
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SequenceVerdict {
    /// Newer than the last accepted chunk, with `missing` chunks skipped
    Fresh {
        /// Number of chunks lost between the last accepted one and this one
        missing: u32,
    },
    /// Same number as the last accepted chunk
    Duplicate,
    /// Older than the last accepted chunk
    Reordered,
}

impl SequenceVerdict {
    /// Whether the chunk should be processed
    pub fn is_fresh(&self) -> bool {
        matches!(self, SequenceVerdict::Fresh { .. })
    }

    /// Number of chunks missing before this one (0 unless fresh)
    pub fn missing(&self) -> u32 {
        match self {
            SequenceVerdict::Fresh { missing } => *missing,
            _ => 0,
        }
    }
}

/// Tracks the last accepted sequence number
#[derive(Debug, Clone, Default)]
pub struct SequenceTracker {
    last_accepted: Option<u16>,
}

impl SequenceTracker {
    /// Create a tracker that has not seen any chunk yet
    pub fn new() -> Self {
        Self::default()
    }

    /// Last accepted sequence number
    pub fn last_accepted(&self) -> Option<u16> {
        self.last_accepted
    }

    /// Classify `seq`, recording it as the last accepted number when fresh
    pub fn classify(&mut self, seq: u16) -> SequenceVerdict {
        let verdict = match self.last_accepted {
            None => SequenceVerdict::Fresh { missing: 0 },
            Some(last) => compare(last, seq),
        };

        if verdict.is_fresh() {
            self.last_accepted = Some(seq);
        }

        verdict
    }

    /// Classify `seq`, returning `(is_fresh, missing_count)`
    pub fn accept(&mut self, seq: u16) -> (bool, u32) {
        let verdict = self.classify(seq);
        (verdict.is_fresh(), verdict.missing())
    }
}

fn compare(last: u16, seq: u16) -> SequenceVerdict {
    if seq == last {
        return SequenceVerdict::Duplicate;
    }

    if seq > last {
        let ahead = seq - last;
        if ahead >= SEQUENCE_HALF_RANGE {
            // A value this far ahead is an old one from before a wrap
            SequenceVerdict::Reordered
        } else {
            SequenceVerdict::Fresh {
                missing: u32::from(ahead) - 1,
            }
        }
    } else if last - seq > SEQUENCE_HALF_RANGE {
        SequenceVerdict::Fresh {
            missing: SEQUENCE_SPACE - u32::from(last) - 1 + u32::from(seq),
        }
    } else {
        SequenceVerdict::Reordered
    }
}
