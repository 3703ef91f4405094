//! Unified error handling for the route-aligner library.
//!
//! Malformed input never aborts the pipeline: non-increasing timestamps are
//! dropped at trace construction, unmatchable samples stay unmatched, and
//! degenerate geometry falls back to boundary values. The few conditions
//! that are genuine errors (malformed model input, bad configuration,
//! cancellation) are reported through this type.

use std::fmt;

/// Unified error type for route-aligner operations.
#[derive(Debug, Clone, PartialEq)]
pub enum AlignError {
    /// A route segment was supplied with a negative length
    NegativeSegmentLength { index: usize, length: f64 },
    /// A segment index referenced a segment the route does not contain
    UnknownSegment { index: usize, segment_count: usize },
    /// Configuration error
    ConfigError { message: String },
    /// The run was cancelled through its control flag
    Cancelled,
}

impl fmt::Display for AlignError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AlignError::NegativeSegmentLength { index, length } => {
                write!(f, "Segment {} has negative length {:.3}", index, length)
            }
            AlignError::UnknownSegment {
                index,
                segment_count,
            } => {
                write!(
                    f,
                    "Segment index {} out of range (route has {} segments)",
                    index, segment_count
                )
            }
            AlignError::ConfigError { message } => {
                write!(f, "Configuration error: {}", message)
            }
            AlignError::Cancelled => write!(f, "Matching run was cancelled"),
        }
    }
}

impl std::error::Error for AlignError {}

/// Result type alias for route-aligner operations.
pub type Result<T> = std::result::Result<T, AlignError>;
