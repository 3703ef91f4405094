//! Trace model: a time-ordered sequence of GPS fixes and their match state.
//!
//! Fixes arrive from an external loader already converted to planar
//! coordinates. Construction keeps only fixes whose timestamp is strictly
//! greater than the previous accepted fix; the time-based interpolation in
//! [`crate::samples`] relies on that ordering discipline.
//!
//! Match state lives in a single [`FixMatch`] type with tagged optional
//! matched and reordered parts, so every consumer can ask "is this
//! reordered?" generically and prefer the corrected values when present.

use log::debug;
use serde::{Deserialize, Serialize};

use crate::PlanarPoint;

/// A single time-stamped GPS position reading. Immutable once created.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Fix {
    /// Planar position (projected from lon/lat by an external utility)
    pub position: PlanarPoint,
    /// Timestamp, strictly increasing within a trace. Unit-agnostic as long
    /// as all timestamps (including external samples) share it.
    pub timestamp: i64,
    /// Source longitude, kept for re-export
    pub lon: f64,
    /// Source latitude, kept for re-export
    pub lat: f64,
}

impl Fix {
    pub fn new(x: f64, y: f64, timestamp: i64, lon: f64, lat: f64) -> Self {
        Self {
            position: PlanarPoint::new(x, y),
            timestamp,
            lon,
            lat,
        }
    }
}

/// An ordered sequence of accepted fixes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trace {
    fixes: Vec<Fix>,
}

impl Trace {
    /// Build a trace, silently dropping any fix whose timestamp is not
    /// strictly greater than the previous accepted fix's timestamp.
    pub fn build(fixes: Vec<Fix>) -> Self {
        let mut accepted: Vec<Fix> = Vec::with_capacity(fixes.len());
        let mut dropped = 0usize;

        for fix in fixes {
            match accepted.last() {
                Some(prev) if fix.timestamp <= prev.timestamp => dropped += 1,
                _ => accepted.push(fix),
            }
        }

        if dropped > 0 {
            debug!(
                "[Trace] Dropped {} fixes with non-increasing timestamps ({} kept)",
                dropped,
                accepted.len()
            );
        }

        Self { fixes: accepted }
    }

    pub fn fixes(&self) -> &[Fix] {
        &self.fixes
    }

    pub fn fix(&self, index: usize) -> Option<&Fix> {
        self.fixes.get(index)
    }

    pub fn len(&self) -> usize {
        self.fixes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fixes.is_empty()
    }
}

/// Matched state written by the segment matcher.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MatchedPosition {
    /// Index of the assigned segment in route order
    pub segment: usize,
    /// Nearest point on the assigned segment
    pub point: PlanarPoint,
    /// Fractional distribution along the segment, in `[0, 1]`
    pub distribution: f64,
    /// Planar distance from the fix to the matched point
    pub distance: f64,
    /// Route-length position: `cumulative_start + distribution * length`
    pub length_pos: f64,
}

/// Corrected state written by the reorderer for fixes inside a repaired
/// region. Downstream consumers must prefer these values when present.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReorderedPosition {
    pub segment: usize,
    pub point: PlanarPoint,
    pub distribution: f64,
    pub length_pos: f64,
}

/// Per-fix derived match state, parallel to the trace's fix order.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FixMatch {
    /// Present once the matcher has committed this fix
    pub matched: Option<MatchedPosition>,
    /// Present when the reorderer corrected this fix
    pub reordered: Option<ReorderedPosition>,
    /// False when a temporally-adjacent fix landed on the exact same
    /// matched coordinates (duplicate suppression for one-point-per-location
    /// consumers; the fix itself is never discarded)
    pub unique_position: bool,
}

impl FixMatch {
    /// State of a fix nothing has been committed for.
    pub fn unmatched() -> Self {
        Self {
            matched: None,
            reordered: None,
            unique_position: true,
        }
    }

    pub fn is_matched(&self) -> bool {
        self.matched.is_some()
    }

    pub fn is_reordered(&self) -> bool {
        self.reordered.is_some()
    }

    /// Route-length position, corrected value preferred.
    pub fn length_pos(&self) -> Option<f64> {
        self.reordered
            .map(|r| r.length_pos)
            .or(self.matched.map(|m| m.length_pos))
    }

    /// Matched coordinates, corrected value preferred.
    pub fn matched_point(&self) -> Option<PlanarPoint> {
        self.reordered
            .map(|r| r.point)
            .or(self.matched.map(|m| m.point))
    }

    /// Fractional distribution, corrected value preferred.
    pub fn distribution(&self) -> Option<f64> {
        self.reordered
            .map(|r| r.distribution)
            .or(self.matched.map(|m| m.distribution))
    }

    /// Owning segment index, corrected value preferred.
    pub fn segment(&self) -> Option<usize> {
        self.reordered
            .map(|r| r.segment)
            .or(self.matched.map(|m| m.segment))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trace_drops_non_increasing_timestamps() {
        let trace = Trace::build(vec![
            Fix::new(0.0, 0.0, 10, 0.0, 0.0),
            Fix::new(1.0, 0.0, 10, 0.0, 0.0), // equal, dropped
            Fix::new(2.0, 0.0, 9, 0.0, 0.0),  // backwards, dropped
            Fix::new(3.0, 0.0, 11, 0.0, 0.0),
        ]);

        assert_eq!(trace.len(), 2);
        assert_eq!(trace.fix(0).unwrap().timestamp, 10);
        assert_eq!(trace.fix(1).unwrap().timestamp, 11);
    }

    #[test]
    fn test_fix_match_prefers_reordered_values() {
        let matched = MatchedPosition {
            segment: 0,
            point: PlanarPoint::new(1.0, 0.0),
            distribution: 0.1,
            distance: 0.5,
            length_pos: 1.0,
        };
        let mut fix_match = FixMatch {
            matched: Some(matched),
            reordered: None,
            unique_position: true,
        };
        assert_eq!(fix_match.length_pos(), Some(1.0));
        assert_eq!(fix_match.segment(), Some(0));

        fix_match.reordered = Some(ReorderedPosition {
            segment: 1,
            point: PlanarPoint::new(12.0, 0.0),
            distribution: 0.2,
            length_pos: 12.0,
        });
        assert_eq!(fix_match.length_pos(), Some(12.0));
        assert_eq!(fix_match.segment(), Some(1));
        assert_eq!(fix_match.matched_point(), Some(PlanarPoint::new(12.0, 0.0)));
        assert!(fix_match.is_reordered());
    }

    #[test]
    fn test_unmatched_state() {
        let m = FixMatch::unmatched();
        assert!(!m.is_matched());
        assert_eq!(m.length_pos(), None);
        assert!(m.unique_position);
    }
}
