//! # Route Aligner
//!
//! Deterministic alignment of a time-ordered GPS trace onto a pre-selected,
//! ordered chain of road segments, plus time-based projection of external
//! measurement samples onto the aligned route.
//!
//! This library provides:
//! - Segment matching via a forward-only windowed search with an outer
//!   lookahead-window optimization ([`matcher`])
//! - A single-pass monotonic-reordering correction that repairs local
//!   backtracking in the matched position sequence ([`reorder`])
//! - Temporal projection of independently time-stamped samples onto
//!   route-length positions ([`samples`])
//!
//! The route is given, not computed: routing, online matching and
//! probabilistic matching are explicitly out of scope.
//!
//! ## Quick Start
//!
//! ```rust
//! use route_aligner::{
//!     match_trace, Fix, IdSequence, MatchControl, MatcherConfig, PlanarPoint, Route,
//!     SegmentInput, Trace,
//! };
//!
//! // A route of two collinear segments, already in planar coordinates.
//! let mut ids = IdSequence::new();
//! let route = Route::build(
//!     &[
//!         SegmentInput::new(PlanarPoint::new(0.0, 0.0), PlanarPoint::new(10.0, 0.0)),
//!         SegmentInput::new(PlanarPoint::new(10.0, 0.0), PlanarPoint::new(20.0, 0.0)),
//!     ],
//!     &mut ids,
//! )
//! .unwrap();
//!
//! // A short trace with strictly increasing timestamps.
//! let trace = Trace::build(vec![
//!     Fix::new(1.0, 0.5, 0, 0.0, 0.0),
//!     Fix::new(12.0, -0.5, 1, 0.0, 0.0),
//! ]);
//!
//! let control = MatchControl::new();
//! let alignment = match_trace(&route, &trace, &MatcherConfig::default(), &control).unwrap();
//! assert!(alignment.matches.iter().all(|m| m.is_matched()));
//! ```

use serde::{Deserialize, Serialize};

// Unified error handling
pub mod error;
pub use error::{AlignError, Result};

// Route model: ordered segment chain with cumulative length positions
pub mod route;
pub use route::{Route, Segment, SegmentInput};

// Trace model: time-ordered fixes and their per-fix match state
pub mod trace;
pub use trace::{Fix, FixMatch, MatchedPosition, ReorderedPosition, Trace};

// Point-to-segment projection (pure geometry)
pub mod projection;
pub use projection::{distance_to_segment, project_onto_segment, SegmentProjection};

// Run/pause/cancel flag shared with a driving caller
pub mod control;
pub use control::{MatchControl, MatchStatus};

// Segment matcher: windowed forward search with lookahead optimization
pub mod matcher;
pub use matcher::{
    commit_window, evaluate_window, flag_duplicate_positions, match_trace, MatcherConfig,
    RouteAlignment, SegmentMatchGroup,
};

// Monotonic-reordering correction
pub mod reorder;
pub use reorder::{reorder_alignment, ReorderConfig};

// Temporal projection of external samples
pub mod samples;
pub use samples::{project_samples, CellIdentity, ExternalSample, LinkMetrics, SampleProjection};

// ============================================================================
// Core Types
// ============================================================================

/// A position in planar coordinates (already projected from lon/lat).
///
/// # Example
/// ```
/// use route_aligner::PlanarPoint;
/// let point = PlanarPoint::new(1250.0, -340.5);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlanarPoint {
    pub x: f64,
    pub y: f64,
}

impl PlanarPoint {
    /// Create a new planar point.
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Check that both coordinates are finite.
    pub fn is_valid(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }

    /// Planar (Euclidean) distance to another point.
    pub fn distance_to(&self, other: PlanarPoint) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

impl From<PlanarPoint> for geo::Coord<f64> {
    fn from(p: PlanarPoint) -> Self {
        geo::Coord { x: p.x, y: p.y }
    }
}

impl From<PlanarPoint> for geo::Point<f64> {
    fn from(p: PlanarPoint) -> Self {
        geo::Point::new(p.x, p.y)
    }
}

/// Monotonic identifier source injected into model construction.
///
/// Segments receive their identifiers from a caller-owned sequence instead
/// of a process-wide counter, so repeated runs stay reproducible and
/// independent pipelines never share identifier state.
#[derive(Debug, Default)]
pub struct IdSequence {
    next: u64,
}

impl IdSequence {
    /// Create a sequence starting at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a sequence starting at an arbitrary value.
    pub fn starting_at(first: u64) -> Self {
        Self { next: first }
    }

    /// Hand out the next identifier.
    pub fn next_id(&mut self) -> u64 {
        let id = self.next;
        self.next += 1;
        id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_planar_point_validation() {
        assert!(PlanarPoint::new(1.0, -2.0).is_valid());
        assert!(!PlanarPoint::new(f64::NAN, 0.0).is_valid());
        assert!(!PlanarPoint::new(0.0, f64::INFINITY).is_valid());
    }

    #[test]
    fn test_planar_distance() {
        let a = PlanarPoint::new(0.0, 0.0);
        let b = PlanarPoint::new(3.0, 4.0);
        assert!((a.distance_to(b) - 5.0).abs() < 1e-12);
    }

    #[test]
    fn test_id_sequence() {
        let mut ids = IdSequence::starting_at(7);
        assert_eq!(ids.next_id(), 7);
        assert_eq!(ids.next_id(), 8);
        assert_eq!(IdSequence::new().next_id(), 0);
    }
}
