//! Nearest-point projection onto a finite segment.
//!
//! Pure geometry shared by the segment matcher (initial matching) and the
//! reorderer (corrected coordinates). The projection parameter is clamped
//! to `[0, 1]`: points projecting before the start or past the end snap to
//! the corresponding endpoint.

use geo::{EuclideanDistance, Line, Point};
use serde::{Deserialize, Serialize};

use crate::route::Segment;
use crate::PlanarPoint;

/// Result of projecting a point onto a segment.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SegmentProjection {
    /// Nearest point on the segment
    pub point: PlanarPoint,
    /// Clamped projection parameter in `[0, 1]` (0 = start node, 1 = end node)
    pub distribution: f64,
    /// Planar distance from the input point to the nearest point
    pub distance: f64,
}

/// Project a point onto the finite segment between the segment's endpoints.
///
/// A zero-length segment yields distribution 0 and the start node as the
/// nearest point, never a NaN.
pub fn project_onto_segment(point: PlanarPoint, segment: &Segment) -> SegmentProjection {
    let dx = segment.end.x - segment.start.x;
    let dy = segment.end.y - segment.start.y;
    let len_sq = dx * dx + dy * dy;

    let distribution = if len_sq == 0.0 {
        0.0
    } else {
        let t = ((point.x - segment.start.x) * dx + (point.y - segment.start.y) * dy) / len_sq;
        t.clamp(0.0, 1.0)
    };

    let nearest = segment.point_at(distribution);
    SegmentProjection {
        point: nearest,
        distribution,
        distance: point.distance_to(nearest),
    }
}

/// Planar distance from a point to the finite segment.
pub fn distance_to_segment(point: PlanarPoint, segment: &Segment) -> f64 {
    if segment.start == segment.end {
        return point.distance_to(segment.start);
    }
    let line = Line::new(
        geo::Coord::from(segment.start),
        geo::Coord::from(segment.end),
    );
    Point::from(point).euclidean_distance(&line)
}
