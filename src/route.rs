//! Route model: an ordered, immutable-after-construction chain of segments.
//!
//! The route is supplied by an external loader as an ordered list of segment
//! endpoints (planar coordinates). Building the model computes each
//! segment's cumulative length position along the whole route in a single
//! forward pass; segment order never changes afterwards.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{AlignError, Result};
use crate::{IdSequence, PlanarPoint};

/// Segment endpoints handed to [`Route::build`].
///
/// The length defaults to the planar distance between the endpoints; a
/// loader that carries authoritative edge lengths can override it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SegmentInput {
    pub start: PlanarPoint,
    pub end: PlanarPoint,
    pub length: Option<f64>,
}

impl SegmentInput {
    /// Segment with length derived from its endpoints.
    pub fn new(start: PlanarPoint, end: PlanarPoint) -> Self {
        Self {
            start,
            end,
            length: None,
        }
    }

    /// Segment with an explicitly supplied length.
    pub fn with_length(start: PlanarPoint, end: PlanarPoint, length: f64) -> Self {
        Self {
            start,
            end,
            length: Some(length),
        }
    }
}

/// One finite straight-line piece of the selected route.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    /// Identifier from the sequence injected at build time
    pub id: u64,
    pub start: PlanarPoint,
    pub end: PlanarPoint,
    /// Planar segment length
    pub length: f64,
    /// Route-length position of the start node
    pub cumulative_start: f64,
    /// Route-length position of the end node; always `cumulative_start + length`
    pub cumulative_end: f64,
}

impl Segment {
    /// Point on the segment at fractional distribution `d` (0 = start node,
    /// 1 = end node).
    pub fn point_at(&self, distribution: f64) -> PlanarPoint {
        PlanarPoint::new(
            self.start.x + distribution * (self.end.x - self.start.x),
            self.start.y + distribution * (self.end.y - self.start.y),
        )
    }
}

/// An ordered, immutable chain of [`Segment`]s with precomputed cumulative
/// length positions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Route {
    segments: Vec<Segment>,
    /// Index-based lookup for reverse-direction counterpart segments
    reverse: HashMap<usize, usize>,
}

impl Route {
    /// Build a route from ordered segment endpoints.
    ///
    /// Cumulative positions are accumulated in one forward pass. Fails if
    /// any supplied segment length is negative. Zero-length segments are
    /// legal.
    pub fn build(inputs: &[SegmentInput], ids: &mut IdSequence) -> Result<Self> {
        let mut segments = Vec::with_capacity(inputs.len());
        let mut cumulative = 0.0;

        for (index, input) in inputs.iter().enumerate() {
            let length = input
                .length
                .unwrap_or_else(|| input.start.distance_to(input.end));
            if length < 0.0 {
                return Err(AlignError::NegativeSegmentLength { index, length });
            }

            let cumulative_start = cumulative;
            cumulative += length;

            segments.push(Segment {
                id: ids.next_id(),
                start: input.start,
                end: input.end,
                length,
                cumulative_start,
                cumulative_end: cumulative,
            });
        }

        Ok(Self {
            segments,
            reverse: HashMap::new(),
        })
    }

    /// Register reverse-direction counterpart pairs (both directions of the
    /// same physical road). Consumes the route so the relation is fixed
    /// together with the segment order.
    pub fn with_reverse_links(mut self, pairs: &[(usize, usize)]) -> Result<Self> {
        let segment_count = self.segments.len();
        for &(a, b) in pairs {
            for index in [a, b] {
                if index >= segment_count {
                    return Err(AlignError::UnknownSegment {
                        index,
                        segment_count,
                    });
                }
            }
            self.reverse.insert(a, b);
            self.reverse.insert(b, a);
        }
        Ok(self)
    }

    /// All segments in route order.
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Total route length.
    pub fn total_length(&self) -> f64 {
        self.segments.last().map_or(0.0, |s| s.cumulative_end)
    }

    /// First segment in route order whose cumulative end covers the given
    /// route-length position. `None` when the position lies past the route
    /// end (or the route is empty).
    pub fn segment_index_at(&self, length_pos: f64) -> Option<usize> {
        self.segments
            .iter()
            .position(|s| length_pos <= s.cumulative_end)
    }

    /// Reverse-direction counterpart of a segment, if one was registered.
    pub fn reverse_of(&self, index: usize) -> Option<usize> {
        self.reverse.get(&index).copied()
    }
}
