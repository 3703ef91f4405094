//! Monotonic reordering of matched positions.
//!
//! GPS jitter near slow movement or segment boundaries can match a run of
//! fixes backwards along the route even though travel only moves forward.
//! The reorderer detects such regions in the matched route-length positions
//! and linearly redistributes the affected fixes between the region's
//! observed bounds, restoring non-decreasing order without discarding any
//! fix.
//!
//! Detection scans the ORIGINAL matched positions only, so running the pass
//! again detects the same regions and recomputes identical corrections.

use log::{debug, info};

use crate::matcher::{flag_duplicate_positions, RouteAlignment};
use crate::route::Route;
use crate::trace::ReorderedPosition;

/// Configuration for out-of-order region detection.
#[derive(Debug, Clone)]
pub struct ReorderConfig {
    /// Consecutive positions past the region's committed maximum required
    /// before the region may close. Default: 10
    pub recovery_count: u32,
    /// A region closes only once the distance travelled past its minimum
    /// exceeds the region span times this factor. Default: 2.0
    pub span_multiplier: f64,
}

impl Default for ReorderConfig {
    fn default() -> Self {
        Self {
            recovery_count: 10,
            span_multiplier: 2.0,
        }
    }
}

/// An out-of-order region being tracked during the scan.
struct Region {
    /// Smallest position seen inside the region
    min_pos: f64,
    /// Committed maximum: the running maximum at the time the current
    /// minimum was set
    max_pos: f64,
    /// Largest position seen since the region opened
    running_max: f64,
    /// Consecutive positions beyond the committed maximum
    recovery: u32,
}

/// Detect out-of-order regions in the alignment's matched positions and
/// write corrected [`ReorderedPosition`]s for the affected fixes, then
/// rebuild segment assignment for every match from its effective position.
/// Returns the number of fixes that received a correction.
///
/// A trace with any unmatched fix is left untouched. Re-running on an
/// already-corrected alignment recomputes the same corrections.
pub fn reorder_alignment(
    route: &Route,
    alignment: &mut RouteAlignment,
    config: &ReorderConfig,
) -> usize {
    let positions: Option<Vec<f64>> = alignment
        .matches
        .iter()
        .map(|m| m.matched.map(|p| p.length_pos))
        .collect();
    let positions = match positions {
        Some(p) if !p.is_empty() => p,
        _ => {
            debug!("[Reorder] Skipping: trace has unmatched fixes or is empty");
            return 0;
        }
    };

    let mut corrected: Vec<Option<f64>> = vec![None; positions.len()];
    let mut region: Option<Region> = None;
    let mut prev: Option<f64> = None;

    for (index, &pos) in positions.iter().enumerate() {
        if let Some(r) = region.as_mut() {
            if pos > r.running_max {
                r.running_max = pos;
            }
            if pos < r.min_pos {
                r.min_pos = pos;
                r.max_pos = r.running_max;
            }
            if pos > r.max_pos {
                r.recovery += 1;
            } else {
                r.recovery = 0;
            }

            let span = r.max_pos - r.min_pos;
            if r.recovery >= config.recovery_count
                && span * config.span_multiplier < pos - r.min_pos
            {
                debug!(
                    "[Reorder] Closing region [{:.3}, {:.3}] at fix {}",
                    r.min_pos, r.max_pos, index
                );
                redistribute(&positions, &mut corrected, r.min_pos, r.max_pos);
                region = None;
            }
        } else if let Some(prev_pos) = prev {
            if pos < prev_pos {
                region = Some(Region {
                    min_pos: pos,
                    max_pos: prev_pos,
                    running_max: prev_pos,
                    recovery: 0,
                });
            }
        }
        prev = Some(pos);
    }
    // A region still open at the trace end never confirmed recovery; its
    // fixes keep their original matched positions.

    let reordered = corrected.iter().filter(|c| c.is_some()).count();
    rebuild_assignments(route, alignment, &corrected);
    flag_duplicate_positions(&mut alignment.matches);

    if reordered > 0 {
        info!(
            "[Reorder] Corrected {} of {} matched positions",
            reordered,
            positions.len()
        );
    }
    reordered
}

/// Linearly redistribute the fixes covered by a closed region between its
/// bounds: the covered range runs from the first fix strictly past the
/// minimum to the last fix strictly before the maximum.
fn redistribute(positions: &[f64], corrected: &mut [Option<f64>], min_pos: f64, max_pos: f64) {
    let first = match positions.iter().position(|&p| p > min_pos) {
        Some(i) => i,
        None => return,
    };
    let last = match positions.iter().rposition(|&p| p < max_pos) {
        Some(i) => i,
        None => return,
    };
    if last < first {
        return;
    }

    let step = if last > first {
        (max_pos - min_pos) / (last - first) as f64
    } else {
        0.0
    };
    for (offset, slot) in corrected[first..=last].iter_mut().enumerate() {
        *slot = Some(min_pos + step * offset as f64);
    }
}

/// Reassign every match to the segment covering its effective position and
/// write [`ReorderedPosition`]s for corrected fixes. Group membership is
/// rebuilt from scratch.
fn rebuild_assignments(
    route: &Route,
    alignment: &mut RouteAlignment,
    corrected: &[Option<f64>],
) {
    let RouteAlignment {
        matches, groups, ..
    } = alignment;

    for group in groups.iter_mut() {
        group.clear();
    }

    for (index, m) in matches.iter_mut().enumerate() {
        let matched = match m.matched.as_mut() {
            Some(p) => p,
            None => continue,
        };
        let target = corrected[index].unwrap_or(matched.length_pos);
        let segment_index = match route.segment_index_at(target) {
            Some(i) => i,
            None => continue,
        };
        groups[segment_index].record(index);

        match corrected[index] {
            Some(length_pos) => {
                let segment = &route.segments()[segment_index];
                let distribution = if segment.length > 0.0 {
                    (length_pos - segment.cumulative_start) / segment.length
                } else {
                    0.0
                };
                m.reordered = Some(ReorderedPosition {
                    segment: segment_index,
                    point: segment.point_at(distribution),
                    distribution,
                    length_pos,
                });
            }
            None => {
                matched.segment = segment_index;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::control::MatchControl;
    use crate::matcher::{match_trace, MatcherConfig, SegmentMatchGroup};
    use crate::trace::{FixMatch, MatchedPosition, Trace};
    use crate::{Fix, IdSequence, PlanarPoint, SegmentInput};

    fn straight_route(lengths: &[f64]) -> Route {
        let mut ids = IdSequence::new();
        let mut inputs = Vec::new();
        let mut x = 0.0;
        for &len in lengths {
            inputs.push(SegmentInput::new(
                PlanarPoint::new(x, 0.0),
                PlanarPoint::new(x + len, 0.0),
            ));
            x += len;
        }
        Route::build(&inputs, &mut ids).unwrap()
    }

    /// Alignment whose matched route-length positions are exactly the
    /// given values. The forward-only matcher cannot produce backward
    /// positions across segment boundaries, so these are built directly.
    fn aligned(route: &Route, positions: &[f64]) -> RouteAlignment {
        let mut matches = Vec::with_capacity(positions.len());
        let mut groups: Vec<SegmentMatchGroup> =
            (0..route.len()).map(SegmentMatchGroup::new).collect();

        for (index, &pos) in positions.iter().enumerate() {
            let segment_index = route.segment_index_at(pos).unwrap();
            let segment = &route.segments()[segment_index];
            let distribution = if segment.length > 0.0 {
                (pos - segment.cumulative_start) / segment.length
            } else {
                0.0
            };
            matches.push(FixMatch {
                matched: Some(MatchedPosition {
                    segment: segment_index,
                    point: segment.point_at(distribution),
                    distribution,
                    distance: 0.0,
                    length_pos: pos,
                }),
                reordered: None,
                unique_position: true,
            });
            groups[segment_index].record(index);
        }

        RouteAlignment {
            best_window: 1,
            total_deviation: 0.0,
            matches,
            groups,
        }
    }

    fn effective_positions(alignment: &RouteAlignment) -> Vec<f64> {
        alignment
            .matches
            .iter()
            .map(|m| m.length_pos().unwrap())
            .collect()
    }

    #[test]
    fn test_monotone_trace_unchanged() {
        let route = straight_route(&[10.0, 10.0, 10.0]);
        let mut alignment = aligned(&route, &[1.0, 8.0, 12.0, 18.0, 25.0]);
        let before = alignment.clone();

        let count = reorder_alignment(&route, &mut alignment, &ReorderConfig::default());
        assert_eq!(count, 0);
        assert_eq!(alignment, before);
    }

    #[test]
    fn test_dip_redistributed_with_low_recovery_threshold() {
        // Positions 2, 15, 8, 22, 28: the dip to 8 opens a region with
        // min 8, committed max 15. Two recoveries (22, 28) close it once
        // 28 - 8 exceeds twice the span 7.
        let route = straight_route(&[10.0, 10.0, 10.0]);
        let mut alignment = aligned(&route, &[2.0, 15.0, 8.0, 22.0, 28.0]);

        let config = ReorderConfig {
            recovery_count: 2,
            span_multiplier: 2.0,
        };
        let count = reorder_alignment(&route, &mut alignment, &config);

        assert_eq!(count, 2);
        let positions = effective_positions(&alignment);
        for (got, want) in positions.iter().zip([2.0, 8.0, 15.0, 22.0, 28.0]) {
            assert!((got - want).abs() < 1e-9, "{:?}", positions);
        }
        assert!(alignment.matches[1].is_reordered());
        assert!(alignment.matches[2].is_reordered());
        assert!(!alignment.matches[0].is_reordered());
        assert!(!alignment.matches[3].is_reordered());
    }

    #[test]
    fn test_dip_redistributed_with_default_config() {
        // Ten consecutive recoveries (22 through 31) are needed to close
        // the region under the default thresholds.
        let route = straight_route(&[10.0, 10.0, 10.0, 10.0]);
        let mut xs = vec![2.0, 15.0, 8.0];
        xs.extend((22..=31).map(f64::from));
        let mut alignment = aligned(&route, &xs);

        let count = reorder_alignment(&route, &mut alignment, &ReorderConfig::default());

        assert_eq!(count, 2);
        let positions = effective_positions(&alignment);
        assert!((positions[1] - 8.0).abs() < 1e-9);
        assert!((positions[2] - 15.0).abs() < 1e-9);
        for pair in positions.windows(2) {
            assert!(pair[0] <= pair[1] + 1e-9, "{:?}", positions);
        }
    }

    #[test]
    fn test_reorder_is_idempotent() {
        let route = straight_route(&[10.0, 10.0, 10.0]);
        let mut alignment = aligned(&route, &[2.0, 15.0, 8.0, 22.0, 28.0]);
        let config = ReorderConfig {
            recovery_count: 2,
            span_multiplier: 2.0,
        };

        reorder_alignment(&route, &mut alignment, &config);
        let once = alignment.clone();
        reorder_alignment(&route, &mut alignment, &config);
        assert_eq!(alignment, once);
    }

    #[test]
    fn test_region_never_closing_leaves_positions_alone() {
        // The dip occurs too close to the trace end for recovery to
        // confirm, so nothing is corrected.
        let route = straight_route(&[10.0, 10.0, 10.0]);
        let mut alignment = aligned(&route, &[2.0, 15.0, 8.0, 22.0]);

        let count = reorder_alignment(&route, &mut alignment, &ReorderConfig::default());
        assert_eq!(count, 0);
        assert!(alignment.matches.iter().all(|m| !m.is_reordered()));
    }

    #[test]
    fn test_groups_rebuilt_from_effective_positions() {
        let route = straight_route(&[10.0, 10.0, 10.0]);
        let mut alignment = aligned(&route, &[2.0, 15.0, 8.0, 22.0, 28.0]);
        let config = ReorderConfig {
            recovery_count: 2,
            span_multiplier: 2.0,
        };
        reorder_alignment(&route, &mut alignment, &config);

        // Effective positions 2, 8, 15, 22, 28 spread over segments
        // 0, 0, 1, 2, 2.
        assert_eq!(alignment.groups[0].matches, vec![0, 1]);
        assert_eq!(alignment.groups[1].matches, vec![2]);
        assert_eq!(alignment.groups[2].matches, vec![3, 4]);

        // Reordered points sit on their assigned segment.
        for m in &alignment.matches {
            if let Some(r) = m.reordered {
                let segment = &route.segments()[r.segment];
                assert!(r.length_pos >= segment.cumulative_start - 1e-9);
                assert!(r.length_pos <= segment.cumulative_end + 1e-9);
                assert!((0.0..=1.0).contains(&r.distribution));
                assert!(r.point.distance_to(segment.point_at(r.distribution)) < 1e-9);
            }
        }
    }

    #[test]
    fn test_unmatched_fixes_skip_reorder() {
        let route = straight_route(&[]);
        let trace = Trace::build(vec![Fix::new(1.0, 0.0, 0, 0.0, 0.0)]);
        let mut alignment = match_trace(
            &route,
            &trace,
            &MatcherConfig::default(),
            &MatchControl::new(),
        )
        .unwrap();

        let count = reorder_alignment(&route, &mut alignment, &ReorderConfig::default());
        assert_eq!(count, 0);
    }

    #[test]
    fn test_single_point_region_gets_minimum() {
        // Only index 1 lies strictly between the bounds, so the step
        // degenerates and the single fix takes the minimum.
        let positions = vec![2.0, 5.0, 12.0];
        let mut corrected = vec![None; positions.len()];
        redistribute(&positions, &mut corrected, 4.0, 6.0);
        assert_eq!(corrected, vec![None, Some(4.0), None]);
    }
}
