//! Segment matcher: assigns every fix a segment and a fractional position.
//!
//! Fixes are processed in ascending time order while a current-segment
//! cursor advances monotonically forward along the route; segments already
//! passed are never revisited (fixes occur in travel order along a single
//! specified route).
//!
//! ## Algorithm
//! 1. For a lookahead window of size `k`, compare each fix's distance to
//!    the cursor segment and to the next `k` segments; move the cursor to
//!    the closest candidate, staying put on ties.
//! 2. Search phase: run step 1 for every `k` up to the configured maximum
//!    without committing anything, accumulating the total deviation per
//!    window; keep the smallest `k` with the minimum total.
//! 3. Commit phase: re-run once with the best window, writing each match
//!    and the per-segment group ranges.
//! 4. Flag temporally-adjacent fixes that collapsed onto identical matched
//!    coordinates as non-unique.
//!
//! A single fixed window is either too small (misses the right segment at
//! sharp turns) or too large (skips ahead past short, close segments);
//! minimizing total deviation over the whole trace picks the window without
//! per-trace hand tuning.

use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::control::MatchControl;
use crate::error::{AlignError, Result};
use crate::projection::{distance_to_segment, project_onto_segment};
use crate::route::Route;
use crate::trace::{FixMatch, MatchedPosition, Trace};
use crate::PlanarPoint;

/// Configuration for the segment matcher.
#[derive(Debug, Clone)]
pub struct MatcherConfig {
    /// Largest lookahead window tried during the search phase.
    /// Default: 20
    pub max_lookahead: usize,
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self { max_lookahead: 20 }
    }
}

/// Per-segment record of the matches assigned to it, with the covered
/// fix-index range. Holds indices into the alignment's match sequence,
/// never the matches themselves.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentMatchGroup {
    /// Index of the segment in route order
    pub segment: usize,
    /// Member match indices in assignment order
    pub matches: Vec<usize>,
    range: Option<(usize, usize)>,
}

impl SegmentMatchGroup {
    pub fn new(segment: usize) -> Self {
        Self {
            segment,
            matches: Vec::new(),
            range: None,
        }
    }

    /// Covered `[first_fix, last_fix]` range, if any fix was assigned.
    pub fn range(&self) -> Option<(usize, usize)> {
        self.range
    }

    pub fn is_matched(&self) -> bool {
        self.range.is_some()
    }

    /// Record a member; the first one sets both bounds, later ones only
    /// extend the end bound (fixes arrive in increasing index order).
    pub(crate) fn record(&mut self, index: usize) {
        self.matches.push(index);
        self.range = Some(match self.range {
            None => (index, index),
            Some((first, _)) => (first, index),
        });
    }

    pub(crate) fn clear(&mut self) {
        self.matches.clear();
        self.range = None;
    }
}

/// Output of a full matching run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteAlignment {
    /// Lookahead window selected by the search phase (0 when nothing ran)
    pub best_window: usize,
    /// Total deviation over the whole trace for the selected window
    pub total_deviation: f64,
    /// Per-fix match state, parallel to the trace's fix order
    pub matches: Vec<FixMatch>,
    /// One group per segment, in route order
    pub groups: Vec<SegmentMatchGroup>,
}

/// One cursor step: distance from the fix to the cursor segment and to the
/// next `window` segments, moving to the closest. Strict `<` keeps the
/// cursor in place on ties.
fn nearest_in_window(
    route: &Route,
    cursor: usize,
    position: PlanarPoint,
    window: usize,
) -> (usize, f64) {
    let segments = route.segments();
    let max_index = segments.len() - 1;

    let mut nearest = cursor;
    let mut best = distance_to_segment(position, &segments[cursor]);

    for ahead in 1..=window {
        let index = cursor + ahead;
        if index > max_index {
            break;
        }
        let distance = distance_to_segment(position, &segments[index]);
        if distance < best {
            best = distance;
            nearest = index;
        }
    }

    (nearest, best)
}

/// Shared forward pass for both phases. Returns the accumulated deviation
/// and, in commit mode, the fully built matches and groups.
fn scan_window(
    route: &Route,
    trace: &Trace,
    window: usize,
    commit: bool,
    control: &MatchControl,
) -> Result<(f64, Vec<FixMatch>, Vec<SegmentMatchGroup>)> {
    let segments = route.segments();

    let mut groups: Vec<SegmentMatchGroup> = if commit {
        (0..segments.len()).map(SegmentMatchGroup::new).collect()
    } else {
        Vec::new()
    };
    let mut matches: Vec<FixMatch> = Vec::with_capacity(if commit { trace.len() } else { 0 });

    if segments.is_empty() {
        if commit {
            matches.resize(trace.len(), FixMatch::unmatched());
        }
        return Ok((0.0, matches, groups));
    }

    let mut cursor = 0usize;
    let mut total = 0.0;

    for (index, fix) in trace.fixes().iter().enumerate() {
        control.checkpoint()?;

        let (nearest, distance) = nearest_in_window(route, cursor, fix.position, window);
        cursor = nearest;
        total += distance;

        if commit {
            let segment = &segments[nearest];
            let projection = project_onto_segment(fix.position, segment);
            let length_pos =
                segment.cumulative_start + projection.distribution * segment.length;

            matches.push(FixMatch {
                matched: Some(MatchedPosition {
                    segment: nearest,
                    point: projection.point,
                    distribution: projection.distribution,
                    distance: projection.distance,
                    length_pos,
                }),
                reordered: None,
                unique_position: true,
            });
            groups[nearest].record(index);
        }
    }

    Ok((total, matches, groups))
}

/// Search-phase step: total deviation over the whole trace for one
/// lookahead window, without committing any match.
pub fn evaluate_window(
    route: &Route,
    trace: &Trace,
    window: usize,
    control: &MatchControl,
) -> Result<f64> {
    let (total, _, _) = scan_window(route, trace, window, false, control)?;
    Ok(total)
}

/// Commit-phase step: write every match and the per-segment group ranges
/// for one lookahead window.
pub fn commit_window(
    route: &Route,
    trace: &Trace,
    window: usize,
    control: &MatchControl,
) -> Result<(Vec<FixMatch>, Vec<SegmentMatchGroup>)> {
    let (_, matches, groups) = scan_window(route, trace, window, true, control)?;
    Ok((matches, groups))
}

/// Flag temporally-adjacent matches that ended on identical matched
/// coordinates as not contributing a unique position. Resets the flags
/// first, so the pass can be re-run after reordering.
pub fn flag_duplicate_positions(matches: &mut [FixMatch]) {
    for m in matches.iter_mut() {
        m.unique_position = true;
    }
    for i in 1..matches.len() {
        if let (Some(a), Some(b)) = (matches[i - 1].matched_point(), matches[i].matched_point()) {
            if a.x == b.x && a.y == b.y {
                matches[i - 1].unique_position = false;
                matches[i].unique_position = false;
            }
        }
    }
}

/// Run the full two-phase matching: search every lookahead window up to
/// the configured maximum, then commit the best one.
///
/// An empty route or empty trace is a no-op yielding an all-unmatched
/// alignment. Cancellation through the control aborts with
/// [`AlignError::Cancelled`] and publishes nothing.
pub fn match_trace(
    route: &Route,
    trace: &Trace,
    config: &MatcherConfig,
    control: &MatchControl,
) -> Result<RouteAlignment> {
    if config.max_lookahead == 0 {
        return Err(AlignError::ConfigError {
            message: "max_lookahead must be at least 1".to_string(),
        });
    }

    control.begin();
    let result = run_match(route, trace, config, control);
    control.finish();
    result
}

fn run_match(
    route: &Route,
    trace: &Trace,
    config: &MatcherConfig,
    control: &MatchControl,
) -> Result<RouteAlignment> {
    if route.is_empty() || trace.is_empty() {
        debug!(
            "[Matcher] Nothing to match ({} segments, {} fixes)",
            route.len(),
            trace.len()
        );
        return Ok(RouteAlignment {
            best_window: 0,
            total_deviation: 0.0,
            matches: vec![FixMatch::unmatched(); trace.len()],
            groups: (0..route.len()).map(SegmentMatchGroup::new).collect(),
        });
    }

    // Search phase: ties keep the smallest window.
    let mut best_window = 1;
    let mut best_total = f64::MAX;
    for window in 1..=config.max_lookahead {
        let total = evaluate_window(route, trace, window, control)?;
        debug!("[Matcher] Window {} -> total deviation {:.3}", window, total);
        if total < best_total {
            best_total = total;
            best_window = window;
        }
    }

    info!(
        "[Matcher] Selected lookahead window {} (total deviation {:.3} over {} fixes)",
        best_window,
        best_total,
        trace.len()
    );

    // Commit phase.
    let (mut matches, groups) = commit_window(route, trace, best_window, control)?;
    flag_duplicate_positions(&mut matches);

    Ok(RouteAlignment {
        best_window,
        total_deviation: best_total,
        matches,
        groups,
    })
}
