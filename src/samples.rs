//! Temporal projection of external samples onto the matched route.
//!
//! Samples carry a timestamp and an arbitrary payload (signal measurements,
//! cell identity, anything time-stamped alongside the trace) but no usable
//! position of their own. Each sample is placed on the route by linear
//! time interpolation between the matched fixes bracketing its timestamp,
//! using corrected positions where the reorderer produced them.
//!
//! Timestamps are unit-agnostic but must share the unit and epoch of the
//! trace's fixes.

use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::matcher::RouteAlignment;
use crate::route::Route;
use crate::trace::Trace;
use crate::PlanarPoint;

/// Route placement computed for one sample.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SampleProjection {
    /// Interpolated route-length position
    pub length_pos: f64,
    /// Index of the covering segment in route order
    pub segment: usize,
    /// Fractional distribution along that segment, in `[0, 1]`
    pub distribution: f64,
    /// Interpolated point on the segment
    pub point: PlanarPoint,
}

/// A time-stamped external measurement awaiting route placement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExternalSample<P> {
    pub timestamp: i64,
    pub payload: P,
    /// Written by [`project_samples`]; `None` when the sample's timestamp
    /// falls outside the matched trace's time span
    pub projection: Option<SampleProjection>,
}

impl<P> ExternalSample<P> {
    pub fn new(timestamp: i64, payload: P) -> Self {
        Self {
            timestamp,
            payload,
            projection: None,
        }
    }

    pub fn is_matched(&self) -> bool {
        self.projection.is_some()
    }
}

/// Radio link quality measurements, every field optional.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct LinkMetrics {
    pub data_rate: Option<i64>,
    pub delay: Option<f64>,
    pub loss_rate: Option<f64>,
}

/// Serving cell identity as reported by a modem log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CellIdentity {
    pub cell_id: String,
    pub lac: String,
    pub channel: String,
    pub scrambling_code: String,
}

impl Default for CellIdentity {
    fn default() -> Self {
        Self {
            cell_id: "-".to_string(),
            lac: "-".to_string(),
            channel: "-".to_string(),
            scrambling_code: "-".to_string(),
        }
    }
}

/// Latest matched fix at or before the timestamp, as (timestamp, position).
fn bracket_before(trace: &Trace, alignment: &RouteAlignment, ts: i64) -> Option<(i64, f64)> {
    for (fix, m) in trace.fixes().iter().zip(&alignment.matches).rev() {
        if fix.timestamp <= ts {
            if let Some(pos) = m.length_pos() {
                return Some((fix.timestamp, pos));
            }
        }
    }
    None
}

/// Earliest matched fix at or after the timestamp.
fn bracket_after(trace: &Trace, alignment: &RouteAlignment, ts: i64) -> Option<(i64, f64)> {
    for (fix, m) in trace.fixes().iter().zip(&alignment.matches) {
        if fix.timestamp >= ts {
            if let Some(pos) = m.length_pos() {
                return Some((fix.timestamp, pos));
            }
        }
    }
    None
}

fn project_one(route: &Route, length_pos: f64) -> Option<SampleProjection> {
    let segment_index = route.segment_index_at(length_pos)?;
    let segment = &route.segments()[segment_index];
    let distribution = if segment.length > 0.0 {
        (length_pos - segment.cumulative_start) / segment.length
    } else {
        0.0
    };
    Some(SampleProjection {
        length_pos,
        segment: segment_index,
        distribution,
        point: segment.point_at(distribution),
    })
}

/// Place every sample on the route by interpolating between the matched
/// fixes bracketing its timestamp. Returns the number of samples placed.
///
/// A sample earlier than the first matched fix or later than the last one
/// stays unplaced. A sample whose timestamp coincides with a fix lands
/// exactly on that fix's effective position.
pub fn project_samples<P>(
    route: &Route,
    trace: &Trace,
    alignment: &RouteAlignment,
    samples: &mut [ExternalSample<P>],
) -> usize {
    let mut placed = 0usize;

    for sample in samples.iter_mut() {
        sample.projection = None;

        let Some((last_ts, last_pos)) = bracket_before(trace, alignment, sample.timestamp) else {
            debug!(
                "[Samples] No matched fix at or before timestamp {}",
                sample.timestamp
            );
            continue;
        };
        let Some((next_ts, next_pos)) = bracket_after(trace, alignment, sample.timestamp) else {
            debug!(
                "[Samples] No matched fix at or after timestamp {}",
                sample.timestamp
            );
            continue;
        };

        let time_total = next_ts - last_ts;
        let fraction = if time_total == 0 {
            0.0
        } else {
            (sample.timestamp - last_ts) as f64 / time_total as f64
        };
        let length_pos = last_pos + fraction * (next_pos - last_pos);

        if let Some(projection) = project_one(route, length_pos) {
            sample.projection = Some(projection);
            placed += 1;
        }
    }

    info!("[Samples] Placed {} of {} samples", placed, samples.len());
    placed
}
