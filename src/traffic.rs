//! Traffic monitor: decides whether an in-progress route needs its
//! remaining stops re-sequenced.
//!
//! Each remaining segment's live travel time is compared against the
//! planned time from the original plan. Crossing the delay threshold on
//! any evaluated segment triggers the external engine over the Pending
//! tail only; stops that are terminal or already reached never move, and
//! the route's status is never touched.

use std::collections::HashMap;

use rayon::prelude::*;
use tracing::{info, warn};

use crate::error::{EngineError, JourneyError};
use crate::model::{Location, RouteId, RouteStatus, Stop, StopId, StopStatus};
use crate::store::RouteStore;
use crate::traits::{Planner, ResequenceRequest, ResequenceStop, TravelTimeProvider};

/// A segment's delay multiplier at or above this triggers re-sequencing.
pub const DELAY_THRESHOLD: f64 = 1.5;

#[derive(Debug, Clone)]
pub struct TrafficCheck {
    pub route_id: RouteId,
    pub current_location: Location,
    /// Evaluate every remaining segment, or only the next one.
    pub check_all_segments: bool,
}

/// Live-vs-planned comparison for one segment.
#[derive(Debug, Clone, serde::Serialize)]
pub struct SegmentDelay {
    pub to_stop: StopId,
    pub planned_secs: u32,
    pub estimated_secs: u32,
    pub multiplier: f64,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct TrafficOutcome {
    pub segments: Vec<SegmentDelay>,
    pub reoptimized: bool,
}

fn multiplier(planned: u32, estimated: u32) -> f64 {
    if planned == 0 {
        1.0
    } else {
        f64::from(estimated) / f64::from(planned)
    }
}

/// Evaluates remaining segments of a route and re-sequences its Pending
/// tail when any evaluated delay multiplier reaches the threshold.
pub fn check_traffic(
    store: &RouteStore,
    planner: &dyn Planner,
    estimator: &dyn TravelTimeProvider,
    check: TrafficCheck,
) -> Result<TrafficOutcome, JourneyError> {
    let route = store.snapshot(&check.route_id)?;

    let remaining: Vec<Stop> = route.remaining_stops().cloned().collect();
    if remaining.is_empty() {
        return Ok(TrafficOutcome {
            segments: Vec::new(),
            reoptimized: false,
        });
    }

    // Segment i runs from the previous position (driver location for the
    // first) to remaining stop i.
    let mut legs: Vec<(Location, &Stop)> = Vec::with_capacity(remaining.len());
    let mut from = check.current_location;
    for stop in &remaining {
        legs.push((from, stop));
        from = stop.location;
    }
    if !check.check_all_segments {
        legs.truncate(1);
    }

    let segments: Vec<SegmentDelay> = legs
        .par_iter()
        .map(|(from, stop)| {
            let estimated = estimator.travel_secs(*from, stop.location)?;
            Ok(SegmentDelay {
                to_stop: stop.stop_id.clone(),
                planned_secs: stop.planned_travel_secs,
                estimated_secs: estimated,
                multiplier: multiplier(stop.planned_travel_secs, estimated),
            })
        })
        .collect::<Result<_, EngineError>>()?;

    let delayed = segments
        .iter()
        .any(|segment| segment.multiplier >= DELAY_THRESHOLD);
    if !delayed || route.status != RouteStatus::InProgress {
        return Ok(TrafficOutcome {
            segments,
            reoptimized: false,
        });
    }

    let pending: Vec<ResequenceStop> = route
        .stops
        .iter()
        .filter(|stop| stop.status == StopStatus::Pending)
        .map(|stop| ResequenceStop {
            stop_id: stop.stop_id.clone(),
            location: stop.location,
        })
        .collect();
    if pending.len() < 2 {
        // Nothing to reorder.
        return Ok(TrafficOutcome {
            segments,
            reoptimized: false,
        });
    }

    warn!(route = %check.route_id, segments = segments.len(),
        "delay threshold crossed; re-sequencing pending tail");
    let new_order = planner.resequence(&ResequenceRequest {
        driver_id: route.driver_id.clone(),
        from_location: check.current_location,
        stops: pending,
    })?;

    apply_resequence(store, &check.route_id, &new_order)?;
    info!(route = %check.route_id, "pending tail re-sequenced");

    Ok(TrafficOutcome {
        segments,
        reoptimized: true,
    })
}

/// Installs the engine's new Pending-tail order.
///
/// The Pending set is re-derived under the route lock; the engine's
/// answer must be a permutation of exactly that set, otherwise the route
/// is left untouched. Pending stops are permuted among the positions
/// (and `planned_order` values) they already occupy, so contiguity and
/// every terminal/reached stop's order are preserved.
fn apply_resequence(
    store: &RouteStore,
    route_id: &RouteId,
    new_order: &[StopId],
) -> Result<(), JourneyError> {
    store.with_route(route_id, |route| {
        let slots: Vec<usize> = route
            .stops
            .iter()
            .enumerate()
            .filter(|(_, stop)| stop.status == StopStatus::Pending)
            .map(|(index, _)| index)
            .collect();

        if slots.len() != new_order.len() {
            return Err(JourneyError::ExternalService(EngineError::Malformed(
                format!(
                    "engine returned {} stops for a pending tail of {}",
                    new_order.len(),
                    slots.len()
                ),
            )));
        }

        let mut by_id: HashMap<StopId, Stop> = slots
            .iter()
            .map(|&index| {
                let stop = route.stops[index].clone();
                (stop.stop_id.clone(), stop)
            })
            .collect();

        let mut reordered = Vec::with_capacity(slots.len());
        for stop_id in new_order {
            let stop = by_id.remove(stop_id).ok_or_else(|| {
                JourneyError::ExternalService(EngineError::Malformed(format!(
                    "engine answer is not a permutation of the pending tail ({stop_id})"
                )))
            })?;
            reordered.push(stop);
        }

        for (slot, mut stop) in slots.into_iter().zip(reordered) {
            stop.planned_order = route.stops[slot].planned_order;
            route.stops[slot] = stop;
        }
        debug_assert!(route.order_is_contiguous());
        Ok(())
    })
}
