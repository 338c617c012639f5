//! Reassignment coordinator: mutates route composition without breaking
//! ordering invariants.
//!
//! Moves and exchanges are atomic from the caller's point of view: both
//! routes are locked (ascending id order) before either is touched, all
//! preconditions are checked before any mutation, and renumbering leaves
//! every untouched stop in its prior relative order.

use tracing::info;

use crate::error::JourneyError;
use crate::journey::{resolve_stop, RouteView, StopRef};
use crate::model::{DriverId, Route, RouteId, RouteStatus, StopStatus};
use crate::store::RouteStore;

/// Updated source and destination routes after a move. For a move within
/// one route the two views are identical.
#[derive(Debug, Clone)]
pub struct MoveOutcome {
    pub from: RouteView,
    pub to: RouteView,
}

/// Assigns a new driver to a route. Completed routes are immutable.
pub fn reassign_driver(
    store: &RouteStore,
    route_id: &RouteId,
    new_driver: &DriverId,
) -> Result<RouteView, JourneyError> {
    store.with_route(route_id, |route| {
        if route.status == RouteStatus::Completed {
            return Err(JourneyError::InvalidState {
                route_id: route.route_id.clone(),
                current: route.status,
                attempted: "reassign",
            });
        }
        info!(route = %route.route_id, from = %route.driver_id, to = %new_driver,
            "driver reassigned");
        route.driver_id = new_driver.clone();
        Ok(RouteView::from(&*route))
    })
}

/// Swaps the drivers of two routes. Fails as a whole if either route is
/// already completed; stops are untouched.
pub fn exchange_drivers(
    store: &RouteStore,
    route_id_1: &RouteId,
    route_id_2: &RouteId,
) -> Result<(RouteView, RouteView), JourneyError> {
    store.with_route_pair(route_id_1, route_id_2, |first, second| {
        for route in [&*first, &*second] {
            if route.status == RouteStatus::Completed {
                return Err(JourneyError::InvalidState {
                    route_id: route.route_id.clone(),
                    current: route.status,
                    attempted: "exchange drivers on",
                });
            }
        }
        std::mem::swap(&mut first.driver_id, &mut second.driver_id);
        info!(route_1 = %first.route_id, route_2 = %second.route_id,
            driver_1 = %first.driver_id, driver_2 = %second.driver_id, "drivers exchanged");
        Ok((RouteView::from(&*first), RouteView::from(&*second)))
    })
}

fn check_movable(route: &Route, index: usize) -> Result<(), JourneyError> {
    let stop = &route.stops[index];
    // Only a recorded delivery outcome pins a stop; Skipped stops may
    // still be moved and retried on another route.
    if matches!(
        stop.status,
        StopStatus::Delivered | StopStatus::CustomerUnavailable
    ) {
        return Err(JourneyError::TerminalStop {
            stop_id: stop.stop_id.clone(),
            current: stop.status,
        });
    }
    Ok(())
}

fn check_open(route: &Route) -> Result<(), JourneyError> {
    if route.status == RouteStatus::Completed {
        return Err(JourneyError::InvalidState {
            route_id: route.route_id.clone(),
            current: route.status,
            attempted: "move a stop on",
        });
    }
    Ok(())
}

/// Resolves `insert_at` (1-based planned order, default append) to a
/// vec index for a route that will have `len` stops after insertion.
fn insert_index(insert_at: Option<u32>, len: usize) -> Result<usize, JourneyError> {
    match insert_at {
        None => Ok(len),
        Some(0) => Err(JourneyError::Validation("insert_at_order must be >= 1".into())),
        Some(order) if order as usize > len + 1 => Err(JourneyError::Validation(format!(
            "insert_at_order {order} is beyond the end of the route"
        ))),
        Some(order) => Ok(order as usize - 1),
    }
}

/// Moves a stop between routes (or repositions it within one route),
/// renumbering both sequences to stay contiguous.
pub fn move_stop(
    store: &RouteStore,
    from_route_id: &RouteId,
    to_route_id: &RouteId,
    stop: &StopRef,
    insert_at: Option<u32>,
) -> Result<MoveOutcome, JourneyError> {
    if from_route_id == to_route_id {
        return store.with_route(from_route_id, |route| {
            check_open(route)?;
            let index = resolve_stop(route, stop)?;
            check_movable(route, index)?;
            let target = insert_index(insert_at, route.stops.len() - 1)?;

            let moved = route.stops.remove(index);
            let stop_id = moved.stop_id.clone();
            route.stops.insert(target, moved);
            route.renumber();
            info!(route = %route.route_id, stop = %stop_id, "stop repositioned");

            let view = RouteView::from(&*route);
            Ok(MoveOutcome {
                from: view.clone(),
                to: view,
            })
        });
    }

    store.with_route_pair(from_route_id, to_route_id, |from, to| {
        if !from.same_scope(to) {
            return Err(JourneyError::CrossSession {
                from: from.route_id.clone(),
                to: to.route_id.clone(),
            });
        }
        check_open(from)?;
        check_open(to)?;
        let index = resolve_stop(from, stop)?;
        check_movable(from, index)?;
        let target = insert_index(insert_at, to.stops.len())?;

        let moved = from.stops.remove(index);
        let stop_id = moved.stop_id.clone();
        from.renumber();
        to.stops.insert(target, moved);
        to.renumber();
        info!(stop = %stop_id, from = %from.route_id, to = %to.route_id,
            order = target + 1, "stop moved");

        Ok(MoveOutcome {
            from: RouteView::from(&*from),
            to: RouteView::from(&*to),
        })
    })
}
