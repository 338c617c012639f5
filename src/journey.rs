//! Journey controller: the single authority over route and stop status
//! transitions.
//!
//! Route lifecycle is `Planned -> InProgress -> Completed`; stops move
//! `Pending -> {Reached -> Delivered | CustomerUnavailable} | Skipped`.
//! Every precondition failure is rejected with a structured error, and
//! duplicate terminal marks are idempotent no-ops so a timed-out caller
//! can always retry.

use std::fmt;

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::error::JourneyError;
use crate::model::{
    DriverId, Location, Route, RouteId, RouteStatus, Stop, StopId, StopStatus, MAX_COMMENT_LEN,
};
use crate::store::RouteStore;

/// How a caller identifies a stop: stable stop id preferred, planned
/// order or delivery id as fallbacks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopRef {
    Id(StopId),
    Order(u32),
    Delivery(crate::model::DeliveryId),
}

impl fmt::Display for StopRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StopRef::Id(id) => write!(f, "id={id}"),
            StopRef::Order(order) => write!(f, "order={order}"),
            StopRef::Delivery(id) => write!(f, "delivery={id}"),
        }
    }
}

/// Canonical mark-stop command (wire variants normalize into this).
#[derive(Debug, Clone)]
pub struct MarkStop {
    pub route_id: RouteId,
    pub driver_id: DriverId,
    pub stop: StopRef,
    pub status: StopStatus,
    pub completed_at: Option<DateTime<Utc>>,
    pub location: Option<Location>,
    pub comments: Option<String>,
}

/// Read-model for one stop, in planned order.
#[derive(Debug, Clone, serde::Serialize)]
pub struct StopView {
    pub stop_id: StopId,
    pub delivery_id: crate::model::DeliveryId,
    pub planned_order: u32,
    pub address: String,
    pub status: StopStatus,
    pub completed_at: Option<DateTime<Utc>>,
    pub comments: Option<String>,
}

impl From<&Stop> for StopView {
    fn from(stop: &Stop) -> Self {
        Self {
            stop_id: stop.stop_id.clone(),
            delivery_id: stop.delivery_id.clone(),
            planned_order: stop.planned_order,
            address: stop.address.clone(),
            status: stop.status,
            completed_at: stop.completed_at,
            comments: stop.comments.clone(),
        }
    }
}

/// Read-model for a whole route: status, ordered stops, and the current
/// stop pointer (first non-terminal stop).
#[derive(Debug, Clone, serde::Serialize)]
pub struct RouteView {
    pub route_id: RouteId,
    pub driver_id: DriverId,
    pub status: RouteStatus,
    pub started_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
    pub stops: Vec<StopView>,
    pub current_stop: Option<StopId>,
}

impl From<&Route> for RouteView {
    fn from(route: &Route) -> Self {
        Self {
            route_id: route.route_id.clone(),
            driver_id: route.driver_id.clone(),
            status: route.status,
            started_at: route.started_at,
            ended_at: route.ended_at,
            stops: route.stops.iter().map(StopView::from).collect(),
            current_stop: route.current_stop().map(|stop| stop.stop_id.clone()),
        }
    }
}

/// Result of a mark: `applied` is false when the call was an idempotent
/// duplicate of an earlier mark.
#[derive(Debug, Clone)]
pub struct MarkResult {
    pub applied: bool,
    pub route: RouteView,
}

/// Resolves a `StopRef` to an index within the route.
pub(crate) fn resolve_stop(route: &Route, reference: &StopRef) -> Result<usize, JourneyError> {
    let index = match reference {
        StopRef::Id(id) => route.find_stop_by_id(id),
        StopRef::Order(order) => route.find_stop_by_order(*order),
        StopRef::Delivery(id) => route.find_stop_by_delivery(id),
    };
    index.ok_or_else(|| JourneyError::StopNotFound {
        route_id: route.route_id.clone(),
        reference: reference.to_string(),
    })
}

/// Starts a planned route, moving it to `InProgress`.
///
/// With `route_id` omitted the driver must have exactly one planned
/// route; zero is not-found and several is ambiguous.
pub fn start_journey(
    store: &RouteStore,
    driver_id: &DriverId,
    route_id: Option<&RouteId>,
) -> Result<RouteView, JourneyError> {
    let resolved;
    let route_id = match route_id {
        Some(id) => id,
        None => {
            let mut planned = store.planned_routes_for_driver(driver_id);
            match planned.len() {
                0 => {
                    return Err(JourneyError::NoPlannedRoute {
                        driver_id: driver_id.clone(),
                    })
                }
                1 => {
                    resolved = planned.remove(0);
                    &resolved
                }
                n => {
                    return Err(JourneyError::Validation(format!(
                        "driver {driver_id} has {n} planned routes; route_id is required"
                    )))
                }
            }
        }
    };

    store.with_route(route_id, |route| {
        if route.driver_id != *driver_id {
            return Err(JourneyError::Validation(format!(
                "route {} is assigned to driver {}, not {driver_id}",
                route.route_id, route.driver_id
            )));
        }
        match route.status {
            RouteStatus::Planned => {
                route.status = RouteStatus::InProgress;
                route.started_at = Some(Utc::now());
                info!(route = %route.route_id, driver = %driver_id, "journey started");
                Ok(RouteView::from(&*route))
            }
            current => Err(JourneyError::InvalidState {
                route_id: route.route_id.clone(),
                current,
                attempted: "start",
            }),
        }
    })
}

/// Records a driver's progress at one stop.
///
/// Duplicate marks with the same terminal status succeed without
/// changing anything; a conflicting terminal mark is rejected.
pub fn mark_stop(store: &RouteStore, command: MarkStop) -> Result<MarkResult, JourneyError> {
    if command.status == StopStatus::Pending {
        return Err(JourneyError::Validation(
            "a stop cannot be marked back to Pending".into(),
        ));
    }
    let comments = match command.comments.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(trimmed) if trimmed.chars().count() > MAX_COMMENT_LEN => {
            return Err(JourneyError::Validation(format!(
                "comments exceed {MAX_COMMENT_LEN} characters"
            )));
        }
        Some(trimmed) => Some(trimmed.to_string()),
    };

    store.with_route(&command.route_id, |route| {
        if route.driver_id != command.driver_id {
            return Err(JourneyError::Validation(format!(
                "route {} is assigned to driver {}, not {}",
                route.route_id, route.driver_id, command.driver_id
            )));
        }
        if route.status != RouteStatus::InProgress {
            return Err(JourneyError::InvalidState {
                route_id: route.route_id.clone(),
                current: route.status,
                attempted: "mark a stop on",
            });
        }

        let index = resolve_stop(route, &command.stop)?;
        let stop = &mut route.stops[index];

        if stop.status == command.status {
            // Retry of an already-applied mark.
            debug!(route = %route.route_id, stop = %stop.stop_id, status = ?stop.status,
                "duplicate mark ignored");
            return Ok(MarkResult {
                applied: false,
                route: RouteView::from(&*route),
            });
        }
        if stop.is_terminal() {
            return Err(JourneyError::AlreadyTerminal {
                stop_id: stop.stop_id.clone(),
                current: stop.status,
            });
        }

        stop.status = command.status;
        if command.status.is_terminal() {
            stop.completed_at = Some(command.completed_at.unwrap_or_else(Utc::now));
        }
        if comments.is_some() {
            stop.comments = comments;
        }
        debug!(route = %route.route_id, stop = %stop.stop_id, status = ?command.status,
            location = ?command.location, "stop marked");

        Ok(MarkResult {
            applied: true,
            route: RouteView::from(&*route),
        })
    })
}

/// Completes an in-progress route. Every stop must already be terminal.
pub fn end_journey(
    store: &RouteStore,
    driver_id: &DriverId,
    route_id: &RouteId,
    location: Location,
) -> Result<RouteView, JourneyError> {
    store.with_route(route_id, |route| {
        if route.driver_id != *driver_id {
            return Err(JourneyError::Validation(format!(
                "route {} is assigned to driver {}, not {driver_id}",
                route.route_id, route.driver_id
            )));
        }
        if route.status != RouteStatus::InProgress {
            return Err(JourneyError::InvalidState {
                route_id: route.route_id.clone(),
                current: route.status,
                attempted: "end",
            });
        }

        let pending: Vec<StopId> = route
            .remaining_stops()
            .map(|stop| stop.stop_id.clone())
            .collect();
        if !pending.is_empty() {
            return Err(JourneyError::IncompleteRoute {
                route_id: route.route_id.clone(),
                pending,
            });
        }

        route.status = RouteStatus::Completed;
        route.ended_at = Some(Utc::now());
        info!(route = %route.route_id, driver = %driver_id,
            lat = location.lat, lng = location.lng, "journey completed");
        Ok(RouteView::from(&*route))
    })
}

/// Read-only route status: never mutates.
pub fn route_status(store: &RouteStore, route_id: &RouteId) -> Result<RouteView, JourneyError> {
    let route = store.snapshot(route_id)?;
    Ok(RouteView::from(&route))
}

/// Read-only ordered stop list.
pub fn route_order(store: &RouteStore, route_id: &RouteId) -> Result<Vec<StopView>, JourneyError> {
    Ok(route_status(store, route_id)?.stops)
}
