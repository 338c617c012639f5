//! Route planning entry point: validates a plan request, calls the
//! external engine, and materializes its answer into stored routes.
//!
//! The engine stays a black box; this module only enforces that its
//! answer is consistent with the request before anything is stored.

use std::collections::HashSet;

use tracing::{info, warn};

use crate::error::{EngineError, JourneyError};
use crate::journey::RouteView;
use crate::model::{Route, RouteStatus, Stop, StopStatus};
use crate::store::RouteStore;
use crate::traits::{PlanRequest, Planner};

/// Materialized plan: one route per driver the engine scheduled, plus
/// warnings (engine warnings and local skips), preserved even when some
/// of the request could not be satisfied.
#[derive(Debug, Clone)]
pub struct PlanResponse {
    pub routes: Vec<RouteView>,
    pub warnings: Vec<String>,
}

/// Plans routes for one date+session.
///
/// A driver whose route for this scope is already in progress or
/// completed is skipped with a warning; an existing still-Planned route
/// is replaced by the new plan.
pub fn plan_routes(
    store: &RouteStore,
    planner: &dyn Planner,
    request: PlanRequest,
) -> Result<PlanResponse, JourneyError> {
    if request.drivers.is_empty() {
        return Err(JourneyError::Validation("no drivers in plan request".into()));
    }
    if request.deliveries.is_empty() {
        return Err(JourneyError::Validation(
            "no deliveries in plan request".into(),
        ));
    }
    let mut seen = HashSet::new();
    for driver in &request.drivers {
        if !seen.insert(&driver.driver_id) {
            return Err(JourneyError::Validation(format!(
                "driver {} appears twice in plan request",
                driver.driver_id
            )));
        }
    }

    let mut warnings = Vec::new();
    let mut replaceable = Vec::new();
    let mut request = request;
    request.drivers.retain(|driver| {
        match store.route_for_scope(&driver.driver_id, request.date, request.session) {
            None => true,
            Some((route_id, RouteStatus::Planned)) => {
                replaceable.push((driver.driver_id.clone(), route_id));
                true
            }
            Some((route_id, status)) => {
                warnings.push(format!(
                    "driver {} skipped: route {route_id} is already {status:?}",
                    driver.driver_id
                ));
                false
            }
        }
    });
    if request.drivers.is_empty() {
        warn!(date = %request.date, session = %request.session,
            "plan request left no plannable drivers");
        return Ok(PlanResponse {
            routes: Vec::new(),
            warnings,
        });
    }

    let known_drivers: HashSet<_> = request
        .drivers
        .iter()
        .map(|driver| driver.driver_id.clone())
        .collect();
    let known_deliveries: HashSet<_> = request
        .deliveries
        .iter()
        .map(|delivery| delivery.delivery_id.clone())
        .collect();

    let outcome = planner.plan(&request)?;
    warnings.extend(outcome.warnings);

    let mut routed_deliveries = HashSet::new();
    let mut routes = Vec::with_capacity(outcome.routes.len());
    for planned in &outcome.routes {
        if !known_drivers.contains(&planned.driver_id) {
            return Err(JourneyError::ExternalService(EngineError::Malformed(
                format!("engine routed unknown driver {}", planned.driver_id),
            )));
        }
        for stop in &planned.stops {
            if !known_deliveries.contains(&stop.delivery_id) {
                return Err(JourneyError::ExternalService(EngineError::Malformed(
                    format!("engine routed unknown delivery {}", stop.delivery_id),
                )));
            }
            if !routed_deliveries.insert(stop.delivery_id.clone()) {
                return Err(JourneyError::ExternalService(EngineError::Malformed(
                    format!("engine routed delivery {} twice", stop.delivery_id),
                )));
            }
        }
    }

    for delivery in &request.deliveries {
        if !routed_deliveries.contains(&delivery.delivery_id) {
            warnings.push(format!("delivery {} left unassigned", delivery.delivery_id));
        }
    }

    // Validation passed; commit. Replaced Planned routes go away first so
    // a driver never has two routes in one scope.
    for (driver_id, route_id) in replaceable {
        if outcome
            .routes
            .iter()
            .any(|planned| planned.driver_id == driver_id)
        {
            store.remove(&route_id);
            warn!(route = %route_id, driver = %driver_id, "planned route replaced by re-plan");
        }
    }

    for planned in outcome.routes {
        if planned.stops.is_empty() {
            continue;
        }
        let route = Route {
            route_id: store.next_route_id(),
            driver_id: planned.driver_id,
            date: request.date,
            session: request.session,
            status: RouteStatus::Planned,
            started_at: None,
            ended_at: None,
            stops: planned
                .stops
                .into_iter()
                .enumerate()
                .map(|(index, stop)| Stop {
                    stop_id: store.next_stop_id(),
                    delivery_id: stop.delivery_id,
                    planned_order: index as u32 + 1,
                    address: stop.address,
                    location: stop.location,
                    status: StopStatus::Pending,
                    completed_at: None,
                    comments: None,
                    planned_travel_secs: stop.travel_secs,
                })
                .collect(),
        };
        info!(route = %route.route_id, driver = %route.driver_id,
            stops = route.stops.len(), "route planned");
        routes.push(RouteView::from(&route));
        store.insert(route);
    }

    Ok(PlanResponse { routes, warnings })
}
