//! Test fixtures: route builders and engine fakes.
#![allow(dead_code)]

use chrono::NaiveDate;

use route_journey::error::EngineError;
use route_journey::model::{
    DeliveryId, DriverId, Location, Route, RouteId, RouteStatus, Session, Stop, StopId, StopStatus,
};
use route_journey::store::RouteStore;
use route_journey::traits::{
    PlanOutcome, PlanRequest, Planner, ResequenceRequest, TravelTimeProvider,
};

pub fn test_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 3, 14).unwrap()
}

/// Spreads stops along a line so every stop has a distinct location.
pub fn stop_location(order: u32) -> Location {
    Location::new(36.10 + f64::from(order) * 0.01, -115.10)
}

pub fn depot() -> Location {
    Location::new(36.10, -115.10)
}

/// Builder for routes with sensible defaults: Lunch session, Planned
/// status, Pending stops with 600s planned legs.
pub struct RouteBuilder {
    route: Route,
}

impl RouteBuilder {
    pub fn new(route_id: &str, driver_id: &str) -> Self {
        Self {
            route: Route {
                route_id: RouteId::new(route_id),
                driver_id: DriverId::new(driver_id),
                date: test_date(),
                session: Session::Lunch,
                status: RouteStatus::Planned,
                started_at: None,
                ended_at: None,
                stops: Vec::new(),
            },
        }
    }

    pub fn session(mut self, session: Session) -> Self {
        self.route.session = session;
        self
    }

    pub fn date(mut self, date: NaiveDate) -> Self {
        self.route.date = date;
        self
    }

    pub fn in_progress(mut self) -> Self {
        self.route.status = RouteStatus::InProgress;
        self.route.started_at = Some(chrono::Utc::now());
        self
    }

    pub fn completed(mut self) -> Self {
        self.route.status = RouteStatus::Completed;
        self.route.ended_at = Some(chrono::Utc::now());
        self
    }

    pub fn stop(self, stop_id: &str) -> Self {
        self.stop_with_status(stop_id, StopStatus::Pending)
    }

    pub fn stop_with_status(mut self, stop_id: &str, status: StopStatus) -> Self {
        let order = self.route.stops.len() as u32 + 1;
        self.route.stops.push(Stop {
            stop_id: StopId::new(stop_id),
            delivery_id: DeliveryId::new(format!("d-{stop_id}")),
            planned_order: order,
            address: format!("{order} Fremont St"),
            location: stop_location(order),
            status,
            completed_at: status.is_terminal().then(chrono::Utc::now),
            comments: None,
            planned_travel_secs: 600,
        });
        self
    }

    pub fn build(self) -> Route {
        self.route
    }

    pub fn insert_into(self, store: &RouteStore) -> RouteId {
        let id = self.route.route_id.clone();
        store.insert(self.route);
        id
    }
}

/// Planner fake driven by closures.
pub struct FnPlanner<P, R>
where
    P: Fn(&PlanRequest) -> Result<PlanOutcome, EngineError> + Sync,
    R: Fn(&ResequenceRequest) -> Result<Vec<StopId>, EngineError> + Sync,
{
    pub plan_fn: P,
    pub resequence_fn: R,
}

impl<P, R> Planner for FnPlanner<P, R>
where
    P: Fn(&PlanRequest) -> Result<PlanOutcome, EngineError> + Sync,
    R: Fn(&ResequenceRequest) -> Result<Vec<StopId>, EngineError> + Sync,
{
    fn plan(&self, request: &PlanRequest) -> Result<PlanOutcome, EngineError> {
        (self.plan_fn)(request)
    }

    fn resequence(&self, request: &ResequenceRequest) -> Result<Vec<StopId>, EngineError> {
        (self.resequence_fn)(request)
    }
}

/// A planner that must never be reached.
pub struct UnreachablePlanner;

impl Planner for UnreachablePlanner {
    fn plan(&self, _request: &PlanRequest) -> Result<PlanOutcome, EngineError> {
        panic!("planner should not be called");
    }

    fn resequence(&self, _request: &ResequenceRequest) -> Result<Vec<StopId>, EngineError> {
        panic!("resequence should not be called");
    }
}

/// Travel-time fake driven by a closure over the segment endpoints.
pub struct FnEstimator<F>(pub F)
where
    F: Fn(Location, Location) -> Result<u32, EngineError> + Sync;

impl<F> TravelTimeProvider for FnEstimator<F>
where
    F: Fn(Location, Location) -> Result<u32, EngineError> + Sync,
{
    fn travel_secs(&self, from: Location, to: Location) -> Result<u32, EngineError> {
        (self.0)(from, to)
    }
}

/// Constant travel time, regardless of segment.
pub struct FixedEstimator(pub u32);

impl TravelTimeProvider for FixedEstimator {
    fn travel_secs(&self, _from: Location, _to: Location) -> Result<u32, EngineError> {
        Ok(self.0)
    }
}
