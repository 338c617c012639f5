//! Seams for the external routing engine.
//!
//! The geospatial optimizer and the live travel-time service are black
//! boxes to this crate; they are reached only through these traits.
//! `engine::EngineClient` is the HTTP implementation, `haversine` the
//! offline fallback for travel times, and tests plug in fakes.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::EngineError;
use crate::model::{DeliveryId, DriverId, Location, Session, StopId};

/// A driver offered to the planner for one date+session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DriverSpec {
    pub driver_id: DriverId,
    pub start_location: Location,
}

/// A pending delivery to be routed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliverySpec {
    pub delivery_id: DeliveryId,
    pub address: String,
    pub location: Location,
}

/// Planner knobs forwarded opaquely to the engine.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlanConstraints {
    /// Hard cap on stops per route, if any.
    pub max_stops_per_route: Option<u32>,
    /// Free-form engine options the core does not interpret.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<String>,
}

/// Full planning request for one date+session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanRequest {
    pub date: NaiveDate,
    pub session: Session,
    pub drivers: Vec<DriverSpec>,
    pub deliveries: Vec<DeliverySpec>,
    #[serde(default)]
    pub constraints: PlanConstraints,
}

/// One ordered stop as produced by the engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlannedStop {
    pub delivery_id: DeliveryId,
    pub address: String,
    pub location: Location,
    /// Planned travel time from the previous position, seconds.
    pub travel_secs: u32,
}

/// One driver's ordered stop sequence as produced by the engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlannedRoute {
    pub driver_id: DriverId,
    pub stops: Vec<PlannedStop>,
}

/// Engine output: routes plus non-fatal warnings (unroutable deliveries,
/// capacity overruns). Warnings survive even partial failures.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanOutcome {
    pub routes: Vec<PlannedRoute>,
    #[serde(default)]
    pub warnings: Vec<String>,
}

/// A re-sequencing request for the still-pending tail of one route.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResequenceRequest {
    pub driver_id: DriverId,
    pub from_location: Location,
    /// Pending stops eligible for reordering, in current planned order.
    pub stops: Vec<ResequenceStop>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResequenceStop {
    pub stop_id: StopId,
    pub location: Location,
}

/// The external route-optimization engine.
///
/// `Sync` so traffic checks can fan out segment estimates in parallel.
pub trait Planner: Sync {
    /// Build ordered stop sequences for a set of drivers and deliveries.
    fn plan(&self, request: &PlanRequest) -> Result<PlanOutcome, EngineError>;

    /// Re-order the pending tail of an in-progress route. Must return a
    /// permutation of the requested stop ids.
    fn resequence(&self, request: &ResequenceRequest) -> Result<Vec<StopId>, EngineError>;
}

/// Live travel-time estimates for a single segment.
pub trait TravelTimeProvider: Sync {
    /// Estimated current travel time in seconds from `from` to `to`.
    fn travel_secs(&self, from: Location, to: Location) -> Result<u32, EngineError>;
}
