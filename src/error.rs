//! Error taxonomy for the journey core.
//!
//! Every mutating operation either commits fully or returns one of these
//! errors with the route/stop state untouched. Errors carry enough
//! context for the caller to distinguish "not found" from "invalid
//! transition" from "already done" without re-reading the route.

use thiserror::Error;

use crate::model::{DriverId, RouteId, RouteStatus, StopId, StopStatus};

/// Failure from the external routing engine (planner or travel-time
/// service).
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("engine request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("engine returned malformed response: {0}")]
    Malformed(String),
}

#[derive(Debug, Error)]
pub enum JourneyError {
    /// Malformed request; the operation was not attempted.
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("route {0} not found")]
    RouteNotFound(RouteId),

    #[error("no planned route found for driver {driver_id}")]
    NoPlannedRoute { driver_id: DriverId },

    #[error("stop {reference} not found in route {route_id}")]
    StopNotFound { route_id: RouteId, reference: String },

    /// The route does not permit the attempted operation from its
    /// current state.
    #[error("cannot {attempted} route {route_id} in state {current:?}")]
    InvalidState {
        route_id: RouteId,
        current: RouteStatus,
        attempted: &'static str,
    },

    /// A stop mutation hit a stop already in a conflicting terminal
    /// state. A duplicate mark with the *same* terminal status is not an
    /// error; it is treated as an idempotent no-op before this is raised.
    #[error("stop {stop_id} is already terminal ({current:?})")]
    AlreadyTerminal { stop_id: StopId, current: StopStatus },

    /// A move targeted a stop whose delivery outcome is already recorded.
    #[error("stop {stop_id} is {current:?} and can no longer be moved")]
    TerminalStop { stop_id: StopId, current: StopStatus },

    /// Stops may only move between routes of the same date+session.
    #[error("routes {from} and {to} belong to different date/session scopes")]
    CrossSession { from: RouteId, to: RouteId },

    /// `end_journey` attempted while stops remain Pending or Reached.
    #[error("route {route_id} has {count} unfinished stop(s)", count = pending.len())]
    IncompleteRoute { route_id: RouteId, pending: Vec<StopId> },

    /// The external engine failed; no local state was changed.
    #[error("external engine error: {0}")]
    ExternalService(#[from] EngineError),
}

/// Machine-readable error class, for transport-layer mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    NotFound,
    InvalidState,
    AlreadyTerminal,
    IncompleteRoute,
    ExternalService,
}

impl ErrorKind {
    /// HTTP status this class maps to at the transport boundary.
    pub fn http_status(self) -> u16 {
        match self {
            ErrorKind::Validation | ErrorKind::AlreadyTerminal => 400,
            ErrorKind::NotFound => 404,
            ErrorKind::InvalidState | ErrorKind::IncompleteRoute => 409,
            ErrorKind::ExternalService => 502,
        }
    }
}

impl JourneyError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            JourneyError::Validation(_) | JourneyError::CrossSession { .. } => ErrorKind::Validation,
            JourneyError::RouteNotFound(_)
            | JourneyError::NoPlannedRoute { .. }
            | JourneyError::StopNotFound { .. } => ErrorKind::NotFound,
            JourneyError::InvalidState { .. } | JourneyError::TerminalStop { .. } => {
                ErrorKind::InvalidState
            }
            JourneyError::AlreadyTerminal { .. } => ErrorKind::AlreadyTerminal,
            JourneyError::IncompleteRoute { .. } => ErrorKind::IncompleteRoute,
            JourneyError::ExternalService(_) => ErrorKind::ExternalService,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::RouteId;

    #[test]
    fn kinds_map_to_expected_statuses() {
        let not_found = JourneyError::RouteNotFound(RouteId::new("r9"));
        assert_eq!(not_found.kind().http_status(), 404);

        let invalid = JourneyError::InvalidState {
            route_id: RouteId::new("r1"),
            current: RouteStatus::Completed,
            attempted: "start",
        };
        assert_eq!(invalid.kind().http_status(), 409);

        let validation = JourneyError::Validation("bad".into());
        assert_eq!(validation.kind().http_status(), 400);
    }
}
