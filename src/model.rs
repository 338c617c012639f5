//! Core domain entities: routes, stops, and their lifecycle invariants.
//!
//! A `Route` owns an ordered sequence of `Stop`s for one driver on one
//! date+session. Stop order is always the contiguous sequence `1..=n`;
//! every mutation that touches ordering goes through the renumbering
//! helpers here so the invariant cannot drift.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Maximum accepted length for stop comments, after trimming.
pub const MAX_COMMENT_LEN: usize = 500;

macro_rules! string_id {
    ($name:ident) => {
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

string_id!(RouteId);
string_id!(StopId);
string_id!(DeliveryId);
string_id!(DriverId);

/// A geocoded point, (latitude, longitude) in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub lat: f64,
    pub lng: f64,
}

impl Location {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }
}

/// Meal period that scopes a route. A driver runs at most one route per
/// date+session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Session {
    Breakfast,
    Lunch,
    Dinner,
}

impl FromStr for Session {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "breakfast" => Ok(Session::Breakfast),
            "lunch" => Ok(Session::Lunch),
            "dinner" => Ok(Session::Dinner),
            other => Err(format!("unknown session: {other}")),
        }
    }
}

impl fmt::Display for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Session::Breakfast => "Breakfast",
            Session::Lunch => "Lunch",
            Session::Dinner => "Dinner",
        };
        f.write_str(name)
    }
}

/// Stop lifecycle: `Pending -> {Reached -> Delivered | CustomerUnavailable} | Skipped`.
///
/// `Reached` is optional; a driver may mark a stop `Delivered` directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StopStatus {
    Pending,
    Reached,
    Delivered,
    CustomerUnavailable,
    Skipped,
}

impl StopStatus {
    /// Terminal statuses admit no further mutation.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            StopStatus::Delivered | StopStatus::CustomerUnavailable | StopStatus::Skipped
        )
    }
}

impl FromStr for StopStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pending" => Ok(StopStatus::Pending),
            "reached" => Ok(StopStatus::Reached),
            "delivered" => Ok(StopStatus::Delivered),
            "customer_unavailable" | "customerunavailable" => Ok(StopStatus::CustomerUnavailable),
            "skipped" => Ok(StopStatus::Skipped),
            other => Err(format!("unknown stop status: {other}")),
        }
    }
}

/// Route lifecycle: `Planned -> InProgress -> Completed`. No transition
/// skips a state and there is no whole-route cancel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RouteStatus {
    Planned,
    InProgress,
    Completed,
}

/// One delivery address visited once within a route.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stop {
    pub stop_id: StopId,
    pub delivery_id: DeliveryId,
    /// Position within the owning route; always one of `1..=n`.
    pub planned_order: u32,
    pub address: String,
    pub location: Location,
    pub status: StopStatus,
    pub completed_at: Option<DateTime<Utc>>,
    pub comments: Option<String>,
    /// Engine-planned travel time from the previous position in seconds;
    /// the baseline against which traffic delay multipliers are computed.
    pub planned_travel_secs: u32,
}

impl Stop {
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}

/// An ordered set of stops assigned to one driver for one date+session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Route {
    pub route_id: RouteId,
    pub driver_id: DriverId,
    pub date: NaiveDate,
    pub session: Session,
    pub status: RouteStatus,
    pub started_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
    /// Kept sorted by `planned_order`.
    pub stops: Vec<Stop>,
}

impl Route {
    /// The current stop: first non-terminal stop in planned order, or
    /// `None` once every stop is terminal.
    pub fn current_stop(&self) -> Option<&Stop> {
        self.stops.iter().find(|stop| !stop.is_terminal())
    }

    /// Index of the current stop within `stops`.
    pub fn current_index(&self) -> Option<usize> {
        self.stops.iter().position(|stop| !stop.is_terminal())
    }

    pub fn all_stops_terminal(&self) -> bool {
        self.stops.iter().all(Stop::is_terminal)
    }

    /// Stops that are still Pending or Reached, in planned order.
    pub fn remaining_stops(&self) -> impl Iterator<Item = &Stop> {
        self.stops.iter().filter(|stop| !stop.is_terminal())
    }

    pub fn find_stop_by_id(&self, stop_id: &StopId) -> Option<usize> {
        self.stops.iter().position(|stop| &stop.stop_id == stop_id)
    }

    pub fn find_stop_by_order(&self, order: u32) -> Option<usize> {
        self.stops.iter().position(|stop| stop.planned_order == order)
    }

    pub fn find_stop_by_delivery(&self, delivery_id: &DeliveryId) -> Option<usize> {
        self.stops
            .iter()
            .position(|stop| &stop.delivery_id == delivery_id)
    }

    /// Rewrites `planned_order` to the contiguous sequence `1..=n`,
    /// preserving the current relative order of `stops`.
    pub fn renumber(&mut self) {
        for (index, stop) in self.stops.iter_mut().enumerate() {
            stop.planned_order = index as u32 + 1;
        }
    }

    /// Whether the order invariant holds: orders are exactly `1..=n`.
    pub fn order_is_contiguous(&self) -> bool {
        self.stops
            .iter()
            .enumerate()
            .all(|(index, stop)| stop.planned_order == index as u32 + 1)
    }

    /// Two routes share a planning scope when date and session match;
    /// stops may only move between routes in the same scope.
    pub fn same_scope(&self, other: &Route) -> bool {
        self.date == other.date && self.session == other.session
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stop(id: &str, order: u32, status: StopStatus) -> Stop {
        Stop {
            stop_id: StopId::new(id),
            delivery_id: DeliveryId::new(format!("d-{id}")),
            planned_order: order,
            address: String::new(),
            location: Location::new(0.0, 0.0),
            status,
            completed_at: None,
            comments: None,
            planned_travel_secs: 300,
        }
    }

    fn route(stops: Vec<Stop>) -> Route {
        Route {
            route_id: RouteId::new("r1"),
            driver_id: DriverId::new("drv"),
            date: NaiveDate::from_ymd_opt(2026, 3, 14).unwrap(),
            session: Session::Lunch,
            status: RouteStatus::InProgress,
            started_at: None,
            ended_at: None,
            stops,
        }
    }

    #[test]
    fn current_stop_is_first_non_terminal() {
        let r = route(vec![
            stop("s1", 1, StopStatus::Delivered),
            stop("s2", 2, StopStatus::Pending),
            stop("s3", 3, StopStatus::Pending),
        ]);
        assert_eq!(r.current_stop().unwrap().stop_id, StopId::new("s2"));
    }

    #[test]
    fn reached_stop_is_still_current() {
        let r = route(vec![
            stop("s1", 1, StopStatus::Reached),
            stop("s2", 2, StopStatus::Pending),
        ]);
        assert_eq!(r.current_stop().unwrap().stop_id, StopId::new("s1"));
    }

    #[test]
    fn no_current_stop_when_all_terminal() {
        let r = route(vec![
            stop("s1", 1, StopStatus::Delivered),
            stop("s2", 2, StopStatus::Skipped),
        ]);
        assert!(r.current_stop().is_none());
        assert!(r.all_stops_terminal());
    }

    #[test]
    fn renumber_restores_contiguity() {
        let mut r = route(vec![
            stop("s1", 1, StopStatus::Pending),
            stop("s3", 3, StopStatus::Pending),
            stop("s4", 4, StopStatus::Pending),
        ]);
        assert!(!r.order_is_contiguous());
        r.renumber();
        assert!(r.order_is_contiguous());
        let orders: Vec<u32> = r.stops.iter().map(|s| s.planned_order).collect();
        assert_eq!(orders, vec![1, 2, 3]);
    }

    #[test]
    fn session_parses_case_insensitively() {
        assert_eq!("LUNCH".parse::<Session>().unwrap(), Session::Lunch);
        assert!("brunch".parse::<Session>().is_err());
    }

    #[test]
    fn terminal_statuses() {
        assert!(!StopStatus::Pending.is_terminal());
        assert!(!StopStatus::Reached.is_terminal());
        assert!(StopStatus::Delivered.is_terminal());
        assert!(StopStatus::CustomerUnavailable.is_terminal());
        assert!(StopStatus::Skipped.is_terminal());
    }
}
