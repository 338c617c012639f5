//! In-memory route registry with per-route exclusive locking.
//!
//! Every mutating operation holds the owning route's lock for its full
//! duration, so readers never observe a renumbering half-done. Operations
//! touching two routes (`exchange_drivers`, `move_stop`) always lock in
//! ascending `RouteId` order, which rules out lock-order deadlock.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};

use chrono::NaiveDate;

use crate::error::JourneyError;
use crate::model::{DriverId, Route, RouteId, RouteStatus, Session, StopId};

#[derive(Default)]
pub struct RouteStore {
    routes: RwLock<HashMap<RouteId, Arc<Mutex<Route>>>>,
    next_id: AtomicU64,
}

fn recover<T>(result: Result<T, PoisonError<T>>) -> T {
    result.unwrap_or_else(PoisonError::into_inner)
}

impl RouteStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_route_id(&self) -> RouteId {
        RouteId::new(format!("route-{}", self.next_id.fetch_add(1, Ordering::Relaxed) + 1))
    }

    pub fn next_stop_id(&self) -> StopId {
        StopId::new(format!("stop-{}", self.next_id.fetch_add(1, Ordering::Relaxed) + 1))
    }

    /// Inserts a route, replacing any previous route with the same id.
    pub fn insert(&self, route: Route) {
        let mut routes = recover(self.routes.write());
        routes.insert(route.route_id.clone(), Arc::new(Mutex::new(route)));
    }

    pub fn remove(&self, route_id: &RouteId) -> bool {
        recover(self.routes.write()).remove(route_id).is_some()
    }

    fn handle(&self, route_id: &RouteId) -> Result<Arc<Mutex<Route>>, JourneyError> {
        recover(self.routes.read())
            .get(route_id)
            .cloned()
            .ok_or_else(|| JourneyError::RouteNotFound(route_id.clone()))
    }

    /// Runs `f` with exclusive access to one route.
    pub fn with_route<T>(
        &self,
        route_id: &RouteId,
        f: impl FnOnce(&mut Route) -> Result<T, JourneyError>,
    ) -> Result<T, JourneyError> {
        let handle = self.handle(route_id)?;
        let mut guard = recover(handle.lock());
        f(&mut guard)
    }

    /// Runs `f` with exclusive access to two distinct routes, locked in
    /// ascending `RouteId` order regardless of argument order. `f` sees
    /// the routes in the same order as the arguments.
    pub fn with_route_pair<T>(
        &self,
        first: &RouteId,
        second: &RouteId,
        f: impl FnOnce(&mut Route, &mut Route) -> Result<T, JourneyError>,
    ) -> Result<T, JourneyError> {
        if first == second {
            return Err(JourneyError::Validation(
                "operation requires two distinct routes".into(),
            ));
        }
        let first_handle = self.handle(first)?;
        let second_handle = self.handle(second)?;

        let (mut first_guard, mut second_guard): (MutexGuard<'_, Route>, MutexGuard<'_, Route>) =
            if first < second {
                let first_guard = recover(first_handle.lock());
                let second_guard = recover(second_handle.lock());
                (first_guard, second_guard)
            } else {
                let second_guard = recover(second_handle.lock());
                let first_guard = recover(first_handle.lock());
                (first_guard, second_guard)
            };

        f(&mut first_guard, &mut second_guard)
    }

    /// Clones a consistent point-in-time copy of a route.
    pub fn snapshot(&self, route_id: &RouteId) -> Result<Route, JourneyError> {
        self.with_route(route_id, |route| Ok(route.clone()))
    }

    /// Ids of all routes in `Planned` state assigned to `driver_id`.
    pub fn planned_routes_for_driver(&self, driver_id: &DriverId) -> Vec<RouteId> {
        let routes = recover(self.routes.read());
        let mut found: Vec<RouteId> = routes
            .values()
            .filter_map(|handle| {
                let route = recover(handle.lock());
                (route.driver_id == *driver_id && route.status == RouteStatus::Planned)
                    .then(|| route.route_id.clone())
            })
            .collect();
        found.sort();
        found
    }

    /// The route (if any) for one driver in one date+session scope,
    /// with its current status.
    pub fn route_for_scope(
        &self,
        driver_id: &DriverId,
        date: NaiveDate,
        session: Session,
    ) -> Option<(RouteId, RouteStatus)> {
        let routes = recover(self.routes.read());
        routes.values().find_map(|handle| {
            let route = recover(handle.lock());
            (route.driver_id == *driver_id && route.date == date && route.session == session)
                .then(|| (route.route_id.clone(), route.status))
        })
    }
}
