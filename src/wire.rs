//! JSON wire contract and request normalization.
//!
//! The historical clients of this API send the same fact under several
//! field names (`lat`/`latitude`, `planned_stop_id`/`stop_order`). Each
//! request type here accepts every known spelling and normalizes to one
//! canonical internal command in a single step. Aliases that conflict
//! with each other are rejected, never silently resolved.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::JourneyError;
use crate::journey::{MarkStop, StopRef};
use crate::model::{DeliveryId, DriverId, Location, RouteId, StopId, StopStatus};

/// A location under any accepted field spelling.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WireLocation {
    pub lat: Option<f64>,
    pub latitude: Option<f64>,
    pub lng: Option<f64>,
    pub lon: Option<f64>,
    pub longitude: Option<f64>,
}

fn pick_axis(name: &str, candidates: &[Option<f64>]) -> Result<Option<f64>, JourneyError> {
    let mut chosen: Option<f64> = None;
    for candidate in candidates.iter().flatten() {
        match chosen {
            None => chosen = Some(*candidate),
            Some(existing) if existing == *candidate => {}
            Some(existing) => {
                return Err(JourneyError::Validation(format!(
                    "conflicting {name} values: {existing} vs {candidate}"
                )));
            }
        }
    }
    Ok(chosen)
}

impl WireLocation {
    /// Canonical location, or an error when spellings conflict or an
    /// axis is missing.
    pub fn normalize(&self) -> Result<Location, JourneyError> {
        match self.normalize_optional()? {
            Some(location) => Ok(location),
            None => Err(JourneyError::Validation(
                "location requires both latitude and longitude".into(),
            )),
        }
    }

    /// As `normalize`, but a fully absent location is `None`.
    pub fn normalize_optional(&self) -> Result<Option<Location>, JourneyError> {
        let lat = pick_axis("latitude", &[self.lat, self.latitude])?;
        let lng = pick_axis("longitude", &[self.lng, self.lon, self.longitude])?;
        match (lat, lng) {
            (Some(lat), Some(lng)) => Ok(Some(Location::new(lat, lng))),
            (None, None) => Ok(None),
            _ => Err(JourneyError::Validation(
                "location requires both latitude and longitude".into(),
            )),
        }
    }
}

/// Stop identifier fields shared by mark/move requests. Preference
/// order: stable stop id, then planned order, then delivery id.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WireStopIdentifier {
    pub planned_stop_id: Option<StopId>,
    pub stop_order: Option<u32>,
    pub delivery_id: Option<DeliveryId>,
}

impl WireStopIdentifier {
    pub fn normalize(&self) -> Result<StopRef, JourneyError> {
        if let Some(id) = &self.planned_stop_id {
            return Ok(StopRef::Id(id.clone()));
        }
        if let Some(order) = self.stop_order {
            return Ok(StopRef::Order(order));
        }
        if let Some(delivery) = &self.delivery_id {
            return Ok(StopRef::Delivery(delivery.clone()));
        }
        Err(JourneyError::Validation(
            "one of planned_stop_id, stop_order, delivery_id is required".into(),
        ))
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct StartJourneyRequest {
    pub driver_id: DriverId,
    pub route_id: Option<RouteId>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MarkStopRequest {
    pub route_id: RouteId,
    pub driver_id: DriverId,
    #[serde(flatten)]
    pub stop: WireStopIdentifier,
    /// Defaults to Delivered when absent.
    pub status: Option<String>,
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub current_location: Option<WireLocation>,
    pub comments: Option<String>,
}

impl MarkStopRequest {
    pub fn normalize(&self) -> Result<MarkStop, JourneyError> {
        let status = match self.status.as_deref() {
            None => StopStatus::Delivered,
            Some(raw) => raw.parse().map_err(JourneyError::Validation)?,
        };
        let location = match &self.current_location {
            Some(wire) => wire.normalize_optional()?,
            None => None,
        };
        Ok(MarkStop {
            route_id: self.route_id.clone(),
            driver_id: self.driver_id.clone(),
            stop: self.stop.normalize()?,
            status,
            completed_at: self.completed_at,
            location,
            comments: self.comments.clone(),
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct EndJourneyRequest {
    pub user_id: DriverId,
    pub route_id: RouteId,
    #[serde(flatten)]
    pub location: WireLocation,
}

/// Reassignment in either form: a single driver update or an exchange.
#[derive(Debug, Clone, Deserialize)]
pub struct ReassignDriverRequest {
    pub route_id: Option<RouteId>,
    pub new_driver_name: Option<DriverId>,
    #[serde(default)]
    pub exchange: bool,
    pub route_id_1: Option<RouteId>,
    pub route_id_2: Option<RouteId>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReassignCommand {
    Single {
        route_id: RouteId,
        new_driver: DriverId,
    },
    Exchange {
        route_id_1: RouteId,
        route_id_2: RouteId,
    },
}

impl ReassignDriverRequest {
    pub fn normalize(&self) -> Result<ReassignCommand, JourneyError> {
        if self.exchange {
            if self.route_id.is_some() || self.new_driver_name.is_some() {
                return Err(JourneyError::Validation(
                    "exchange request must not carry route_id/new_driver_name".into(),
                ));
            }
            match (&self.route_id_1, &self.route_id_2) {
                (Some(route_id_1), Some(route_id_2)) => Ok(ReassignCommand::Exchange {
                    route_id_1: route_id_1.clone(),
                    route_id_2: route_id_2.clone(),
                }),
                _ => Err(JourneyError::Validation(
                    "exchange requires route_id_1 and route_id_2".into(),
                )),
            }
        } else {
            if self.route_id_1.is_some() || self.route_id_2.is_some() {
                return Err(JourneyError::Validation(
                    "route_id_1/route_id_2 are only valid with exchange=true".into(),
                ));
            }
            match (&self.route_id, &self.new_driver_name) {
                (Some(route_id), Some(new_driver)) => Ok(ReassignCommand::Single {
                    route_id: route_id.clone(),
                    new_driver: new_driver.clone(),
                }),
                _ => Err(JourneyError::Validation(
                    "reassign requires route_id and new_driver_name".into(),
                )),
            }
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct MoveStopRequest {
    pub from_route_id: RouteId,
    pub to_route_id: RouteId,
    #[serde(flatten)]
    pub stop_identifier: WireStopIdentifier,
    pub insert_at_order: Option<u32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TrafficCheckRequest {
    pub route_id: RouteId,
    pub current_location: WireLocation,
    #[serde(default)]
    pub check_all_segments: bool,
}

/// Structured error body for the transport layer: machine-readable kind,
/// human-readable message, suggested HTTP status.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorBody {
    pub kind: &'static str,
    pub message: String,
    pub status: u16,
}

impl From<&JourneyError> for ErrorBody {
    fn from(error: &JourneyError) -> Self {
        let kind = match error.kind() {
            crate::error::ErrorKind::Validation => "validation_error",
            crate::error::ErrorKind::NotFound => "not_found",
            crate::error::ErrorKind::InvalidState => "invalid_state",
            crate::error::ErrorKind::AlreadyTerminal => "already_terminal",
            crate::error::ErrorKind::IncompleteRoute => "incomplete_route",
            crate::error::ErrorKind::ExternalService => "external_service_error",
        };
        Self {
            kind,
            message: error.to_string(),
            status: error.kind().http_status(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn location_aliases_agree() {
        let wire: WireLocation =
            serde_json::from_str(r#"{"lat": 36.1, "latitude": 36.1, "lng": -115.1}"#).unwrap();
        let location = wire.normalize().unwrap();
        assert_eq!(location.lat, 36.1);
        assert_eq!(location.lng, -115.1);
    }

    #[test]
    fn conflicting_location_aliases_are_rejected() {
        let wire: WireLocation =
            serde_json::from_str(r#"{"lat": 36.1, "latitude": 36.2, "lng": -115.1}"#).unwrap();
        assert!(matches!(
            wire.normalize(),
            Err(JourneyError::Validation(_))
        ));
    }

    #[test]
    fn half_a_location_is_rejected() {
        let wire: WireLocation = serde_json::from_str(r#"{"latitude": 36.1}"#).unwrap();
        assert!(wire.normalize_optional().is_err());
    }

    #[test]
    fn stop_identifier_prefers_stable_id() {
        let wire: WireStopIdentifier =
            serde_json::from_str(r#"{"planned_stop_id": "s7", "stop_order": 3}"#).unwrap();
        assert_eq!(wire.normalize().unwrap(), StopRef::Id(StopId::new("s7")));
    }

    #[test]
    fn stop_identifier_falls_back_to_order_then_delivery() {
        let by_order: WireStopIdentifier =
            serde_json::from_str(r#"{"stop_order": 3, "delivery_id": "d1"}"#).unwrap();
        assert_eq!(by_order.normalize().unwrap(), StopRef::Order(3));

        let by_delivery: WireStopIdentifier =
            serde_json::from_str(r#"{"delivery_id": "d1"}"#).unwrap();
        assert_eq!(
            by_delivery.normalize().unwrap(),
            StopRef::Delivery(DeliveryId::new("d1"))
        );

        let empty = WireStopIdentifier::default();
        assert!(empty.normalize().is_err());
    }

    #[test]
    fn mark_status_defaults_to_delivered() {
        let request: MarkStopRequest = serde_json::from_str(
            r#"{"route_id": "r1", "driver_id": "drv", "delivery_id": "d1"}"#,
        )
        .unwrap();
        let command = request.normalize().unwrap();
        assert_eq!(command.status, StopStatus::Delivered);
    }

    #[test]
    fn mark_rejects_unknown_status() {
        let request: MarkStopRequest = serde_json::from_str(
            r#"{"route_id": "r1", "driver_id": "drv", "delivery_id": "d1", "status": "vanished"}"#,
        )
        .unwrap();
        assert!(request.normalize().is_err());
    }

    #[test]
    fn reassign_normalizes_both_forms() {
        let single: ReassignDriverRequest =
            serde_json::from_str(r#"{"route_id": "r1", "new_driver_name": "ada"}"#).unwrap();
        assert_eq!(
            single.normalize().unwrap(),
            ReassignCommand::Single {
                route_id: RouteId::new("r1"),
                new_driver: DriverId::new("ada"),
            }
        );

        let exchange: ReassignDriverRequest = serde_json::from_str(
            r#"{"exchange": true, "route_id_1": "r1", "route_id_2": "r2"}"#,
        )
        .unwrap();
        assert_eq!(
            exchange.normalize().unwrap(),
            ReassignCommand::Exchange {
                route_id_1: RouteId::new("r1"),
                route_id_2: RouteId::new("r2"),
            }
        );
    }

    #[test]
    fn mixed_reassign_forms_are_rejected() {
        let mixed: ReassignDriverRequest = serde_json::from_str(
            r#"{"exchange": true, "route_id": "r1", "route_id_1": "r1", "route_id_2": "r2"}"#,
        )
        .unwrap();
        assert!(mixed.normalize().is_err());

        let incomplete: ReassignDriverRequest =
            serde_json::from_str(r#"{"route_id": "r1"}"#).unwrap();
        assert!(incomplete.normalize().is_err());
    }

    #[test]
    fn end_journey_accepts_long_spellings() {
        let request: EndJourneyRequest = serde_json::from_str(
            r#"{"user_id": "drv", "route_id": "r1", "latitude": 36.1, "longitude": -115.1}"#,
        )
        .unwrap();
        let location = request.location.normalize().unwrap();
        assert_eq!(location.lng, -115.1);
    }

    #[test]
    fn move_traffic_and_start_requests_normalize() {
        let request: MoveStopRequest = serde_json::from_str(
            r#"{"from_route_id": "r1", "to_route_id": "r2", "delivery_id": "d1", "insert_at_order": 2}"#,
        )
        .unwrap();
        assert_eq!(
            request.stop_identifier.normalize().unwrap(),
            StopRef::Delivery(DeliveryId::new("d1"))
        );
        assert_eq!(request.insert_at_order, Some(2));

        let check: TrafficCheckRequest = serde_json::from_str(
            r#"{"route_id": "r1", "current_location": {"lat": 36.1, "lng": -115.1}}"#,
        )
        .unwrap();
        assert!(!check.check_all_segments);
        assert_eq!(check.current_location.normalize().unwrap().lat, 36.1);

        let start: StartJourneyRequest = serde_json::from_str(r#"{"driver_id": "ada"}"#).unwrap();
        assert!(start.route_id.is_none());
    }

    #[test]
    fn error_body_carries_kind_and_status() {
        let error = JourneyError::RouteNotFound(RouteId::new("r9"));
        let body = ErrorBody::from(&error);
        assert_eq!(body.kind, "not_found");
        assert_eq!(body.status, 404);
    }
}
