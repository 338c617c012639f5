//! HTTP adapter for the external routing engine.
//!
//! One blocking client covers both seams: the optimizer (`/plan`,
//! `/resequence`) and the live travel-time service (`/eta`). Failures
//! surface as `EngineError`; callers leave route state untouched.

use serde::Deserialize;

use crate::error::EngineError;
use crate::model::{Location, StopId};
use crate::traits::{PlanOutcome, PlanRequest, Planner, ResequenceRequest, TravelTimeProvider};

#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub base_url: String,
    pub timeout_secs: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080".to_string(),
            timeout_secs: 10,
        }
    }
}

#[derive(Debug, Clone)]
pub struct EngineClient {
    config: EngineConfig,
    client: reqwest::blocking::Client,
}

impl EngineClient {
    pub fn new(config: EngineConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::blocking::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self { config, client })
    }
}

#[derive(Debug, Deserialize)]
struct ResequenceResponse {
    order: Vec<StopId>,
}

#[derive(Debug, Deserialize)]
struct EtaResponse {
    duration_secs: f64,
}

impl Planner for EngineClient {
    fn plan(&self, request: &PlanRequest) -> Result<PlanOutcome, EngineError> {
        let url = format!("{}/plan", self.config.base_url);
        let outcome = self
            .client
            .post(url)
            .json(request)
            .send()?
            .error_for_status()?
            .json::<PlanOutcome>()?;
        Ok(outcome)
    }

    fn resequence(&self, request: &ResequenceRequest) -> Result<Vec<StopId>, EngineError> {
        let url = format!("{}/resequence", self.config.base_url);
        let response = self
            .client
            .post(url)
            .json(request)
            .send()?
            .error_for_status()?
            .json::<ResequenceResponse>()?;
        Ok(response.order)
    }
}

impl TravelTimeProvider for EngineClient {
    fn travel_secs(&self, from: Location, to: Location) -> Result<u32, EngineError> {
        let url = format!(
            "{}/eta?from={:.6},{:.6}&to={:.6},{:.6}",
            self.config.base_url, from.lat, from.lng, to.lat, to.lng
        );
        let response = self
            .client
            .get(url)
            .send()?
            .error_for_status()?
            .json::<EtaResponse>()?;
        if !response.duration_secs.is_finite() || response.duration_secs < 0.0 {
            return Err(EngineError::Malformed(format!(
                "eta returned invalid duration {}",
                response.duration_secs
            )));
        }
        Ok(response.duration_secs.round() as u32)
    }
}
