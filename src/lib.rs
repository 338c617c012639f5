//! route-journey core
//!
//! Delivery-route stop lifecycle: plan materialization, journey state
//! machine, reassignment, and traffic-triggered re-sequencing. The
//! geospatial optimizer itself is external, reached via `traits`.

pub mod engine;
pub mod error;
pub mod haversine;
pub mod journey;
pub mod model;
pub mod plan;
pub mod reassign;
pub mod store;
pub mod traffic;
pub mod traits;
pub mod wire;
