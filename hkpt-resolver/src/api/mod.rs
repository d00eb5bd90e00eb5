//! HTTP API handlers for hkpt-resolver

pub mod health;
pub mod stats;
pub mod translate;

pub use health::health_routes;
pub use stats::stats_routes;
pub use translate::translate_routes;
