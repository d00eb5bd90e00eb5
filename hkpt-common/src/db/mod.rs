//! Database schema and reference data

pub mod init;
pub mod seed;

pub use init::*;
pub use seed::{seed_geo_locations, GEO_LOCATIONS};
