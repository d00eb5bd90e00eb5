//! # HKPT Common Library
//!
//! Shared code for the HKPT property-name translation service:
//! - Error type shared by the store and configuration layers
//! - TOML / environment configuration loading
//! - SQLite schema creation and reference-data seeding

pub mod config;
pub mod db;
pub mod error;

pub use error::{Error, Result};
