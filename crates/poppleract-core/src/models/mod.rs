//! Configuration and parameter models.

pub mod config;
pub mod params;
