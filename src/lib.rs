//! Overpass-QL query building and a lazy coverage index over tiled rasters

pub mod canvas;
pub mod config;
pub mod errors;
pub mod metrics;
pub mod models;
pub mod overpass;
pub mod query;
pub mod utils;

pub use errors::{Result, SkywayError};
