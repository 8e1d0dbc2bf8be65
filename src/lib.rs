//! ImpactSense: earthquake impact alert prediction.
//!
//! Trains a random-forest classifier that maps five seismic parameters to a
//! four-level alert (green, yellow, orange, red) and serves predictions with
//! confidence, contribution scores and response recommendations.

pub mod api;
pub mod config;
pub mod dataset;
pub mod error;
pub mod ml;
pub mod models;

pub use error::{AppError, Result};
