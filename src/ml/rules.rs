//! Deterministic rule-based classification.
//!
//! A single linear risk score labels synthetic training rows and backs up
//! inference when the model output cannot be decoded.

use crate::models::{AlertClass, SeismicObservation};

/// Linear risk score over the raw feature values.
///
/// `0.3*magnitude + 0.15*(100 - depth)/100 + 0.2*cdi + 0.25*mmi + 0.1*sig/1000`
pub fn risk_score(observation: &SeismicObservation) -> f64 {
    0.3 * observation.magnitude()
        + 0.15 * (100.0 - observation.depth_km()) / 100.0
        + 0.2 * observation.cdi()
        + 0.25 * observation.mmi()
        + 0.1 * f64::from(observation.significance()) / 1000.0
}

/// Alert class from the risk score. Total over every valid observation.
pub fn rule_based_alert(observation: &SeismicObservation) -> AlertClass {
    AlertClass::from_risk(risk_score(observation))
}
