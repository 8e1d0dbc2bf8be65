use crate::error::{AppError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use strum::{Display, EnumIter, EnumString, IntoEnumIterator};
use validator::Validate;

/// Feature column names shared by the dataset, the feature-order artifact
/// and inference framing
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    EnumString,
    Display,
    EnumIter,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum FeatureName {
    Magnitude,
    Depth,
    Cdi,
    Mmi,
    Sig,
}

impl FeatureName {
    /// Training-time column order of the source dataset
    pub fn canonical_order() -> Vec<FeatureName> {
        FeatureName::iter().collect()
    }

    /// Inclusive domain range of the feature
    pub fn domain(&self) -> (f64, f64) {
        match self {
            FeatureName::Magnitude => (1.0, 10.0),
            FeatureName::Depth => (0.1, 700.0),
            FeatureName::Cdi => (1.0, 10.0),
            FeatureName::Mmi => (1.0, 12.0),
            FeatureName::Sig => (-1000.0, 1000.0),
        }
    }

    /// Human readable label
    pub fn label(&self) -> &'static str {
        match self {
            FeatureName::Magnitude => "Magnitude",
            FeatureName::Depth => "Depth",
            FeatureName::Cdi => "CDI",
            FeatureName::Mmi => "MMI",
            FeatureName::Sig => "Significance",
        }
    }
}

/// One set of seismic parameters submitted for prediction
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Validate)]
pub struct SeismicObservation {
    /// Richter magnitude
    #[validate(range(min = 1.0, max = 10.0))]
    magnitude: f64,

    /// Hypocentre depth in kilometres
    #[serde(alias = "depth")]
    #[validate(range(min = 0.1, max = 700.0))]
    depth_km: f64,

    /// Community Decimal Intensity
    #[validate(range(min = 1.0, max = 10.0))]
    cdi: f64,

    /// Modified Mercalli Intensity
    #[validate(range(min = 1.0, max = 12.0))]
    mmi: f64,

    /// Composite significance score
    #[serde(alias = "sig")]
    #[validate(range(min = -1000, max = 1000))]
    significance: i32,
}

impl SeismicObservation {
    /// Build a validated observation
    pub fn new(magnitude: f64, depth_km: f64, cdi: f64, mmi: f64, significance: i32) -> Result<Self> {
        let observation = Self {
            magnitude,
            depth_km,
            cdi,
            mmi,
            significance,
        };
        observation.check()?;
        Ok(observation)
    }

    /// Validate an observation built by deserialization.
    ///
    /// Non-finite values are refused before the range checks, which NaN
    /// would otherwise pass.
    pub fn check(&self) -> Result<()> {
        if let Some(feature) = FeatureName::iter().find(|&f| !self.value(f).is_finite()) {
            return Err(AppError::Validation(format!(
                "{} must be a finite number",
                feature
            )));
        }
        self.validate()?;
        Ok(())
    }

    pub fn magnitude(&self) -> f64 {
        self.magnitude
    }

    pub fn depth_km(&self) -> f64 {
        self.depth_km
    }

    pub fn cdi(&self) -> f64 {
        self.cdi
    }

    pub fn mmi(&self) -> f64 {
        self.mmi
    }

    pub fn significance(&self) -> i32 {
        self.significance
    }

    /// Value of a single feature column
    pub fn value(&self, feature: FeatureName) -> f64 {
        match feature {
            FeatureName::Magnitude => self.magnitude,
            FeatureName::Depth => self.depth_km,
            FeatureName::Cdi => self.cdi,
            FeatureName::Mmi => self.mmi,
            FeatureName::Sig => f64::from(self.significance),
        }
    }

    /// Feature values keyed by column name
    pub fn feature_map(&self) -> HashMap<FeatureName, f64> {
        FeatureName::iter().map(|f| (f, self.value(f))).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_valid_observation() {
        let obs = SeismicObservation::new(5.8, 10.5, 4.2, 6.5, 450).unwrap();
        assert_eq!(obs.magnitude(), 5.8);
        assert_eq!(obs.value(FeatureName::Depth), 10.5);
        assert_eq!(obs.value(FeatureName::Sig), 450.0);
    }

    #[test]
    fn test_out_of_range_rejected() {
        assert!(SeismicObservation::new(10.5, 10.0, 4.0, 6.0, 0).is_err());
        assert!(SeismicObservation::new(5.0, 0.0, 4.0, 6.0, 0).is_err());
        assert!(SeismicObservation::new(5.0, 10.0, 4.0, 12.5, 0).is_err());
        assert!(SeismicObservation::new(5.0, 10.0, 4.0, 6.0, 1001).is_err());
        assert!(SeismicObservation::new(5.0, 10.0, 4.0, 6.0, -1000).is_ok());
    }

    #[test]
    fn test_non_finite_rejected() {
        for bad in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            let err = SeismicObservation::new(bad, 10.0, 4.0, 6.0, 0).unwrap_err();
            assert!(matches!(err, AppError::Validation(_)));
            assert!(SeismicObservation::new(5.0, bad, 4.0, 6.0, 0).is_err());
            assert!(SeismicObservation::new(5.0, 10.0, bad, 6.0, 0).is_err());
            assert!(SeismicObservation::new(5.0, 10.0, 4.0, bad, 0).is_err());
        }
    }

    #[test]
    fn test_feature_names_parse() {
        assert_eq!(FeatureName::from_str("sig").unwrap(), FeatureName::Sig);
        assert_eq!(FeatureName::Magnitude.to_string(), "magnitude");
        assert!(FeatureName::from_str("latitude").is_err());
        assert_eq!(FeatureName::canonical_order().len(), 5);
    }

    #[test]
    fn test_deserialize_with_aliases() {
        let obs: SeismicObservation = serde_json::from_str(
            r#"{"magnitude": 6.1, "depth": 33.0, "cdi": 5.0, "mmi": 7.0, "sig": 600}"#,
        )
        .unwrap();
        assert_eq!(obs.depth_km(), 33.0);
        assert_eq!(obs.significance(), 600);
    }

    #[test]
    fn test_feature_map_keys() {
        let obs = SeismicObservation::new(5.8, 10.5, 4.2, 6.5, 450).unwrap();
        let map = obs.feature_map();
        assert_eq!(map.len(), 5);
        assert_eq!(map[&FeatureName::Cdi], 4.2);
    }
}
