use crate::error::{AppError, Result};
use crate::models::{FeatureName, SeismicObservation};
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::str::FromStr;

/// The column order a model was trained with.
///
/// Inference rows are always built by looking values up by name and laying
/// them out in this order, never by position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureOrder {
    names: Vec<FeatureName>,
}

impl FeatureOrder {
    pub fn new(names: Vec<FeatureName>) -> Result<Self> {
        if names.is_empty() {
            return Err(AppError::Validation("feature order is empty".to_string()));
        }
        let mut seen = HashSet::new();
        if let Some(dup) = names.iter().find(|n| !seen.insert(**n)) {
            return Err(AppError::Validation(format!(
                "feature '{}' appears more than once",
                dup
            )));
        }
        Ok(Self { names })
    }

    /// Parse persisted column names
    pub fn from_names<S: AsRef<str>>(names: &[S]) -> Result<Self> {
        let parsed = names
            .iter()
            .map(|n| {
                FeatureName::from_str(n.as_ref().trim()).map_err(|_| {
                    AppError::Validation(format!("unknown feature '{}'", n.as_ref()))
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Self::new(parsed)
    }

    /// Order of the canonical training columns
    pub fn canonical() -> Self {
        Self {
            names: FeatureName::canonical_order(),
        }
    }

    pub fn names(&self) -> &[FeatureName] {
        &self.names
    }

    pub fn to_strings(&self) -> Vec<String> {
        self.names.iter().map(|n| n.to_string()).collect()
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Reindex name-keyed values into a single (1 × n) row
    pub fn frame(&self, values: &HashMap<FeatureName, f64>) -> Result<Array2<f64>> {
        let row = self
            .names
            .iter()
            .map(|name| {
                values.get(name).copied().ok_or_else(|| {
                    AppError::Inference(format!("missing value for feature '{}'", name))
                })
            })
            .collect::<Result<Vec<f64>>>()?;

        Array2::from_shape_vec((1, row.len()), row)
            .map_err(|e| AppError::Inference(format!("Failed to create feature array: {}", e)))
    }

    pub fn frame_observation(&self, observation: &SeismicObservation) -> Result<Array2<f64>> {
        self.frame(&observation.feature_map())
    }
}

/// Presentation-facing contribution score of one feature (0–100)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureContribution {
    pub feature: FeatureName,
    pub label: String,
    pub score: f64,
    /// `false` for features whose reported score lowers severity (depth)
    pub increases_severity: bool,
}

/// Heuristic contribution scores, normalised against each feature's domain.
///
/// These are not model importances. Each score is bounded to [0, 100] and
/// rises as the value approaches its high-severity end.
pub fn feature_contributions(observation: &SeismicObservation) -> Vec<FeatureContribution> {
    let percent = |value: f64, scale: f64| (value / scale * 100.0).clamp(0.0, 100.0);

    let depth_score = ((100.0 - observation.depth_km() / 700.0 * 100.0) * 0.5).clamp(0.0, 100.0);
    let sig = f64::from(observation.significance()).abs();

    [
        (FeatureName::Magnitude, percent(observation.magnitude(), 10.0), true),
        (FeatureName::Mmi, percent(observation.mmi(), 12.0), true),
        (FeatureName::Cdi, percent(observation.cdi(), 10.0), true),
        (FeatureName::Sig, percent(sig, 1000.0), true),
        (FeatureName::Depth, depth_score, false),
    ]
    .into_iter()
    .map(|(feature, score, increases_severity)| FeatureContribution {
        feature,
        label: feature.label().to_string(),
        score,
        increases_severity,
    })
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_follows_loaded_order() {
        let order = FeatureOrder::from_names(&["magnitude", "depth", "cdi", "mmi", "sig"]).unwrap();
        let obs = SeismicObservation::new(5.8, 10.5, 4.2, 6.5, 450).unwrap();

        let row = order.frame_observation(&obs).unwrap();
        assert_eq!(row.shape(), &[1, 5]);
        assert_eq!(row.row(0).to_vec(), vec![5.8, 10.5, 4.2, 6.5, 450.0]);
    }

    #[test]
    fn test_frame_ignores_insertion_order() {
        let order = FeatureOrder::canonical();
        let mut values = HashMap::new();
        values.insert(FeatureName::Sig, 450.0);
        values.insert(FeatureName::Mmi, 6.5);
        values.insert(FeatureName::Depth, 10.5);
        values.insert(FeatureName::Cdi, 4.2);
        values.insert(FeatureName::Magnitude, 5.8);

        let row = order.frame(&values).unwrap();
        assert_eq!(row.row(0).to_vec(), vec![5.8, 10.5, 4.2, 6.5, 450.0]);
    }

    #[test]
    fn test_frame_permuted_order() {
        let order = FeatureOrder::from_names(&["sig", "mmi", "cdi", "depth", "magnitude"]).unwrap();
        let obs = SeismicObservation::new(5.8, 10.5, 4.2, 6.5, 450).unwrap();
        let row = order.frame_observation(&obs).unwrap();
        assert_eq!(row.row(0).to_vec(), vec![450.0, 6.5, 4.2, 10.5, 5.8]);
    }

    #[test]
    fn test_frame_missing_value_is_inference_error() {
        let order = FeatureOrder::canonical();
        let values = HashMap::from([(FeatureName::Magnitude, 5.0)]);
        assert!(matches!(order.frame(&values), Err(AppError::Inference(_))));
    }

    #[test]
    fn test_invalid_orders_rejected() {
        assert!(FeatureOrder::from_names(&["magnitude", "magnitude"]).is_err());
        assert!(FeatureOrder::from_names(&["magnitude", "latitude"]).is_err());
        assert!(FeatureOrder::from_names::<&str>(&[]).is_err());
    }

    #[test]
    fn test_contributions_bounded_at_domain_edges() {
        let edges = [
            SeismicObservation::new(1.0, 0.1, 1.0, 1.0, -1000).unwrap(),
            SeismicObservation::new(10.0, 700.0, 10.0, 12.0, 1000).unwrap(),
            SeismicObservation::new(10.0, 0.1, 10.0, 12.0, 0).unwrap(),
            SeismicObservation::new(1.0, 700.0, 1.0, 1.0, 0).unwrap(),
        ];
        for obs in &edges {
            let contributions = feature_contributions(obs);
            assert_eq!(contributions.len(), 5);
            for c in contributions {
                assert!((0.0..=100.0).contains(&c.score), "{:?}", c);
            }
        }
    }

    #[test]
    fn test_contribution_values() {
        let obs = SeismicObservation::new(5.0, 350.0, 4.0, 6.0, -500).unwrap();
        let scores: HashMap<FeatureName, f64> = feature_contributions(&obs)
            .into_iter()
            .map(|c| (c.feature, c.score))
            .collect();

        assert!((scores[&FeatureName::Magnitude] - 50.0).abs() < 1e-9);
        assert!((scores[&FeatureName::Mmi] - 50.0).abs() < 1e-9);
        assert!((scores[&FeatureName::Cdi] - 40.0).abs() < 1e-9);
        assert!((scores[&FeatureName::Sig] - 50.0).abs() < 1e-9);
        assert!((scores[&FeatureName::Depth] - 25.0).abs() < 1e-9);
    }

    #[test]
    fn test_shallower_depth_scores_higher() {
        let shallow = SeismicObservation::new(5.0, 10.0, 4.0, 6.0, 0).unwrap();
        let deep = SeismicObservation::new(5.0, 600.0, 4.0, 6.0, 0).unwrap();
        let depth = |o: &SeismicObservation| {
            feature_contributions(o)
                .into_iter()
                .find(|c| c.feature == FeatureName::Depth)
                .map(|c| (c.score, c.increases_severity))
                .unwrap()
        };
        assert!(depth(&shallow).0 > depth(&deep).0);
        assert!(!depth(&shallow).1);
    }
}
