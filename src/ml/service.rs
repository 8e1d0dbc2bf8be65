use crate::error::{AppError, Result};
use crate::ml::artifacts::{ArtifactPaths, TrainedModel};
use crate::ml::classifier::Classifier;
use crate::ml::features::{feature_contributions, FeatureContribution, FeatureOrder};
use crate::ml::forest::argmax;
use crate::ml::models::ModelMetadata;
use crate::ml::rules::rule_based_alert;
use crate::models::{AlertClass, AlertInfo, RawClass, SeismicObservation};
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, warn};
use uuid::Uuid;

/// Process-wide predictor, loaded on first use and never refreshed
static PREDICTOR: OnceCell<Arc<ImpactPredictor>> = OnceCell::new();

/// Load the artifacts once per process and return the shared predictor.
///
/// Later calls return the cached predictor and ignore `paths`. A failed load
/// is returned to the caller and nothing is cached.
pub fn global_predictor(paths: &ArtifactPaths) -> Result<Arc<ImpactPredictor>> {
    PREDICTOR
        .get_or_try_init(|| TrainedModel::load(paths).map(|m| Arc::new(ImpactPredictor::from(m))))
        .cloned()
}

/// Where the alert class of a prediction came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PredictionSource {
    /// Decoded from the classifier output
    Model,

    /// Classifier output was not a known class; the risk-score rule decided
    RuleFallback,
}

/// Complete answer for one observation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictionResult {
    pub alert: AlertClass,
    pub info: AlertInfo,

    /// Probability of the top class (0.0 - 1.0)
    pub confidence: f64,

    /// Class probabilities keyed by alert code
    pub probabilities: BTreeMap<String, f64>,

    pub source: PredictionSource,
    pub contributions: Vec<FeatureContribution>,
    pub recommendations: Vec<String>,

    /// Training run that produced the model, when loaded from artifacts
    pub model_run_id: Option<Uuid>,
}

/// Maps observations to alert predictions with a fixed model and column order
pub struct ImpactPredictor {
    classifier: Box<dyn Classifier>,
    feature_order: FeatureOrder,
    run_id: Option<Uuid>,
}

impl ImpactPredictor {
    pub fn new(classifier: Box<dyn Classifier>, feature_order: FeatureOrder) -> Self {
        Self {
            classifier,
            feature_order,
            run_id: None,
        }
    }

    pub fn feature_order(&self) -> &FeatureOrder {
        &self.feature_order
    }

    pub fn metadata(&self) -> &ModelMetadata {
        self.classifier.metadata()
    }

    pub fn run_id(&self) -> Option<Uuid> {
        self.run_id
    }

    /// Predict the alert class for one observation.
    ///
    /// Framing and model failures come back as [`AppError::Inference`]; an
    /// undecodable class never does, it falls back to the risk-score rule.
    pub fn predict(&self, observation: &SeismicObservation) -> Result<PredictionResult> {
        let row = self.feature_order.frame_observation(observation)?;

        let predicted = self.classifier.predict(&row).map_err(as_inference)?;
        let proba = self.classifier.predict_proba(&row).map_err(as_inference)?;

        let raw = predicted
            .first()
            .copied()
            .ok_or_else(|| AppError::Inference("model returned no prediction".to_string()))?;
        if proba.nrows() != 1 || proba.ncols() == 0 {
            return Err(AppError::Inference(format!(
                "unexpected probability shape {:?}",
                proba.shape()
            )));
        }
        let probs = proba.row(0);
        let confidence = probs[argmax(probs.view())];

        let (alert, source) = match RawClass::from(raw).decode() {
            Some(alert) => (alert, PredictionSource::Model),
            None => {
                let alert = rule_based_alert(observation);
                warn!(raw_class = raw, fallback = %alert, "Unknown model class, using rule fallback");
                (alert, PredictionSource::RuleFallback)
            }
        };

        let probabilities = probs
            .iter()
            .enumerate()
            .filter_map(|(i, &p)| AlertClass::from_encoded(i).map(|c| (c.code().to_string(), p)))
            .collect();

        debug!(alert = %alert, confidence, ?source, "Prediction complete");

        Ok(PredictionResult {
            alert,
            info: alert.info(),
            confidence,
            probabilities,
            source,
            contributions: feature_contributions(observation),
            recommendations: alert
                .recommendations()
                .iter()
                .map(|r| r.to_string())
                .collect(),
            model_run_id: self.run_id,
        })
    }
}

impl From<TrainedModel> for ImpactPredictor {
    fn from(model: TrainedModel) -> Self {
        Self {
            classifier: Box::new(model.classifier),
            feature_order: model.feature_order,
            run_id: Some(model.run_id),
        }
    }
}

fn as_inference(err: AppError) -> AppError {
    match err {
        AppError::Inference(_) => err,
        other => AppError::Inference(other.to_string()),
    }
}
