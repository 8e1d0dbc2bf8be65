use crate::api::AppState;
use crate::error::Result;
use crate::ml::{ForestParams, ModelMetrics, PredictionResult};
use crate::models::{AlertClass, SeismicObservation};
use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> Result<Json<HealthResponse>> {
    Ok(Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.started_at.elapsed().as_secs(),
        model_run_id: state.predictor.run_id(),
    }))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_seconds: u64,
    pub model_run_id: Option<Uuid>,
}

/// Describe the loaded model
pub async fn model_info(State(state): State<AppState>) -> Result<Json<ModelInfoResponse>> {
    let predictor = &state.predictor;
    let metadata = predictor.metadata();

    Ok(Json(ModelInfoResponse {
        run_id: predictor.run_id(),
        name: metadata.name.clone(),
        version: metadata.version.clone(),
        trained_at: metadata.trained_at,
        n_training_samples: metadata.n_training_samples,
        feature_order: predictor.feature_order().to_strings(),
        classes: AlertClass::all().iter().map(|c| c.code().to_string()).collect(),
        hyperparameters: metadata.hyperparameters.clone(),
        cv_score: metadata.cv_score,
        validation_metrics: metadata.validation_metrics.clone(),
    }))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ModelInfoResponse {
    pub run_id: Option<Uuid>,
    pub name: String,
    pub version: String,
    pub trained_at: DateTime<Utc>,
    pub n_training_samples: usize,
    pub feature_order: Vec<String>,
    pub classes: Vec<String>,
    pub hyperparameters: ForestParams,
    pub cv_score: Option<f64>,
    pub validation_metrics: Option<ModelMetrics>,
}

/// Predict the alert level for one observation
pub async fn predict(
    State(state): State<AppState>,
    payload: std::result::Result<Json<SeismicObservation>, JsonRejection>,
) -> Result<Json<PredictionResult>> {
    let Json(observation) = payload?;
    observation.check()?;

    let result = state.predictor.predict(&observation)?;
    tracing::info!(
        alert = %result.alert,
        confidence = result.confidence,
        source = ?result.source,
        "Served prediction"
    );

    Ok(Json(result))
}
