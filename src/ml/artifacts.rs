//! Persisted model and feature-order artifacts.
//!
//! Both files carry the id of the training run that produced them. They are
//! written through temporary files and renamed only after both writes
//! succeed. Loading rejects a pair whose run ids differ.

use crate::error::{AppError, Result};
use crate::ml::classifier::{Classifier, RandomForestClassifier};
use crate::ml::features::FeatureOrder;
use crate::models::N_CLASSES;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;
use uuid::Uuid;

/// Locations of the two artifacts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactPaths {
    pub model: PathBuf,
    pub feature_order: PathBuf,
}

impl ArtifactPaths {
    /// Default file names inside `dir`
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self {
            model: dir.join("earthquake_impact_rf.bin"),
            feature_order: dir.join("feature_order.json"),
        }
    }
}

/// On-disk form of the model artifact (bincode)
#[derive(Debug, Serialize, Deserialize)]
struct ModelArtifact {
    run_id: Uuid,
    classifier: RandomForestClassifier,
}

/// On-disk form of the feature-order artifact (JSON)
#[derive(Debug, Serialize, Deserialize)]
pub struct FeatureOrderArtifact {
    pub run_id: Uuid,
    pub features: Vec<String>,
}

/// A fitted classifier together with the column order it was trained on
#[derive(Debug, Clone)]
pub struct TrainedModel {
    pub run_id: Uuid,
    pub classifier: RandomForestClassifier,
    pub feature_order: FeatureOrder,
}

impl TrainedModel {
    /// Stamp a freshly trained classifier with a new run id
    pub fn new(classifier: RandomForestClassifier, feature_order: FeatureOrder) -> Result<Self> {
        check_consistency(&classifier, &feature_order)?;
        Ok(Self {
            run_id: Uuid::new_v4(),
            classifier,
            feature_order,
        })
    }

    /// Write both artifacts. Nothing becomes visible unless both writes succeed.
    pub fn save(&self, paths: &ArtifactPaths) -> Result<()> {
        let model_bytes = bincode::serialize(&ModelArtifact {
            run_id: self.run_id,
            classifier: self.classifier.clone(),
        })?;
        let order_json = serde_json::to_vec_pretty(&FeatureOrderArtifact {
            run_id: self.run_id,
            features: self.feature_order.to_strings(),
        })?;

        for path in [&paths.model, &paths.feature_order] {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent)?;
            }
        }

        let model_tmp = tmp_path(&paths.model);
        let order_tmp = tmp_path(&paths.feature_order);

        let staged = fs::write(&model_tmp, &model_bytes)
            .and_then(|_| fs::write(&order_tmp, &order_json));
        if let Err(e) = staged {
            let _ = fs::remove_file(&model_tmp);
            let _ = fs::remove_file(&order_tmp);
            return Err(e.into());
        }

        fs::rename(&model_tmp, &paths.model)?;
        fs::rename(&order_tmp, &paths.feature_order)?;

        info!(
            run_id = %self.run_id,
            model = %paths.model.display(),
            feature_order = %paths.feature_order.display(),
            "Saved model artifacts"
        );
        Ok(())
    }

    /// Read and cross-check both artifacts
    pub fn load(paths: &ArtifactPaths) -> Result<Self> {
        let model_bytes = fs::read(&paths.model).map_err(|e| {
            AppError::ModelLoad(format!("cannot read {}: {}", paths.model.display(), e))
        })?;
        let artifact: ModelArtifact = bincode::deserialize(&model_bytes).map_err(|e| {
            AppError::ModelLoad(format!("corrupt model {}: {}", paths.model.display(), e))
        })?;

        let order = read_feature_order(&paths.feature_order)?;

        if order.run_id != artifact.run_id {
            return Err(AppError::ModelLoad(format!(
                "feature order (run {}) does not belong to model (run {})",
                order.run_id, artifact.run_id
            )));
        }

        let feature_order = FeatureOrder::from_names(&order.features)
            .map_err(|e| AppError::ModelLoad(e.to_string()))?;
        check_consistency(&artifact.classifier, &feature_order)?;

        info!(
            run_id = %artifact.run_id,
            features = ?order.features,
            "Loaded model artifacts"
        );

        Ok(Self {
            run_id: artifact.run_id,
            classifier: artifact.classifier,
            feature_order,
        })
    }
}

/// Read only the feature-order artifact
pub fn read_feature_order(path: &Path) -> Result<FeatureOrderArtifact> {
    let bytes = fs::read(path)
        .map_err(|e| AppError::ModelLoad(format!("cannot read {}: {}", path.display(), e)))?;
    serde_json::from_slice(&bytes)
        .map_err(|e| AppError::ModelLoad(format!("corrupt feature order {}: {}", path.display(), e)))
}

fn check_consistency(classifier: &RandomForestClassifier, order: &FeatureOrder) -> Result<()> {
    let forest = classifier
        .forest()
        .ok_or_else(|| AppError::ModelLoad("model is not trained".to_string()))?;
    if forest.n_classes() != N_CLASSES {
        return Err(AppError::ModelLoad(format!(
            "model has {} classes, expected {}",
            forest.n_classes(),
            N_CLASSES
        )));
    }
    forest.check_structure()?;
    if classifier.n_features() != order.len() {
        return Err(AppError::ModelLoad(format!(
            "model expects {} features but feature order lists {}",
            classifier.n_features(),
            order.len()
        )));
    }
    Ok(())
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".tmp");
    PathBuf::from(name)
}
