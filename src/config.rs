use crate::ml::artifacts::ArtifactPaths;
use crate::ml::search::SearchSpace;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// HTTP serving configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Artifact locations shared by training and inference
    #[serde(default)]
    pub artifacts: ArtifactConfig,

    /// Training data acquisition
    #[serde(default)]
    pub data: DataConfig,

    /// Model selection and evaluation
    #[serde(default)]
    pub training: TrainingConfig,

    /// Observability configuration
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

impl Config {
    /// Load configuration from the embedded defaults, an optional file and environment
    pub fn load() -> Result<Self, config::ConfigError> {
        let config_path = std::env::var("IMPACTSENSE_CONFIG")
            .unwrap_or_else(|_| "config/impactsense.toml".to_string());

        config::Config::builder()
            // Start with default values
            .add_source(config::File::from_str(
                include_str!("../config/default.toml"),
                config::FileFormat::Toml,
            ))
            // Override with config file if it exists
            .add_source(config::File::with_name(&config_path).required(false))
            // Override with environment variables (prefix: IMPACTSENSE_)
            .add_source(
                config::Environment::with_prefix("IMPACTSENSE")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// HTTP server host
    #[serde(default = "default_host")]
    pub host: String,

    /// HTTP server port
    #[serde(default = "default_http_port")]
    pub http_port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            http_port: default_http_port(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactConfig {
    /// Directory holding both artifacts
    #[serde(default = "default_artifact_dir")]
    pub dir: PathBuf,

    /// Model artifact file name
    #[serde(default = "default_model_file")]
    pub model_file: String,

    /// Feature-order artifact file name
    #[serde(default = "default_feature_order_file")]
    pub feature_order_file: String,
}

impl ArtifactConfig {
    pub fn paths(&self) -> ArtifactPaths {
        ArtifactPaths {
            model: self.dir.join(&self.model_file),
            feature_order: self.dir.join(&self.feature_order_file),
        }
    }
}

impl Default for ArtifactConfig {
    fn default() -> Self {
        Self {
            dir: default_artifact_dir(),
            model_file: default_model_file(),
            feature_order_file: default_feature_order_file(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataConfig {
    /// Remote CSV sources, tried in order
    #[serde(default = "default_sources")]
    pub sources: Vec<String>,

    /// Per-source request timeout (seconds)
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Rows to synthesize when every remote source fails
    #[serde(default = "default_synthetic_samples")]
    pub synthetic_samples: usize,

    /// Seed for synthetic generation
    #[serde(default = "default_seed")]
    pub seed: u64,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            sources: default_sources(),
            request_timeout_secs: default_request_timeout(),
            synthetic_samples: default_synthetic_samples(),
            seed: default_seed(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingConfig {
    /// Seed for splitting, fold assignment, search sampling and tree growth
    #[serde(default = "default_seed")]
    pub seed: u64,

    /// Held-out fraction for final evaluation
    #[serde(default = "default_test_size")]
    pub test_size: f64,

    /// Number of stratified CV folds
    #[serde(default = "default_cv_folds")]
    pub cv_folds: usize,

    /// Number of sampled configurations
    #[serde(default = "default_n_iter")]
    pub n_iter: usize,

    /// Hyperparameter grid
    #[serde(default)]
    pub search: SearchSpace,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            seed: default_seed(),
            test_size: default_test_size(),
            cv_folds: default_cv_folds(),
            n_iter: default_n_iter(),
            search: SearchSpace::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// Default tracing filter when RUST_LOG is unset
    #[serde(default = "default_log_filter")]
    pub log_filter: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_filter: default_log_filter(),
        }
    }
}

// Default value functions
fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_http_port() -> u16 {
    8080
}

fn default_artifact_dir() -> PathBuf {
    PathBuf::from("artifacts")
}

fn default_model_file() -> String {
    "earthquake_impact_rf.bin".to_string()
}

fn default_feature_order_file() -> String {
    "feature_order.json".to_string()
}

fn default_sources() -> Vec<String> {
    vec![
        "https://raw.githubusercontent.com/anushkadhiman/AI-impactSense/main/dataset/earthquake.csv"
            .to_string(),
        "https://raw.githubusercontent.com/holtzy/Data_to_Viz/master/Story/earthquake/earthquake.csv"
            .to_string(),
    ]
}

fn default_request_timeout() -> u64 {
    30
}

fn default_synthetic_samples() -> usize {
    1000
}

fn default_seed() -> u64 {
    42
}

fn default_test_size() -> f64 {
    0.2
}

fn default_cv_folds() -> usize {
    5
}

fn default_n_iter() -> usize {
    20
}

fn default_log_filter() -> String {
    "impactsense=info,tower_http=info".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_values() {
        assert_eq!(default_http_port(), 8080);
        assert_eq!(default_seed(), 42);
        assert_eq!(default_cv_folds(), 5);
        assert_eq!(default_n_iter(), 20);
        assert_eq!(default_sources().len(), 2);
    }

    #[test]
    fn test_artifact_paths() {
        let paths = ArtifactConfig::default().paths();
        assert_eq!(paths.model, PathBuf::from("artifacts/earthquake_impact_rf.bin"));
        assert_eq!(paths.feature_order, PathBuf::from("artifacts/feature_order.json"));
    }

    #[test]
    fn test_embedded_defaults_parse() {
        let config: Config = config::Config::builder()
            .add_source(config::File::from_str(
                include_str!("../config/default.toml"),
                config::FileFormat::Toml,
            ))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert_eq!(config.server.http_port, 8080);
        assert_eq!(config.training.search.n_estimators, vec![200, 300, 500]);
        assert_eq!(config.data.synthetic_samples, 1000);
    }
}
