//! Training data acquisition.
//!
//! Remote CSV sources are tried in order. When every one of them fails, a
//! seeded synthetic dataset labelled by the risk-score rule is generated
//! instead.

pub mod cleaning;
pub mod parse;
pub mod remote;
pub mod synthetic;

use crate::config::DataConfig;
use crate::error::{AppError, Result};
use crate::models::FeatureName;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use tracing::{info, warn};

pub use cleaning::{clean_records, CleaningReport};
pub use remote::RemoteSource;
pub use synthetic::SyntheticSpec;

/// One labelled row before encoding
#[derive(Debug, Clone, PartialEq)]
pub struct RawRecord {
    /// Feature values in [`FeatureName::canonical_order`]
    pub values: [f64; 5],

    /// Alert label as found in the source
    pub label: String,
}

impl RawRecord {
    pub fn value(&self, feature: FeatureName) -> f64 {
        self.values[feature as usize]
    }
}

/// Where a training dataset came from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DataOrigin {
    Remote { url: String },
    Synthetic { seed: u64, n_samples: usize },
}

impl fmt::Display for DataOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataOrigin::Remote { url } => write!(f, "remote ({})", url),
            DataOrigin::Synthetic { seed, n_samples } => {
                write!(f, "synthetic ({} samples, seed {})", n_samples, seed)
            }
        }
    }
}

/// Records plus their origin
#[derive(Debug, Clone)]
pub struct AcquiredData {
    pub origin: DataOrigin,
    pub records: Vec<RawRecord>,
}

/// Ordered fallback chain over remote sources and synthetic generation
#[derive(Debug, Clone)]
pub struct DataAcquirer {
    sources: Vec<String>,
    timeout: Duration,
    synthetic: SyntheticSpec,
}

impl DataAcquirer {
    pub fn new(sources: Vec<String>, timeout: Duration, synthetic: SyntheticSpec) -> Self {
        Self {
            sources,
            timeout,
            synthetic,
        }
    }

    pub fn from_config(config: &DataConfig) -> Self {
        Self::new(
            config.sources.clone(),
            Duration::from_secs(config.request_timeout_secs),
            SyntheticSpec {
                n_samples: config.synthetic_samples,
                seed: config.seed,
            },
        )
    }

    /// Skip the remote sources entirely
    pub fn synthetic_only(mut self) -> Self {
        self.sources.clear();
        self
    }

    pub async fn acquire(&self) -> Result<AcquiredData> {
        if !self.sources.is_empty() {
            let client = reqwest::Client::builder()
                .timeout(self.timeout)
                .build()
                .map_err(AppError::from)?;

            for url in &self.sources {
                let source = RemoteSource::new(client.clone(), url.clone());
                match source.fetch().await {
                    Ok(records) => {
                        info!(url = %url, rows = records.len(), "Loaded remote dataset");
                        return Ok(AcquiredData {
                            origin: DataOrigin::Remote { url: url.clone() },
                            records,
                        });
                    }
                    Err(e) => warn!(url = %url, error = %e, "Data source failed, trying next"),
                }
            }
            warn!("All remote sources failed, generating synthetic data");
        }

        let records = self.synthetic.generate().map_err(|e| {
            AppError::DataAcquisition(format!("all data sources exhausted: {}", e))
        })?;
        info!(
            rows = records.len(),
            seed = self.synthetic.seed,
            "Generated synthetic dataset"
        );

        Ok(AcquiredData {
            origin: DataOrigin::Synthetic {
                seed: self.synthetic.seed,
                n_samples: self.synthetic.n_samples,
            },
            records,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_value_lookup() {
        let record = RawRecord {
            values: [6.0, 10.0, 5.0, 7.0, 500.0],
            label: "red".to_string(),
        };
        assert_eq!(record.value(FeatureName::Magnitude), 6.0);
        assert_eq!(record.value(FeatureName::Sig), 500.0);
    }

    #[test]
    fn test_origin_display() {
        let origin = DataOrigin::Synthetic {
            seed: 42,
            n_samples: 1000,
        };
        assert_eq!(origin.to_string(), "synthetic (1000 samples, seed 42)");
    }

    #[tokio::test]
    async fn test_synthetic_only_skips_remote() {
        let acquirer = DataAcquirer::new(
            vec!["http://127.0.0.1:9/unreachable.csv".to_string()],
            Duration::from_secs(1),
            SyntheticSpec {
                n_samples: 50,
                seed: 7,
            },
        )
        .synthetic_only();

        let data = acquirer.acquire().await.unwrap();
        assert_eq!(data.records.len(), 50);
        assert!(matches!(data.origin, DataOrigin::Synthetic { seed: 7, .. }));
    }

    #[tokio::test]
    async fn test_exhaustion_is_fatal() {
        let acquirer = DataAcquirer::new(
            Vec::new(),
            Duration::from_secs(1),
            SyntheticSpec {
                n_samples: 0,
                seed: 7,
            },
        );
        let err = acquirer.acquire().await.unwrap_err();
        assert!(matches!(err, AppError::DataAcquisition(_)));
    }
}
