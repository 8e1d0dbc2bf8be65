//! Seeded synthetic training data.
//!
//! Features are drawn uniformly from their domains and labelled with the
//! same risk-score rule used as the inference fallback.

use crate::dataset::RawRecord;
use crate::error::{AppError, Result};
use crate::ml::rules::rule_based_alert;
use crate::models::{FeatureName, SeismicObservation};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyntheticSpec {
    pub n_samples: usize,
    pub seed: u64,
}

impl Default for SyntheticSpec {
    fn default() -> Self {
        Self {
            n_samples: 1000,
            seed: 42,
        }
    }
}

impl SyntheticSpec {
    pub fn generate(&self) -> Result<Vec<RawRecord>> {
        generate(self.n_samples, self.seed)
    }
}

/// Generate `n` labelled rows. The same seed always yields the same rows.
pub fn generate(n: usize, seed: u64) -> Result<Vec<RawRecord>> {
    if n == 0 {
        return Err(AppError::DataAcquisition(
            "synthetic sample count must be positive".to_string(),
        ));
    }

    let mut rng = StdRng::seed_from_u64(seed);
    let mut sample = |feature: FeatureName| {
        let (low, high) = feature.domain();
        rng.gen_range(low..=high)
    };

    (0..n)
        .map(|_| -> Result<RawRecord> {
            let magnitude = sample(FeatureName::Magnitude);
            let depth = sample(FeatureName::Depth);
            let cdi = sample(FeatureName::Cdi);
            let mmi = sample(FeatureName::Mmi);
            let sig = sample(FeatureName::Sig).round() as i32;

            let observation = SeismicObservation::new(magnitude, depth, cdi, mmi, sig)?;
            Ok(RawRecord {
                values: [magnitude, depth, cdi, mmi, f64::from(sig)],
                label: rule_based_alert(&observation).code().to_string(),
            })
        })
        .collect()
}
