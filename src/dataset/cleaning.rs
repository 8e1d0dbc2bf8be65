use crate::dataset::RawRecord;
use crate::error::{AppError, Result};
use crate::ml::models::TrainingDataset;
use crate::models::{AlertClass, FeatureName};
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::{info, warn};

/// Row counts through each cleaning step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CleaningReport {
    pub input_rows: usize,
    pub duplicates_removed: usize,
    pub unknown_labels_dropped: usize,
    pub output_rows: usize,
}

/// Deduplicate, normalise labels and encode into a training dataset.
///
/// Duplicates are exact matches on all feature values and the raw label.
/// Labels are trimmed and lowercased; rows whose label is not an alert code
/// are dropped.
pub fn clean_records(records: &[RawRecord]) -> Result<(TrainingDataset, CleaningReport)> {
    let mut seen = HashSet::new();
    let unique: Vec<&RawRecord> = records
        .iter()
        .filter(|r| seen.insert((r.values.map(f64::to_bits), r.label.as_str())))
        .collect();
    let duplicates_removed = records.len() - unique.len();

    let mut rows = Vec::with_capacity(unique.len() * 5);
    let mut labels = Vec::with_capacity(unique.len());
    let mut unknown = 0usize;

    for record in unique {
        let normalized = record.label.trim().to_lowercase();
        match AlertClass::parse_label(&normalized).filter(|c| c.code() == normalized) {
            Some(class) => {
                rows.extend_from_slice(&record.values);
                labels.push(class.encoded());
            }
            None => {
                warn!(label = %record.label, "Dropping row with unknown alert label");
                unknown += 1;
            }
        }
    }

    if labels.is_empty() {
        return Err(AppError::DataAcquisition(
            "no labelled rows remain after cleaning".to_string(),
        ));
    }

    let report = CleaningReport {
        input_rows: records.len(),
        duplicates_removed,
        unknown_labels_dropped: unknown,
        output_rows: labels.len(),
    };
    info!(
        input = report.input_rows,
        duplicates = report.duplicates_removed,
        unknown = report.unknown_labels_dropped,
        output = report.output_rows,
        "Cleaned dataset"
    );

    let features = Array2::from_shape_vec((labels.len(), 5), rows)
        .map_err(|e| AppError::Training(format!("Failed to build feature matrix: {}", e)))?;
    let dataset = TrainingDataset::new(features, labels, FeatureName::canonical_order())?;

    Ok((dataset, report))
}
