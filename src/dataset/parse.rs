//! Minimal CSV reader for the earthquake datasets.

use crate::dataset::RawRecord;
use crate::error::{AppError, Result};
use crate::models::FeatureName;
use tracing::debug;

/// Label column shared by every source
pub const LABEL_COLUMN: &str = "alert";

/// Split one CSV line into fields.
///
/// Handles quoted fields with embedded commas and doubled quotes. Fields are
/// trimmed.
pub fn split_line(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' if in_quotes && chars.peek() == Some(&'"') => {
                field.push('"');
                chars.next();
            }
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => {
                fields.push(field.trim().to_string());
                field.clear();
            }
            _ => field.push(c),
        }
    }
    fields.push(field.trim().to_string());
    fields
}

/// Parse CSV text into labelled records.
///
/// The header must name every feature column and the label column, in any
/// order and any case; other columns are ignored. Rows with a missing or
/// non-numeric feature, or an empty label, are skipped. Fails when a
/// required column is absent or no row survives.
pub fn parse_records(text: &str) -> Result<Vec<RawRecord>> {
    let mut lines = text
        .lines()
        .map(|l| l.trim_end_matches('\r'))
        .filter(|l| !l.trim().is_empty());

    let header = lines
        .next()
        .ok_or_else(|| AppError::DataAcquisition("empty CSV".to_string()))?;
    let columns: Vec<String> = split_line(header)
        .into_iter()
        .map(|c| c.to_lowercase())
        .collect();

    let column_index = |name: &str| {
        columns
            .iter()
            .position(|c| c == name)
            .ok_or_else(|| AppError::DataAcquisition(format!("missing required column '{}'", name)))
    };

    let mut feature_idx = [0usize; 5];
    for (slot, feature) in feature_idx.iter_mut().zip(FeatureName::canonical_order()) {
        *slot = column_index(&feature.to_string())?;
    }
    let label_idx = column_index(LABEL_COLUMN)?;

    let mut records = Vec::new();
    let mut skipped = 0usize;
    for line in lines {
        match parse_row(&split_line(line), &feature_idx, label_idx) {
            Some(record) => records.push(record),
            None => skipped += 1,
        }
    }

    debug!(rows = records.len(), skipped, "Parsed CSV");

    if records.is_empty() {
        return Err(AppError::DataAcquisition(
            "no usable rows in CSV".to_string(),
        ));
    }
    Ok(records)
}

fn parse_row(fields: &[String], feature_idx: &[usize; 5], label_idx: usize) -> Option<RawRecord> {
    let mut values = [0.0; 5];
    for (value, &idx) in values.iter_mut().zip(feature_idx) {
        let parsed: f64 = fields.get(idx)?.parse().ok()?;
        if !parsed.is_finite() {
            return None;
        }
        *value = parsed;
    }

    let label = fields.get(label_idx)?;
    if label.is_empty() {
        return None;
    }

    Some(RawRecord {
        values,
        label: label.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_quoted_fields() {
        let fields = split_line(r#"7.1,"Tokyo, Japan",22.5,"say ""hi""",green"#);
        assert_eq!(
            fields,
            vec!["7.1", "Tokyo, Japan", "22.5", r#"say "hi""#, "green"]
        );
    }

    #[test]
    fn test_split_trailing_empty_field() {
        assert_eq!(split_line("a,,b,"), vec!["a", "", "b", ""]);
    }

    #[test]
    fn test_parse_reorders_columns() {
        let csv = "title,Alert,sig,mmi,cdi,depth,magnitude\n\
                   \"Quake, north\",orange,650,7,6,12.5,6.8\n";
        let records = parse_records(csv).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].values, [6.8, 12.5, 6.0, 7.0, 650.0]);
        assert_eq!(records[0].label, "orange");
    }

    #[test]
    fn test_parse_skips_unusable_rows() {
        let csv = "magnitude,depth,cdi,mmi,sig,alert\r\n\
                   6.5,10,5,6,500,yellow\r\n\
                   ,10,5,6,500,yellow\r\n\
                   6.5,deep,5,6,500,yellow\r\n\
                   6.5,10,5,6,500,\r\n\
                   6.5,10,5\r\n\
                   \r\n\
                   7.0,20,6,7,800,red\r\n";
        let records = parse_records(csv).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].label, "red");
    }

    #[test]
    fn test_missing_column_fails() {
        let csv = "magnitude,depth,cdi,mmi,alert\n6.5,10,5,6,green\n";
        let err = parse_records(csv).unwrap_err();
        assert!(matches!(err, AppError::DataAcquisition(_)));
        assert!(err.to_string().contains("sig"));
    }

    #[test]
    fn test_no_usable_rows_fails() {
        let csv = "magnitude,depth,cdi,mmi,sig,alert\nx,y,z,w,v,green\n";
        assert!(parse_records(csv).is_err());
        assert!(parse_records("").is_err());
    }
}
