//! Feature extraction for fraud scoring model inference.
//!
//! This module turns a loosely-typed request record into the ordered
//! numeric vector the fitted model expects. The attribute order below
//! must match the order used when the scaler and forest artifacts were
//! fitted; reordering silently corrupts every downstream score.

use serde_json::{Map, Value};
use thiserror::Error;

/// Feature attribute names, in fitted order.
pub const FEATURE_COLUMNS: [&str; 6] = [
    "amount",
    "hour",
    "category",
    "merchant_freq",
    "amount_deviation",
    "velocity",
];

/// Version of the feature layout shared with the offline trainer.
/// Bumped on any change to [`FEATURE_COLUMNS`] order or membership.
pub const SCHEMA_VERSION: u32 = 1;

/// Validation failures while building a feature vector. All variants are
/// caller faults.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ExtractError {
    #[error("no usable input record supplied")]
    EmptyInput,

    #[error("missing required feature: {name}")]
    MissingFeature { name: String },

    #[error("feature {name} is not a finite number: {value}")]
    InvalidFeature { name: String, value: String },
}

/// Ordered feature layout shared between offline fitting and serving.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeatureSchema {
    version: u32,
    columns: Vec<String>,
}

impl FeatureSchema {
    /// The layout the currently deployed artifacts were fitted against.
    pub fn current() -> Self {
        Self {
            version: SCHEMA_VERSION,
            columns: FEATURE_COLUMNS.iter().map(|c| c.to_string()).collect(),
        }
    }

    /// Build an arbitrary layout. Fitting and serving must agree on it.
    pub fn new(version: u32, columns: Vec<String>) -> Self {
        Self { version, columns }
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

impl Default for FeatureSchema {
    fn default() -> Self {
        Self::current()
    }
}

/// Feature extractor that transforms request records into model input.
pub struct FeatureExtractor {
    schema: FeatureSchema,
}

impl FeatureExtractor {
    /// Create an extractor for the given feature layout.
    pub fn new(schema: FeatureSchema) -> Self {
        Self { schema }
    }

    /// Extract an ordered feature vector from a raw record.
    ///
    /// Attributes are read in schema order regardless of record insertion
    /// order. Validation short-circuits on the first missing or
    /// non-numeric attribute. The record is never mutated.
    pub fn extract(&self, record: &Map<String, Value>) -> Result<Vec<f64>, ExtractError> {
        if record.is_empty() {
            return Err(ExtractError::EmptyInput);
        }

        let mut features = Vec::with_capacity(self.schema.len());
        for name in self.schema.columns() {
            let value = record.get(name).ok_or_else(|| ExtractError::MissingFeature {
                name: name.clone(),
            })?;

            let numeric = coerce_numeric(value).ok_or_else(|| ExtractError::InvalidFeature {
                name: name.clone(),
                value: value.to_string(),
            })?;

            features.push(numeric);
        }

        Ok(features)
    }

    /// Get the number of features produced.
    pub fn feature_count(&self) -> usize {
        self.schema.len()
    }

    /// Get the feature layout this extractor was built with.
    pub fn schema(&self) -> &FeatureSchema {
        &self.schema
    }
}

impl Default for FeatureExtractor {
    fn default() -> Self {
        Self::new(FeatureSchema::current())
    }
}

/// Coerce a JSON value to a finite f64. Numbers and numeric strings are
/// accepted; null, booleans, arrays, objects and non-numeric strings are
/// not. Never coerces to a default.
fn coerce_numeric(value: &Value) -> Option<f64> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed.filter(|v| v.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(fields: &[(&str, Value)]) -> Map<String, Value> {
        fields
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    fn complete_record() -> Map<String, Value> {
        record(&[
            ("amount", json!(500.0)),
            ("hour", json!(14)),
            ("category", json!(2)),
            ("merchant_freq", json!(30)),
            ("amount_deviation", json!(1.0)),
            ("velocity", json!(2)),
        ])
    }

    #[test]
    fn test_extraction_in_schema_order() {
        let extractor = FeatureExtractor::default();

        let features = extractor.extract(&complete_record()).unwrap();

        assert_eq!(features, vec![500.0, 14.0, 2.0, 30.0, 1.0, 2.0]);
    }

    #[test]
    fn test_extraction_ignores_insertion_order() {
        let extractor = FeatureExtractor::default();

        // Same values inserted back to front.
        let reversed = record(&[
            ("velocity", json!(2)),
            ("amount_deviation", json!(1.0)),
            ("merchant_freq", json!(30)),
            ("category", json!(2)),
            ("hour", json!(14)),
            ("amount", json!(500.0)),
        ]);

        assert_eq!(
            extractor.extract(&reversed).unwrap(),
            extractor.extract(&complete_record()).unwrap()
        );
    }

    #[test]
    fn test_swapped_values_change_vector() {
        let extractor = FeatureExtractor::default();

        let mut swapped = complete_record();
        swapped.insert("amount".to_string(), json!(14));
        swapped.insert("hour".to_string(), json!(500.0));

        let original = extractor.extract(&complete_record()).unwrap();
        let crossed = extractor.extract(&swapped).unwrap();

        assert_ne!(original, crossed);
        assert_eq!(crossed[0], 14.0);
        assert_eq!(crossed[1], 500.0);
    }

    #[test]
    fn test_each_missing_feature_named() {
        let extractor = FeatureExtractor::default();

        for name in FEATURE_COLUMNS {
            let mut partial = complete_record();
            partial.remove(name);

            let err = extractor.extract(&partial).unwrap_err();
            assert_eq!(
                err,
                ExtractError::MissingFeature {
                    name: name.to_string()
                }
            );
        }
    }

    #[test]
    fn test_first_missing_feature_wins() {
        let extractor = FeatureExtractor::default();

        let mut partial = complete_record();
        partial.remove("hour");
        partial.remove("velocity");

        // "hour" comes first in schema order.
        let err = extractor.extract(&partial).unwrap_err();
        assert_eq!(
            err,
            ExtractError::MissingFeature {
                name: "hour".to_string()
            }
        );
    }

    #[test]
    fn test_empty_record_detected_before_field_checks() {
        let extractor = FeatureExtractor::default();

        let err = extractor.extract(&Map::new()).unwrap_err();
        assert_eq!(err, ExtractError::EmptyInput);
    }

    #[test]
    fn test_non_numeric_amount_rejected_not_zeroed() {
        let extractor = FeatureExtractor::default();

        let mut bad = complete_record();
        bad.insert("amount".to_string(), json!("a lot"));

        match extractor.extract(&bad).unwrap_err() {
            ExtractError::InvalidFeature { name, .. } => assert_eq!(name, "amount"),
            other => panic!("expected InvalidFeature, got {other:?}"),
        }
    }

    #[test]
    fn test_null_and_bool_rejected() {
        let extractor = FeatureExtractor::default();

        for bad_value in [json!(null), json!(true)] {
            let mut bad = complete_record();
            bad.insert("velocity".to_string(), bad_value);

            match extractor.extract(&bad).unwrap_err() {
                ExtractError::InvalidFeature { name, .. } => assert_eq!(name, "velocity"),
                other => panic!("expected InvalidFeature, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_numeric_strings_coerce() {
        let extractor = FeatureExtractor::default();

        let mut stringy = complete_record();
        stringy.insert("amount".to_string(), json!("5200.5"));

        let features = extractor.extract(&stringy).unwrap();
        assert_eq!(features[0], 5200.5);
    }

    #[test]
    fn test_feature_count_matches_schema() {
        let extractor = FeatureExtractor::default();
        assert_eq!(extractor.feature_count(), FEATURE_COLUMNS.len());
    }
}
