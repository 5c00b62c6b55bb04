//! Scoring engine: normalization, oracle invocation, verdict mapping.

use crate::models::forest::{AnomalyDetector, Decision, Label, OracleError};
use crate::models::scaler::StandardScaler;
use crate::types::verdict::Verdict;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

/// Severity bands for the externally visible fraud score. Anomalous
/// verdicts must always score strictly above normal ones.
const FRAUD_SCORE_ANOMALOUS: u8 = 80;
const FRAUD_SCORE_NORMAL: u8 = 10;

/// Certainty bands, higher for anomalous verdicts.
const CONFIDENCE_ANOMALOUS: f64 = 0.9;
const CONFIDENCE_NORMAL: f64 = 0.6;

/// Failures below the feature extractor. All variants are server faults;
/// the degenerate-scaler case is a configuration fault that load-time
/// validation normally catches first.
#[derive(Debug, Error)]
pub enum ScoreError {
    #[error("normalization scale at position {index} is zero or non-finite")]
    DegenerateScaler { index: usize },

    #[error("feature vector has {got} values, scaler was fitted for {expected}")]
    DimensionMismatch { expected: usize, got: usize },

    #[error("anomaly oracle failed: {0}")]
    ScoringFailure(#[from] OracleError),
}

/// Immutable scoring pipeline handle built once at startup.
///
/// Holds the fitted normalization parameters and the anomaly oracle;
/// `score` is a pure function of its input, so one engine is safely
/// shared across arbitrarily many concurrent calls.
pub struct ScoringEngine {
    scaler: StandardScaler,
    oracle: Arc<dyn AnomalyDetector>,
}

impl ScoringEngine {
    /// Create an engine from already-fitted parameters and oracle.
    pub fn new(scaler: StandardScaler, oracle: Arc<dyn AnomalyDetector>) -> Self {
        Self { scaler, oracle }
    }

    /// Score an ordered feature vector.
    ///
    /// Normalizes against the fitted statistics, asks the oracle for a
    /// label, and maps it to a verdict. Never mutates shared state and
    /// never defaults a verdict on failure.
    pub fn score(&self, features: &[f64]) -> Result<Verdict, ScoreError> {
        let scaled = self.normalize(features)?;
        let decision = self.oracle.decide(&scaled)?;
        let verdict = map_verdict(&decision);

        debug!(
            oracle = %self.oracle.name(),
            is_fraud = verdict.is_fraud,
            anomaly_score = verdict.anomaly_score,
            "Scoring complete"
        );

        Ok(verdict)
    }

    /// scaled[i] = (x[i] - mean[i]) / scale[i]. A zero scale would have
    /// been rejected at artifact load; the check here guards against a
    /// handle constructed without that validation.
    fn normalize(&self, features: &[f64]) -> Result<Vec<f64>, ScoreError> {
        if features.len() != self.scaler.len() {
            return Err(ScoreError::DimensionMismatch {
                expected: self.scaler.len(),
                got: features.len(),
            });
        }

        features
            .iter()
            .enumerate()
            .map(|(i, &value)| {
                let scale = self.scaler.scale[i];
                if scale == 0.0 || !scale.is_finite() {
                    return Err(ScoreError::DegenerateScaler { index: i });
                }
                Ok((value - self.scaler.mean[i]) / scale)
            })
            .collect()
    }

    /// Number of features the engine expects per vector.
    pub fn feature_count(&self) -> usize {
        self.scaler.len()
    }

    /// Name of the oracle backing this engine.
    pub fn oracle_name(&self) -> &str {
        self.oracle.name()
    }
}

/// Map an oracle decision to the externally visible verdict. The label
/// alone determines `is_fraud`, `fraud_score` and `confidence`; the raw
/// decision value is passed through unchanged as `anomaly_score`.
fn map_verdict(decision: &Decision) -> Verdict {
    let is_fraud = decision.label == Label::Anomalous;

    Verdict {
        is_fraud,
        fraud_score: if is_fraud {
            FRAUD_SCORE_ANOMALOUS
        } else {
            FRAUD_SCORE_NORMAL
        },
        confidence: if is_fraud {
            CONFIDENCE_ANOMALOUS
        } else {
            CONFIDENCE_NORMAL
        },
        anomaly_score: decision.score,
    }
}
