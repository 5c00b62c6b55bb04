//! Fraud verdict and reply envelope structures

use serde::{Deserialize, Serialize};

/// Final fraud assessment returned for one transaction.
///
/// `is_fraud`, `fraud_score` and `confidence` are functions of the oracle
/// label alone, so every anomalous verdict scores strictly higher than
/// every normal one. `anomaly_score` additionally exposes the oracle's
/// continuous decision-function value unchanged (negative = anomalous)
/// for callers that want a graduated signal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Verdict {
    /// Whether the transaction was labelled anomalous.
    #[serde(rename = "isFraud")]
    pub is_fraud: bool,

    /// Integer severity estimate in [0, 100].
    #[serde(rename = "fraudScore")]
    pub fraud_score: u8,

    /// Certainty estimate in (0, 1].
    pub confidence: f64,

    /// Raw decision-function value from the oracle.
    #[serde(rename = "anomalyScore")]
    pub anomaly_score: f64,
}

/// Which side has to fix a failed request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Fault {
    /// Malformed or incomplete caller input; resubmit with corrected data.
    Client,
    /// Internal failure; retrying the same input is pointless.
    Server,
}

/// Reply envelope for requests that could not be scored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub fault: Fault,
}

impl ErrorResponse {
    pub fn new(fault: Fault, error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            fault,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verdict_serialization() {
        let verdict = Verdict {
            is_fraud: true,
            fraud_score: 80,
            confidence: 0.9,
            anomaly_score: -0.42,
        };

        let json = serde_json::to_string(&verdict).unwrap();
        assert!(json.contains("\"isFraud\":true"));
        assert!(json.contains("\"fraudScore\":80"));
        assert!(json.contains("\"anomalyScore\":-0.42"));

        let deserialized: Verdict = serde_json::from_str(&json).unwrap();
        assert_eq!(verdict, deserialized);
    }

    #[test]
    fn test_error_response_fault_wire_format() {
        let reply = ErrorResponse::new(Fault::Client, "missing required feature: amount");

        let json = serde_json::to_string(&reply).unwrap();
        assert!(json.contains("\"fault\":\"client\""));

        let reply = ErrorResponse::new(Fault::Server, "anomaly oracle failed");
        let json = serde_json::to_string(&reply).unwrap();
        assert!(json.contains("\"fault\":\"server\""));
    }
}
