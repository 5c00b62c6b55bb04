//! Inbound scoring request structures

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A transaction submitted for fraud scoring.
///
/// The feature attributes arrive as a loosely-typed mapping and are only
/// validated by the feature extractor, so that a missing or malformed
/// attribute can be reported by name instead of failing deserialization
/// wholesale.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScoreRequest {
    /// Caller-assigned identifier, echoed in logs and replies.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transaction_id: Option<String>,

    /// Raw attribute map, in no particular order. Never mutated.
    #[serde(flatten)]
    pub attributes: Map<String, Value>,
}

impl ScoreRequest {
    /// Create a request from an attribute map.
    pub fn new(attributes: Map<String, Value>) -> Self {
        Self {
            transaction_id: None,
            attributes,
        }
    }

    /// Attach a caller-assigned transaction id.
    pub fn with_transaction_id(mut self, id: impl Into<String>) -> Self {
        self.transaction_id = Some(id.into());
        self
    }
}
