//! NATS request-reply handling for scoring requests
//!
//! The request boundary is where pipeline failures become fault replies:
//! extractor failures are the caller's to fix, everything below the
//! extractor is ours. No retries, no partial verdicts.

use crate::feature_extractor::FeatureExtractor;
use crate::models::scoring::ScoringEngine;
use crate::types::record::ScoreRequest;
use crate::types::verdict::{ErrorResponse, Fault, Verdict};
use anyhow::Result;
use async_nats::{Client, Subject, Subscriber};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;

/// Request-reply server endpoints for scoring and liveness probes.
pub struct ScoreServer {
    client: Client,
    score_subject: String,
    health_subject: String,
}

impl ScoreServer {
    /// Create a new server on the given subjects.
    pub fn new(client: Client, score_subject: &str, health_subject: &str) -> Self {
        Self {
            client,
            score_subject: score_subject.to_string(),
            health_subject: health_subject.to_string(),
        }
    }

    /// Subscribe to the scoring subject.
    pub async fn subscribe_scores(&self) -> Result<Subscriber> {
        let subscriber = self.client.subscribe(self.score_subject.clone()).await?;
        info!(subject = %self.score_subject, "Subscribed to scoring subject");
        Ok(subscriber)
    }

    /// Subscribe to the health probe subject.
    pub async fn subscribe_health(&self) -> Result<Subscriber> {
        let subscriber = self.client.subscribe(self.health_subject.clone()).await?;
        info!(subject = %self.health_subject, "Subscribed to health subject");
        Ok(subscriber)
    }

    /// Send a JSON reply to a request.
    pub async fn reply<T: Serialize>(&self, reply_to: Subject, body: &T) -> Result<()> {
        let payload = serde_json::to_vec(body)?;
        self.client.publish(reply_to, payload.into()).await?;
        Ok(())
    }

    pub fn score_subject(&self) -> &str {
        &self.score_subject
    }

    pub fn health_subject(&self) -> &str {
        &self.health_subject
    }
}

/// Health probe reply. Carries no pipeline state beyond "artifacts
/// loaded" — the server only runs once loading succeeded.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub model: String,
    pub features: usize,
    pub version: &'static str,
    pub timestamp: DateTime<Utc>,
}

impl HealthResponse {
    pub fn new(engine: &ScoringEngine) -> Self {
        Self {
            status: "ok",
            model: engine.oracle_name().to_string(),
            features: engine.feature_count(),
            version: env!("CARGO_PKG_VERSION"),
            timestamp: Utc::now(),
        }
    }
}

/// Parse a request payload. Undecodable payloads are the caller's fault.
pub fn parse_request(payload: &[u8]) -> Result<ScoreRequest, ErrorResponse> {
    serde_json::from_slice(payload)
        .map_err(|e| ErrorResponse::new(Fault::Client, format!("invalid request payload: {e}")))
}

/// Run one request through the pipeline, classifying failures by fault.
pub fn score_request(
    extractor: &FeatureExtractor,
    engine: &ScoringEngine,
    request: &ScoreRequest,
) -> Result<Verdict, ErrorResponse> {
    let features = extractor
        .extract(&request.attributes)
        .map_err(|e| ErrorResponse::new(Fault::Client, e.to_string()))?;

    engine
        .score(&features)
        .map_err(|e| ErrorResponse::new(Fault::Server, e.to_string()))
}
