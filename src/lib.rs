//! Fraud Scoring Service Library
//!
//! Scores financial transactions for potential fraud with an
//! unsupervised isolation-forest anomaly model: deterministic feature
//! extraction, normalization against fitted statistics, anomaly
//! scoring, and a stable fraud verdict served over request-reply.

pub mod config;
pub mod feature_extractor;
pub mod metrics;
pub mod models;
pub mod server;
pub mod types;

pub use config::AppConfig;
pub use feature_extractor::{FeatureExtractor, FeatureSchema};
pub use models::forest::{AnomalyDetector, IsolationForest};
pub use models::loader::ArtifactLoader;
pub use models::scoring::ScoringEngine;
pub use server::ScoreServer;
pub use types::{record::ScoreRequest, verdict::Verdict};
