//! Fitted model components: artifacts, oracle and scoring

pub mod forest;
pub mod loader;
pub mod scaler;
pub mod scoring;

pub use forest::{AnomalyDetector, Decision, IsolationForest, Label, OracleError};
pub use loader::ArtifactLoader;
pub use scaler::StandardScaler;
pub use scoring::{ScoreError, ScoringEngine};
