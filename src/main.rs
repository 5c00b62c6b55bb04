//! Fraud Scoring Service - Main Entry Point
//!
//! Answers fraud scoring requests over NATS request-reply: deterministic
//! feature extraction, normalization against fitted statistics,
//! isolation-forest anomaly scoring. Supports parallel request
//! processing for high throughput.

use anyhow::Result;
use fraud_scoring_service::{
    config::AppConfig,
    feature_extractor::{FeatureExtractor, FeatureSchema},
    metrics::{MetricsReporter, PipelineMetrics},
    models::{loader::ArtifactLoader, scoring::ScoringEngine},
    server::{self, HealthResponse, ScoreServer},
    types::verdict::Fault,
};
use futures::StreamExt;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;
use tracing::{debug, error, info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("fraud_scoring_service=info".parse()?),
        )
        .init();

    info!("Starting Fraud Scoring Service");

    // Load configuration
    let config = AppConfig::load()?;
    info!("Configuration loaded successfully");

    // Initialize metrics
    let metrics = Arc::new(PipelineMetrics::new());

    // Initialize components
    let schema = FeatureSchema::current();
    let extractor = Arc::new(FeatureExtractor::new(schema.clone()));
    info!(
        "Feature extractor initialized ({} features, schema v{})",
        extractor.feature_count(),
        schema.version()
    );

    // Load fitted artifacts; missing or malformed artifacts are fatal here,
    // never recoverable per request.
    let loader = ArtifactLoader::new(schema);
    let (scaler, forest) = loader.load(&config.models.artifacts_dir)?;
    let engine = Arc::new(ScoringEngine::new(scaler, Arc::new(forest)));
    info!(oracle = %engine.oracle_name(), "Scoring engine initialized");

    // Connect to NATS
    let client = async_nats::connect(&config.nats.url).await?;
    info!("Connected to NATS at {}", config.nats.url);

    let score_server = Arc::new(ScoreServer::new(
        client.clone(),
        &config.nats.score_subject,
        &config.nats.health_subject,
    ));

    // Start metrics reporter (prints summary every 30 seconds)
    let metrics_clone = metrics.clone();
    tokio::spawn(async move {
        let reporter = MetricsReporter::new(metrics_clone, 30);
        reporter.start().await;
    });

    // Health probe responder
    {
        let score_server = score_server.clone();
        let engine = engine.clone();
        let mut subscription = score_server.subscribe_health().await?;
        tokio::spawn(async move {
            while let Some(message) = subscription.next().await {
                if let Some(reply_to) = message.reply {
                    let body = HealthResponse::new(&engine);
                    if let Err(e) = score_server.reply(reply_to, &body).await {
                        warn!(error = %e, "Failed to answer health probe");
                    }
                }
            }
        });
    }

    // Parallel processing configuration
    let num_workers = config.pipeline.workers;
    info!(
        "Starting scoring loop with {} parallel workers",
        num_workers
    );
    info!("Listening on subject: {}", config.nats.score_subject);

    // Semaphore to limit concurrent processing
    let semaphore = Arc::new(Semaphore::new(num_workers));

    let mut subscription = score_server.subscribe_scores().await?;

    while let Some(message) = subscription.next().await {
        // Acquire permit (limits concurrent tasks)
        let permit = semaphore.clone().acquire_owned().await?;

        // Clone shared resources for the spawned task
        let extractor = extractor.clone();
        let engine = engine.clone();
        let score_server = score_server.clone();
        let metrics = metrics.clone();

        // Spawn task to process this request
        tokio::spawn(async move {
            let start_time = Instant::now();

            let Some(reply_to) = message.reply else {
                warn!("Scoring request without reply subject dropped");
                drop(permit);
                return;
            };

            let outcome = server::parse_request(&message.payload).and_then(|request| {
                let tx_id = request.transaction_id.clone();
                server::score_request(&extractor, &engine, &request).map(|v| (tx_id, v))
            });

            match outcome {
                Ok((tx_id, verdict)) => {
                    let processing_time = start_time.elapsed();
                    metrics.record_verdict(processing_time, verdict.is_fraud);

                    if verdict.is_fraud {
                        info!(
                            transaction_id = tx_id.as_deref().unwrap_or("-"),
                            fraud_score = verdict.fraud_score,
                            anomaly_score = verdict.anomaly_score,
                            processing_time_us = processing_time.as_micros(),
                            "Fraudulent transaction flagged"
                        );
                    } else {
                        debug!(
                            transaction_id = tx_id.as_deref().unwrap_or("-"),
                            anomaly_score = verdict.anomaly_score,
                            processing_time_us = processing_time.as_micros(),
                            "Request scored"
                        );
                    }

                    if let Err(e) = score_server.reply(reply_to, &verdict).await {
                        error!(error = %e, "Failed to send verdict reply");
                    }
                }
                Err(fault) => {
                    match fault.fault {
                        Fault::Client => {
                            metrics.record_client_fault();
                            debug!(error = %fault.error, "Request rejected");
                        }
                        Fault::Server => {
                            metrics.record_server_fault();
                            error!(error = %fault.error, "Scoring failed");
                        }
                    }

                    if let Err(e) = score_server.reply(reply_to, &fault).await {
                        error!(error = %e, "Failed to send fault reply");
                    }
                }
            }

            // Release permit when done
            drop(permit);
        });
    }

    // Print final summary
    info!("Scoring service shutting down...");
    metrics.print_summary();

    Ok(())
}
