//! Synthetic Transaction Producer
//!
//! Generates synthetic transactions from the same normal/fraud profiles
//! the reference dataset was built from, sends them to the scoring
//! service as NATS requests, and reports the verdicts.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{info, warn};

/// Scoring request matching the service's expected wire format.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ScorePayload {
    transaction_id: String,
    amount: f64,
    hour: u8,
    category: u8,
    merchant_freq: u32,
    amount_deviation: f64,
    velocity: u32,
}

/// Verdict reply fields the producer cares about.
#[derive(Debug, Deserialize)]
struct VerdictReply {
    #[serde(rename = "isFraud")]
    is_fraud: bool,
    #[serde(rename = "fraudScore")]
    fraud_score: u8,
}

/// Transaction generator mirroring the reference data profiles.
struct TransactionGenerator {
    rng: rand::rngs::ThreadRng,
    transaction_counter: u64,
}

impl TransactionGenerator {
    fn new() -> Self {
        Self {
            rng: rand::thread_rng(),
            transaction_counter: 0,
        }
    }

    /// Generate a typical daytime transaction.
    fn generate_normal(&mut self) -> ScorePayload {
        self.transaction_counter += 1;

        ScorePayload {
            transaction_id: format!("tx_{:012}", self.transaction_counter),
            amount: self.rng.gen_range(200.0..800.0),
            hour: self.rng.gen_range(8..22),
            category: self.rng.gen_range(0..6),
            merchant_freq: self.rng.gen_range(10..50),
            amount_deviation: self.rng.gen_range(0.4..1.6),
            velocity: self.rng.gen_range(1..3),
        }
    }

    /// Generate a fraud-like transaction: large nighttime amount at a
    /// rarely used merchant, far off the spending baseline, in a burst.
    fn generate_fraud_like(&mut self) -> ScorePayload {
        self.transaction_counter += 1;
        let night_hours = [0, 1, 2, 3, 23];

        ScorePayload {
            transaction_id: format!("tx_{:012}", self.transaction_counter),
            amount: self.rng.gen_range(1500.0..9000.0),
            hour: night_hours[self.rng.gen_range(0..night_hours.len())],
            category: self.rng.gen_range(2..7),
            merchant_freq: self.rng.gen_range(0..2),
            amount_deviation: self.rng.gen_range(1.5..9.0),
            velocity: self.rng.gen_range(4..10),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("synthetic_producer=info".parse()?),
        )
        .init();

    info!("Starting Synthetic Transaction Producer");

    // Parse arguments
    let args: Vec<String> = std::env::args().collect();
    let nats_url = args
        .get(1)
        .map(|s| s.as_str())
        .unwrap_or("nats://localhost:4222");
    let subject = args.get(2).map(|s| s.as_str()).unwrap_or("fraud.score");
    let count: u64 = args.get(3).and_then(|s| s.parse().ok()).unwrap_or(100);
    let fraud_rate: f64 = args.get(4).and_then(|s| s.parse().ok()).unwrap_or(0.1);
    let delay_ms: u64 = args.get(5).and_then(|s| s.parse().ok()).unwrap_or(100);

    info!(
        nats_url = %nats_url,
        subject = %subject,
        count = count,
        fraud_rate = fraud_rate,
        delay_ms = delay_ms,
        "Configuration loaded"
    );

    // Connect to NATS
    let client = match async_nats::connect(nats_url).await {
        Ok(c) => {
            info!("Connected to NATS");
            c
        }
        Err(e) => {
            warn!(error = %e, "Failed to connect to NATS. Running in dry-run mode.");
            return run_dry_mode(count, fraud_rate, delay_ms).await;
        }
    };

    // Generate transactions and request verdicts
    let mut generator = TransactionGenerator::new();
    let mut rng = rand::thread_rng();

    info!("Requesting verdicts for {} transactions...", count);

    let mut sent_fraud_like = 0;
    let mut flagged = 0;

    for i in 0..count {
        let (transaction, fraud_like) = if rng.gen_bool(fraud_rate) {
            sent_fraud_like += 1;
            (generator.generate_fraud_like(), true)
        } else {
            (generator.generate_normal(), false)
        };

        let payload = serde_json::to_vec(&transaction)?;

        match client.request(subject.to_string(), payload.into()).await {
            Ok(reply) => match serde_json::from_slice::<VerdictReply>(&reply.payload) {
                Ok(verdict) => {
                    if verdict.is_fraud {
                        flagged += 1;
                    }
                    if verdict.is_fraud != fraud_like {
                        info!(
                            transaction_id = %transaction.transaction_id,
                            sent_fraud_like = fraud_like,
                            is_fraud = verdict.is_fraud,
                            fraud_score = verdict.fraud_score,
                            "Verdict disagrees with generation profile"
                        );
                    }
                }
                Err(e) => {
                    // Fault envelopes land here; surface them as-is.
                    warn!(
                        transaction_id = %transaction.transaction_id,
                        error = %e,
                        reply = %String::from_utf8_lossy(&reply.payload),
                        "Request was not scored"
                    );
                }
            },
            Err(e) => {
                warn!(
                    transaction_id = %transaction.transaction_id,
                    error = %e,
                    "Request failed"
                );
            }
        }

        if (i + 1) % 10 == 0 {
            info!(
                "Scored {}/{} transactions ({} fraud-like sent, {} flagged)",
                i + 1,
                count,
                sent_fraud_like,
                flagged
            );
        }

        tokio::time::sleep(Duration::from_millis(delay_ms)).await;
    }

    info!(
        "Completed! Scored {} transactions ({} fraud-like sent, {} flagged)",
        count, sent_fraud_like, flagged
    );

    Ok(())
}

async fn run_dry_mode(count: u64, fraud_rate: f64, delay_ms: u64) -> anyhow::Result<()> {
    info!("Running in dry-run mode (no NATS connection)");

    let mut generator = TransactionGenerator::new();
    let mut rng = rand::thread_rng();

    for i in 0..count {
        let transaction = if rng.gen_bool(fraud_rate) {
            generator.generate_fraud_like()
        } else {
            generator.generate_normal()
        };

        let json = serde_json::to_string_pretty(&transaction)?;

        if (i + 1) % 10 == 0 || i == 0 {
            info!("Sample transaction {}:\n{}", i + 1, json);
        }

        tokio::time::sleep(Duration::from_millis(delay_ms)).await;
    }

    Ok(())
}
