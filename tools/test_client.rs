//! Test Traffic Client
//!
//! Generates legitimate and suspicious records and posts them to a running
//! Swipe Shield service.
//!
//! Usage: test_client [base_url] [count] [fraud_rate] [delay_ms] [transaction|features]

use anyhow::Context;
use rand::Rng;
use serde_json::{json, Value};
use std::time::Duration;
use swipe_shield::types::{Transaction, TransactionType, SAMPLE_TRANSACTION};
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq)]
enum Mode {
    Transaction,
    Features,
}

/// Request generator for testing
struct TrafficGenerator {
    rng: rand::rngs::ThreadRng,
}

impl TrafficGenerator {
    fn new() -> Self {
        Self {
            rng: rand::thread_rng(),
        }
    }

    /// Ordinary payment: balances move by the amount on both sides
    fn generate_legitimate(&mut self) -> anyhow::Result<Transaction> {
        let tx_type = *self.random_choice(&[
            TransactionType::Payment,
            TransactionType::Payment,
            TransactionType::CashOut,
            TransactionType::Deposit,
        ]);
        let amount: f64 = self.rng.gen_range(10.0..2_000.0);
        let old_org: f64 = self.rng.gen_range(amount..amount + 50_000.0);
        let old_dest: f64 = self.rng.gen_range(0.0..100_000.0);

        Ok(Transaction::new(
            tx_type,
            round2(amount),
            round2(old_org),
            round2(old_org - amount),
            round2(old_dest),
            round2(old_dest + amount),
        )?)
    }

    /// Account drain: full balance moved out, destination balance never updates
    fn generate_suspicious(&mut self) -> anyhow::Result<Transaction> {
        let tx_type = *self.random_choice(&[TransactionType::Transfer, TransactionType::CashOut]);
        let balance: f64 = self.rng.gen_range(50_000.0..2_000_000.0);

        let tx = if self.rng.gen_bool(0.2) {
            // zero-amount test transfer
            Transaction::new(tx_type, 0.0, round2(balance), round2(balance), 0.0, 0.0)?
        } else {
            Transaction::new(tx_type, round2(balance), round2(balance), 0.0, 0.0, 0.0)?
        };
        Ok(tx)
    }

    /// Sample record with small noise on the anonymized components
    fn generate_features(&mut self, suspicious: bool) -> Vec<f64> {
        let mut values = SAMPLE_TRANSACTION.to_vec();
        for v in values.iter_mut().skip(1).take(28) {
            *v += self.rng.gen_range(-0.5..0.5);
        }
        if suspicious {
            // shift the components that separate fraud most strongly
            values[4] += self.rng.gen_range(3.0..6.0);
            values[10] -= self.rng.gen_range(3.0..6.0);
            values[12] -= self.rng.gen_range(4.0..8.0);
            values[14] -= self.rng.gen_range(6.0..10.0);
        }
        values
    }

    fn random_choice<'a, T>(&mut self, choices: &'a [T]) -> &'a T {
        &choices[self.rng.gen_range(0..choices.len())]
    }
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("test_client=info".parse()?),
        )
        .init();

    info!("Starting Test Traffic Client");

    // Parse arguments
    let args: Vec<String> = std::env::args().collect();
    let base_url = args
        .get(1)
        .map(|s| s.trim_end_matches('/').to_string())
        .unwrap_or_else(|| "http://localhost:8080".to_string());
    let count: u64 = args.get(2).and_then(|s| s.parse().ok()).unwrap_or(100);
    let fraud_rate: f64 = args
        .get(3)
        .and_then(|s| s.parse().ok())
        .unwrap_or(0.1_f64)
        .clamp(0.0, 1.0);
    let delay_ms: u64 = args.get(4).and_then(|s| s.parse().ok()).unwrap_or(100);
    let mode = match args.get(5).map(|s| s.as_str()) {
        Some("features") => Mode::Features,
        _ => Mode::Transaction,
    };

    info!(
        base_url = %base_url,
        count = count,
        fraud_rate = fraud_rate,
        delay_ms = delay_ms,
        mode = ?mode,
        "Configuration loaded"
    );

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(10))
        .build()
        .context("Failed to build HTTP client")?;

    // Check the service is up
    let health_url = format!("{}/health", base_url);
    match client.get(&health_url).send().await.and_then(|r| r.error_for_status()) {
        Ok(_) => info!("Service is healthy at {}", base_url),
        Err(e) => {
            warn!(error = %e, "Service unreachable. Running in dry-run mode.");
            return run_dry_mode(count, fraud_rate, delay_ms, mode).await;
        }
    }

    let endpoint = match mode {
        Mode::Transaction => format!("{}/api/v1/predict/transaction", base_url),
        Mode::Features => format!("{}/api/v1/predict/features", base_url),
    };

    let mut generator = TrafficGenerator::new();
    let mut rng = rand::thread_rng();

    info!("Starting to send {} records...", count);

    let mut suspicious_sent = 0;
    let mut fraud_verdicts = 0;
    let mut rejected = 0;

    for i in 0..count {
        let suspicious = rng.gen_bool(fraud_rate);
        if suspicious {
            suspicious_sent += 1;
        }
        let body = build_body(&mut generator, mode, suspicious)?;

        let response = client
            .post(&endpoint)
            .json(&body)
            .send()
            .await
            .with_context(|| format!("Failed to post to {}", endpoint))?;

        let status = response.status();
        let verdict: Value = response.json().await.unwrap_or(Value::Null);
        if status.is_success() {
            if verdict["fraud"].as_bool().unwrap_or(false) {
                fraud_verdicts += 1;
            }
        } else {
            rejected += 1;
            warn!(status = %status, error = %verdict["error"], "Request rejected");
        }

        if (i + 1) % 10 == 0 {
            info!(
                "Sent {}/{} records ({} suspicious, {} fraud verdicts, {} rejected)",
                i + 1,
                count,
                suspicious_sent,
                fraud_verdicts,
                rejected
            );
        }

        tokio::time::sleep(Duration::from_millis(delay_ms)).await;
    }

    info!(
        "Completed! Sent {} records ({} suspicious, {} fraud verdicts, {} rejected)",
        count, suspicious_sent, fraud_verdicts, rejected
    );

    Ok(())
}

fn build_body(generator: &mut TrafficGenerator, mode: Mode, suspicious: bool) -> anyhow::Result<Value> {
    Ok(match mode {
        Mode::Transaction => {
            let tx = if suspicious {
                generator.generate_suspicious()?
            } else {
                generator.generate_legitimate()?
            };
            serde_json::to_value(tx)?
        }
        Mode::Features => json!({ "values": generator.generate_features(suspicious) }),
    })
}

async fn run_dry_mode(count: u64, fraud_rate: f64, delay_ms: u64, mode: Mode) -> anyhow::Result<()> {
    info!("Running in dry-run mode (no service connection)");

    let mut generator = TrafficGenerator::new();
    let mut rng = rand::thread_rng();

    for i in 0..count {
        let body = build_body(&mut generator, mode, rng.gen_bool(fraud_rate))?;
        let json = serde_json::to_string_pretty(&body)?;

        if (i + 1) % 10 == 0 || i == 0 {
            info!("Sample record {}:\n{}", i + 1, json);
        }

        tokio::time::sleep(Duration::from_millis(delay_ms)).await;
    }

    Ok(())
}
