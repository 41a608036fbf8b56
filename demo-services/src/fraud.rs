//! Real-time fraud detection: per-transaction risk scoring with a running
//! record of every analysis.

use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use demo_core::{banner, mock, shared, DemoService, Payload, Route, ServiceDescriptor, Shared};
use rand::{rngs::StdRng, Rng};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

pub const DESCRIPTOR: ServiceDescriptor = ServiceDescriptor {
    name: "fraud",
    title: "Real-time Fraud Detection System",
    tagline: "ML-powered fraud prevention",
    version: "1.0.0",
    default_port: 8007,
    features: &[
        "Real-time fraud detection",
        "ML pattern recognition",
        "Risk scoring",
        "Transaction monitoring",
    ],
    routes: &[
        Route::new("POST", "/api/analyze", "Score a transaction"),
        Route::new("GET", "/api/statistics", "Aggregate detection statistics"),
        Route::new("GET", "/api/transactions", "The 20 most recent analyses"),
    ],
};

/// Scores above this are flagged and blocked.
const FRAUD_THRESHOLD: f64 = 70.0;
const RECENT_LIMIT: usize = 20;

const PATTERNS: [&str; 6] = [
    "Unusual location",
    "High amount",
    "Rapid succession",
    "Suspicious merchant",
    "Off-hours activity",
    "Velocity check",
];

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct TransactionRequest {
    pub id: Option<String>,
    pub amount: Option<f64>,
    pub merchant: Option<String>,
    pub location: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Recommendation {
    Allow,
    Block,
}

#[derive(Debug, Clone, Serialize)]
pub struct TransactionAnalysis {
    pub transaction_id: String,
    pub amount: f64,
    pub merchant: String,
    pub location: String,
    pub timestamp: DateTime<Utc>,
    pub risk_score: f64,
    pub is_fraud: bool,
    pub confidence: f64,
    pub patterns_detected: Vec<&'static str>,
    pub recommendation: Recommendation,
}

#[derive(Debug, Serialize)]
pub struct FraudStatistics {
    pub total_transactions: usize,
    pub fraud_transactions: usize,
    pub fraud_rate: f64,
    pub blocked_transactions: usize,
    pub false_positives: u32,
    pub accuracy: f64,
}

pub struct FraudDetector {
    rng: StdRng,
    transactions: Vec<TransactionAnalysis>,
}

impl FraudDetector {
    pub fn new(rng: StdRng) -> Self {
        Self {
            rng,
            transactions: Vec::new(),
        }
    }

    pub fn analyze(&mut self, request: TransactionRequest) -> TransactionAnalysis {
        let rng = &mut self.rng;
        let risk_score = mock::uniform_rounded(rng, 0.0, 100.0, 2);
        let is_fraud = risk_score > FRAUD_THRESHOLD;
        let pattern_count = rng.gen_range(0..=3);

        let analysis = TransactionAnalysis {
            transaction_id: request
                .id
                .unwrap_or_else(|| format!("TXN_{}", rng.gen_range(1000..=9999))),
            amount: request
                .amount
                .unwrap_or_else(|| mock::uniform_rounded(rng, 10.0, 1000.0, 2)),
            merchant: request.merchant.unwrap_or_else(|| "Unknown".to_string()),
            location: request.location.unwrap_or_else(|| "Unknown".to_string()),
            timestamp: mock::now(),
            risk_score,
            is_fraud,
            confidence: mock::uniform_rounded(rng, 0.8, 0.95, 2),
            patterns_detected: mock::sample(rng, &PATTERNS, pattern_count),
            recommendation: if is_fraud {
                Recommendation::Block
            } else {
                Recommendation::Allow
            },
        };

        if is_fraud {
            log::warn!(
                "Blocking transaction {} (risk {})",
                analysis.transaction_id,
                analysis.risk_score
            );
        }
        self.transactions.push(analysis.clone());
        analysis
    }

    pub fn statistics(&mut self) -> FraudStatistics {
        let total = self.transactions.len();
        let fraud = self.transactions.iter().filter(|t| t.is_fraud).count();
        let blocked = self
            .transactions
            .iter()
            .filter(|t| t.recommendation == Recommendation::Block)
            .count();
        FraudStatistics {
            total_transactions: total,
            fraud_transactions: fraud,
            fraud_rate: mock::round_to(fraud as f64 / total.max(1) as f64 * 100.0, 2),
            blocked_transactions: blocked,
            false_positives: self.rng.gen_range(0..=5),
            accuracy: mock::uniform_rounded(&mut self.rng, 85.0, 98.0, 2),
        }
    }

    pub fn recent(&self) -> &[TransactionAnalysis] {
        let start = self.transactions.len().saturating_sub(RECENT_LIMIT);
        &self.transactions[start..]
    }
}

pub struct FraudService;

impl DemoService for FraudService {
    fn descriptor(&self) -> &'static ServiceDescriptor {
        &DESCRIPTOR
    }

    fn router(&self, rng: StdRng) -> Router {
        Router::new()
            .route("/", get(root))
            .route("/api/analyze", post(analyze))
            .route("/api/statistics", get(statistics))
            .route("/api/transactions", get(transactions))
            .with_state(shared(FraudDetector::new(rng)))
    }
}

async fn root() -> Json<Value> {
    Json(banner(&DESCRIPTOR))
}

async fn analyze(
    State(detector): State<Shared<FraudDetector>>,
    Payload(request): Payload<TransactionRequest>,
) -> Json<Value> {
    let analysis = detector.lock().await.analyze(request);
    Json(json!({"success": true, "analysis": analysis}))
}

async fn statistics(State(detector): State<Shared<FraudDetector>>) -> Json<Value> {
    let statistics = detector.lock().await.statistics();
    Json(json!({"success": true, "statistics": statistics}))
}

async fn transactions(State(detector): State<Shared<FraudDetector>>) -> Json<Value> {
    let detector = detector.lock().await;
    Json(json!({"success": true, "transactions": detector.recent()}))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_app;
    use demo_core::testing;

    #[test]
    fn test_fraud_flag_follows_threshold() {
        let mut detector = FraudDetector::new(mock::seeded(Some(21)));
        for _ in 0..200 {
            let analysis = detector.analyze(TransactionRequest::default());
            assert_eq!(analysis.is_fraud, analysis.risk_score > 70.0);
            assert_eq!(
                analysis.recommendation == Recommendation::Block,
                analysis.is_fraud
            );
            assert!(analysis.patterns_detected.len() <= 3);
            assert!(analysis.transaction_id.starts_with("TXN_"));
            assert_eq!(analysis.merchant, "Unknown");
        }
    }

    #[test]
    fn test_statistics_count_recorded_analyses() {
        let mut detector = FraudDetector::new(mock::seeded(Some(22)));
        let stats = detector.statistics();
        assert_eq!(stats.total_transactions, 0);
        assert_eq!(stats.fraud_rate, 0.0);

        for _ in 0..40 {
            detector.analyze(TransactionRequest::default());
        }
        let fraud = detector.transactions.iter().filter(|t| t.is_fraud).count();
        let stats = detector.statistics();
        assert_eq!(stats.total_transactions, 40);
        assert_eq!(stats.fraud_transactions, fraud);
        assert_eq!(stats.blocked_transactions, fraud);
        assert_eq!(stats.fraud_rate, mock::round_to(fraud as f64 / 40.0 * 100.0, 2));
        assert_eq!(detector.recent().len(), 20);
    }

    #[tokio::test]
    async fn test_analyze_echoes_request_fields() {
        let app = test_app(&FraudService);
        let (_, body) = testing::post(
            &app,
            "/api/analyze",
            json!({"id": "TX-1", "amount": 250.5, "merchant": "Cafe", "location": "Berlin"}),
        )
        .await;
        let analysis = &body["analysis"];
        assert_eq!(analysis["transaction_id"], "TX-1");
        assert_eq!(analysis["amount"], 250.5);
        assert_eq!(analysis["location"], "Berlin");

        let (_, body) = testing::get(&app, "/api/transactions").await;
        assert_eq!(body["transactions"].as_array().unwrap().len(), 1);
        let (_, body) = testing::get(&app, "/api/statistics").await;
        assert_eq!(body["statistics"]["total_transactions"], 1);
    }
}
