//! Smart contract scanner.
//!
//! Findings are fabricated; the only thing read from the submitted source is
//! its line count, which bounds the reported issue locations.

use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use demo_core::{
    banner, mock, shared, ApiError, ApiResult, DemoService, Payload, Route, ServiceDescriptor,
    Shared,
};
use rand::{rngs::StdRng, Rng};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

pub const DESCRIPTOR: ServiceDescriptor = ServiceDescriptor {
    name: "contract-scanner",
    title: "Smart Contract Security Scanner",
    tagline: "Blockchain security analysis",
    version: "1.0.0",
    default_port: 8005,
    features: &[
        "Vulnerability detection",
        "Gas optimization",
        "Security scoring",
        "Multi-language support",
    ],
    routes: &[Route::new("POST", "/api/scan", "Scan contract source for vulnerabilities")],
};

const VULNERABILITIES: [&str; 9] = [
    "Reentrancy",
    "Integer Overflow",
    "Unchecked External Call",
    "Access Control",
    "Unsafe Randomness",
    "Front-running",
    "Timestamp Dependency",
    "Gas Limit",
    "DoS Attack",
];
const SEVERITIES: [&str; 4] = ["Low", "Medium", "High", "Critical"];
const MAX_ISSUES: usize = 5;

fn default_language() -> String {
    "Solidity".to_string()
}

#[derive(Debug, Deserialize)]
pub struct ScanRequest {
    #[serde(default)]
    pub code: String,
    #[serde(default = "default_language")]
    pub language: String,
}

#[derive(Debug, Serialize)]
pub struct Issue {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub severity: &'static str,
    pub line: usize,
    pub description: String,
    pub confidence: f64,
}

#[derive(Debug, Serialize)]
pub struct ScanResult {
    pub contract_analyzed: bool,
    pub language: String,
    pub lines_of_code: usize,
    pub vulnerabilities_found: usize,
    pub security_score: u32,
    pub issues: Vec<Issue>,
    pub gas_estimation: u64,
    pub scan_time: DateTime<Utc>,
}

/// 20 points off per finding, floored at zero.
pub fn security_score(issues: usize) -> u32 {
    100u32.saturating_sub(20 * issues as u32)
}

pub struct ContractScanner {
    rng: StdRng,
}

impl ContractScanner {
    pub fn new(rng: StdRng) -> Self {
        Self { rng }
    }

    pub fn scan(&mut self, request: ScanRequest) -> ApiResult<ScanResult> {
        if request.code.trim().is_empty() {
            return Err(ApiError::bad_request("No contract code provided"));
        }
        let rng = &mut self.rng;
        let lines_of_code = request.code.lines().count().max(1);
        let issues: Vec<Issue> = (0..rng.gen_range(0..=MAX_ISSUES))
            .map(|_| {
                let kind = mock::pick(rng, &VULNERABILITIES);
                Issue {
                    kind,
                    severity: mock::pick(rng, &SEVERITIES),
                    line: rng.gen_range(1..=lines_of_code),
                    description: format!("Potential {} vulnerability detected", kind.to_lowercase()),
                    confidence: mock::uniform_rounded(rng, 0.7, 0.95, 2),
                }
            })
            .collect();

        Ok(ScanResult {
            contract_analyzed: true,
            language: request.language,
            lines_of_code,
            vulnerabilities_found: issues.len(),
            security_score: security_score(issues.len()),
            issues,
            gas_estimation: rng.gen_range(100_000..=1_000_000),
            scan_time: mock::now(),
        })
    }
}

pub struct ContractScannerService;

impl DemoService for ContractScannerService {
    fn descriptor(&self) -> &'static ServiceDescriptor {
        &DESCRIPTOR
    }

    fn router(&self, rng: StdRng) -> Router {
        Router::new()
            .route("/", get(root))
            .route("/api/scan", post(scan))
            .with_state(shared(ContractScanner::new(rng)))
    }
}

async fn root() -> Json<Value> {
    Json(banner(&DESCRIPTOR))
}

async fn scan(
    State(scanner): State<Shared<ContractScanner>>,
    Payload(request): Payload<ScanRequest>,
) -> ApiResult<Json<Value>> {
    let scan_result = scanner.lock().await.scan(request)?;
    Ok(Json(json!({"success": true, "scan_result": scan_result})))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_app;
    use axum::http::StatusCode;
    use demo_core::testing;

    #[test]
    fn test_security_score_floor() {
        assert_eq!(security_score(0), 100);
        assert_eq!(security_score(3), 40);
        assert_eq!(security_score(5), 0);
        assert_eq!(security_score(7), 0);
    }

    #[test]
    fn test_scan_is_consistent() {
        let mut scanner = ContractScanner::new(mock::seeded(Some(9)));
        let code = "pragma solidity ^0.8.0;\ncontract A {\n}\n";
        for _ in 0..30 {
            let result = scanner
                .scan(ScanRequest {
                    code: code.to_string(),
                    language: default_language(),
                })
                .unwrap();
            assert_eq!(result.lines_of_code, 3);
            assert!(result.vulnerabilities_found <= 5);
            assert_eq!(result.vulnerabilities_found, result.issues.len());
            assert_eq!(result.security_score, security_score(result.issues.len()));
            assert!(result.issues.iter().all(|i| (1..=3).contains(&i.line)));
            for issue in &result.issues {
                assert_eq!(
                    issue.description,
                    format!("Potential {} vulnerability detected", issue.kind.to_lowercase())
                );
            }
        }
    }

    #[tokio::test]
    async fn test_blank_code_is_rejected() {
        let app = test_app(&ContractScannerService);
        let (status, body) = testing::post(&app, "/api/scan", json!({"code": "   \n"})).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "No contract code provided");

        let (status, body) =
            testing::post(&app, "/api/scan", json!({"code": "contract B {}"})).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["scan_result"]["language"], "Solidity");
    }
}
