//! QuantumML optimizer: simulated depth reduction and shot benchmarks for a
//! sample entangling circuit.

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
use std::collections::BTreeMap;

pub const DESCRIPTOR: ServiceDescriptor = ServiceDescriptor {
    name: "quantum",
    title: "QuantumML Optimizer",
    tagline: "AI-powered quantum circuit optimization platform",
    version: "1.0.0",
    default_port: 5001,
    features: &[
        "AI-powered circuit optimization",
        "Real-time performance benchmarking",
        "Quantum circuit visualization",
        "Optimization history tracking",
    ],
    routes: &[
        Route::new("POST", "/api/optimize", "Optimize a sample circuit"),
        Route::new("POST", "/api/benchmark", "Benchmark a sample circuit"),
        Route::new("GET", "/api/history", "Last ten optimizations"),
        Route::new("GET", "/api/status", "Optimizer status"),
    ],
};

pub const MAX_QUBITS: u32 = 10;
pub const SHOTS: u32 = 1024;
const HISTORY_WINDOW: usize = 10;

fn default_qubits() -> u32 {
    3
}

#[derive(Debug, Deserialize)]
pub struct CircuitRequest {
    #[serde(default = "default_qubits")]
    pub num_qubits: u32,
}

#[derive(Debug, Clone)]
pub struct Circuit {
    pub num_qubits: u32,
    pub gates: Vec<&'static str>,
    pub depth: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct Optimization {
    pub num_qubits: u32,
    pub original_depth: u32,
    pub optimized_depth: u32,
    pub improvement_percent: f64,
    pub gate_count: usize,
    pub circuit_qasm: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct Benchmark {
    pub success_rate: f64,
    pub execution_time: f64,
    pub circuit_depth: u32,
    pub shots: u32,
    pub shot_distribution: BTreeMap<String, u32>,
}

pub fn validate_qubits(num_qubits: u32) -> ApiResult<u32> {
    if (1..=MAX_QUBITS).contains(&num_qubits) {
        Ok(num_qubits)
    } else {
        Err(ApiError::bad_request(format!(
            "num_qubits must be between 1 and {}",
            MAX_QUBITS
        )))
    }
}

pub fn improvement_percent(original: u32, optimized: u32) -> f64 {
    if original == 0 {
        return 0.0;
    }
    mock::round_to(
        f64::from(original.saturating_sub(optimized)) / f64::from(original) * 100.0,
        2,
    )
}

pub struct QuantumOptimizer {
    rng: StdRng,
    history: Vec<Optimization>,
}

impl QuantumOptimizer {
    pub fn new(rng: StdRng) -> Self {
        Self {
            rng,
            history: Vec::new(),
        }
    }

    /// Hadamard on the first qubit, a CNOT chain, a phase rotation and a
    /// final measurement.
    pub fn sample_circuit(&mut self, num_qubits: u32) -> Circuit {
        let mut gates = vec!["H"];
        gates.extend((1..num_qubits).map(|_| "CNOT"));
        gates.extend(["RZ", "M"]);
        Circuit {
            num_qubits,
            gates,
            depth: self.rng.gen_range(8..=15),
        }
    }

    pub fn optimize(&mut self, num_qubits: u32) -> ApiResult<Optimization> {
        let circuit = self.sample_circuit(validate_qubits(num_qubits)?);
        let factor = mock::uniform(&mut self.rng, 0.3, 0.5);
        let optimized_depth = ((f64::from(circuit.depth) * (1.0 - factor)) as u32).max(1);

        let result = Optimization {
            num_qubits,
            original_depth: circuit.depth,
            optimized_depth,
            improvement_percent: improvement_percent(circuit.depth, optimized_depth),
            gate_count: circuit.gates.len(),
            circuit_qasm: qasm(&circuit),
            timestamp: mock::now(),
        };
        log::debug!(
            "Optimized {}-qubit circuit: depth {} -> {}",
            num_qubits,
            result.original_depth,
            result.optimized_depth
        );
        self.history.push(result.clone());
        Ok(result)
    }

    /// Spreads exactly [`SHOTS`] measurements over all `2^n` basis states.
    pub fn benchmark(&mut self, num_qubits: u32) -> ApiResult<Benchmark> {
        let circuit = self.sample_circuit(validate_qubits(num_qubits)?);
        let states = 1usize << num_qubits;
        // Lower basis states dominate, as in an entangled sample circuit.
        let weights: Vec<f64> = (0..states)
            .map(|i| mock::uniform(&mut self.rng, 0.5, 1.5) / (1.0 + i as f64))
            .collect();
        let total_weight: f64 = weights.iter().sum();

        let mut counts: Vec<u32> = weights
            .iter()
            .map(|w| (w / total_weight * f64::from(SHOTS)).floor() as u32)
            .collect();
        let assigned: u32 = counts.iter().sum();
        counts[0] += SHOTS - assigned;

        let max_count = counts.iter().copied().max().unwrap_or(0);
        let width = num_qubits as usize;
        let shot_distribution = counts
            .into_iter()
            .enumerate()
            .map(|(state, count)| (format!("{:0width$b}", state, width = width), count))
            .collect();

        Ok(Benchmark {
            success_rate: mock::round_to(f64::from(max_count) / f64::from(SHOTS), 4),
            execution_time: mock::uniform_rounded(&mut self.rng, 0.001, 0.01, 5),
            circuit_depth: circuit.depth,
            shots: SHOTS,
            shot_distribution,
        })
    }

    pub fn recent(&self) -> &[Optimization] {
        let start = self.history.len().saturating_sub(HISTORY_WINDOW);
        &self.history[start..]
    }

    pub fn total(&self) -> usize {
        self.history.len()
    }
}

fn qasm(circuit: &Circuit) -> String {
    let n = circuit.num_qubits;
    let mut lines = vec![
        "OPENQASM 2.0;".to_string(),
        "include \"qelib1.inc\";".to_string(),
        format!("qreg q[{}];", n),
        format!("creg c[{}];", n),
        "h q[0];".to_string(),
    ];
    lines.extend((1..n).map(|i| format!("cx q[{}],q[{}];", i - 1, i)));
    lines.push(format!("rz(pi/4) q[{}];", n - 1));
    lines.push("measure q -> c;".to_string());
    lines.join("\n")
}

pub struct QuantumService;

impl DemoService for QuantumService {
    fn descriptor(&self) -> &'static ServiceDescriptor {
        &DESCRIPTOR
    }

    fn router(&self, rng: StdRng) -> Router {
        Router::new()
            .route("/", get(root))
            .route("/api/optimize", post(optimize))
            .route("/api/benchmark", post(benchmark))
            .route("/api/history", get(history))
            .route("/api/status", get(status))
            .with_state(shared(QuantumOptimizer::new(rng)))
    }
}

async fn root() -> Json<Value> {
    Json(banner(&DESCRIPTOR))
}

async fn optimize(
    State(optimizer): State<Shared<QuantumOptimizer>>,
    Payload(request): Payload<CircuitRequest>,
) -> ApiResult<Json<Value>> {
    let result = optimizer.lock().await.optimize(request.num_qubits)?;
    Ok(Json(json!({
        "success": true,
        "result": result,
        "timestamp": mock::now(),
    })))
}

async fn benchmark(
    State(optimizer): State<Shared<QuantumOptimizer>>,
    Payload(request): Payload<CircuitRequest>,
) -> ApiResult<Json<Value>> {
    let result = optimizer.lock().await.benchmark(request.num_qubits)?;
    Ok(Json(json!({
        "success": true,
        "result": result,
        "timestamp": mock::now(),
    })))
}

async fn history(State(optimizer): State<Shared<QuantumOptimizer>>) -> Json<Value> {
    let optimizer = optimizer.lock().await;
    Json(json!({
        "success": true,
        "history": optimizer.recent(),
        "total_optimizations": optimizer.total(),
    }))
}

async fn status(State(optimizer): State<Shared<QuantumOptimizer>>) -> Json<Value> {
    let optimizer = optimizer.lock().await;
    Json(json!({
        "success": true,
        "status": "operational",
        "uptime": "running",
        "optimizations_performed": optimizer.total(),
        "ai_model_status": "trained and ready",
        "quantum_simulator": "active",
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_app;
    use axum::http::StatusCode;
    use demo_core::testing;

    #[test]
    fn test_improvement_percent() {
        assert_eq!(improvement_percent(10, 6), 40.0);
        assert_eq!(improvement_percent(12, 7), 41.67);
        assert_eq!(improvement_percent(0, 0), 0.0);
    }

    #[test]
    fn test_optimize_reduces_depth() {
        let mut optimizer = QuantumOptimizer::new(mock::seeded(Some(17)));
        for _ in 0..30 {
            let result = optimizer.optimize(4).unwrap();
            assert!(result.optimized_depth >= 1);
            assert!(result.optimized_depth < result.original_depth);
            assert_eq!(
                result.improvement_percent,
                improvement_percent(result.original_depth, result.optimized_depth)
            );
            assert_eq!(result.gate_count, 6);
        }
        assert_eq!(optimizer.total(), 30);
        assert_eq!(optimizer.recent().len(), 10);
    }

    #[test]
    fn test_benchmark_covers_every_basis_state() {
        let mut optimizer = QuantumOptimizer::new(mock::seeded(Some(18)));
        let result = optimizer.benchmark(3).unwrap();
        assert_eq!(result.shot_distribution.len(), 8);
        assert!(result.shot_distribution.contains_key("000"));
        assert!(result.shot_distribution.contains_key("111"));
        assert_eq!(result.shot_distribution.values().sum::<u32>(), SHOTS);
        assert!(result.success_rate > 0.0 && result.success_rate <= 1.0);
    }

    #[test]
    fn test_qubit_bounds() {
        let mut optimizer = QuantumOptimizer::new(mock::seeded(Some(19)));
        assert!(optimizer.optimize(0).is_err());
        assert!(optimizer.benchmark(11).is_err());
        assert!(optimizer.benchmark(10).is_ok());
        assert_eq!(optimizer.total(), 0);
    }

    #[tokio::test]
    async fn test_routes() {
        let app = test_app(&QuantumService);
        let (status, _) = testing::post(&app, "/api/optimize", json!({"num_qubits": 42})).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, body) = testing::post(&app, "/api/optimize", json!({})).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["result"]["circuit_qasm"]
            .as_str()
            .unwrap()
            .contains("qreg q[3];"));

        let (_, body) = testing::get(&app, "/api/history").await;
        assert_eq!(body["total_optimizations"], 1);
        let (_, body) = testing::get(&app, "/api/status").await;
        assert_eq!(body["optimizations_performed"], 1);
    }
}
