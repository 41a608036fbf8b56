//! Energy optimization: consumption tuning and renewable capacity.

use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use demo_core::{banner, mock, shared, DemoService, Payload, Route, ServiceDescriptor, Shared};
use rand::rngs::StdRng;
use serde::Serialize;
use serde_json::{json, Value};

pub const DESCRIPTOR: ServiceDescriptor = ServiceDescriptor {
    name: "energy",
    title: "Energy Optimization Platform",
    tagline: "Smart energy management",
    version: "1.0.0",
    default_port: 8009,
    features: &[
        "Energy usage optimization",
        "Renewable integration",
        "Cost reduction",
        "Carbon footprint tracking",
    ],
    routes: &[
        Route::new("POST", "/api/optimize", "Optimize energy usage"),
        Route::new("GET", "/api/renewable-status", "Renewable capacity and grid stability"),
    ],
};

const STRATEGIES: [&str; 5] = [
    "Load balancing",
    "Peak shaving",
    "Demand response",
    "Renewable integration",
    "Storage optimization",
];

#[derive(Debug, Serialize)]
pub struct EnergyOptimization {
    pub current_consumption: f64,
    pub optimized_consumption: f64,
    pub savings_percentage: f64,
    pub cost_savings: f64,
    pub carbon_reduction: f64,
    pub recommended_strategy: &'static str,
    pub peak_hours: [&'static str; 2],
    pub off_peak_hours: [&'static str; 1],
    pub optimization_score: f64,
}

#[derive(Debug, Serialize)]
pub struct RenewableStatus {
    pub solar_capacity: f64,
    pub wind_capacity: f64,
    pub hydro_capacity: f64,
    pub renewable_percentage: f64,
    pub grid_stability: f64,
    pub energy_storage: f64,
}

pub struct EnergyPlatform {
    rng: StdRng,
}

impl EnergyPlatform {
    pub fn new(rng: StdRng) -> Self {
        Self { rng }
    }

    pub fn optimize(&mut self) -> EnergyOptimization {
        let rng = &mut self.rng;
        let current = mock::uniform_rounded(rng, 1000.0, 5000.0, 2);
        let savings_percentage = mock::uniform_rounded(rng, 10.0, 25.0, 1);
        EnergyOptimization {
            current_consumption: current,
            optimized_consumption: mock::round_to(current * (1.0 - savings_percentage / 100.0), 2),
            savings_percentage,
            cost_savings: mock::uniform_rounded(rng, 500.0, 2000.0, 2),
            carbon_reduction: mock::uniform_rounded(rng, 100.0, 500.0, 1),
            recommended_strategy: mock::pick(rng, &STRATEGIES),
            peak_hours: ["9:00-11:00", "18:00-20:00"],
            off_peak_hours: ["22:00-6:00"],
            optimization_score: mock::uniform_rounded(rng, 75.0, 95.0, 1),
        }
    }

    pub fn renewable_status(&mut self) -> RenewableStatus {
        let rng = &mut self.rng;
        RenewableStatus {
            solar_capacity: mock::uniform_rounded(rng, 500.0, 2000.0, 1),
            wind_capacity: mock::uniform_rounded(rng, 300.0, 1500.0, 1),
            hydro_capacity: mock::uniform_rounded(rng, 200.0, 1000.0, 1),
            renewable_percentage: mock::uniform_rounded(rng, 30.0, 80.0, 1),
            grid_stability: mock::uniform_rounded(rng, 85.0, 98.0, 1),
            energy_storage: mock::uniform_rounded(rng, 100.0, 500.0, 1),
        }
    }
}

pub struct EnergyService;

impl DemoService for EnergyService {
    fn descriptor(&self) -> &'static ServiceDescriptor {
        &DESCRIPTOR
    }

    fn router(&self, rng: StdRng) -> Router {
        Router::new()
            .route("/", get(root))
            .route("/api/optimize", post(optimize))
            .route("/api/renewable-status", get(renewable_status))
            .with_state(shared(EnergyPlatform::new(rng)))
    }
}

async fn root() -> Json<Value> {
    Json(banner(&DESCRIPTOR))
}

// The usage payload is accepted but does not influence the figures.
async fn optimize(
    State(platform): State<Shared<EnergyPlatform>>,
    Payload(_usage): Payload<Value>,
) -> Json<Value> {
    let optimization = platform.lock().await.optimize();
    Json(json!({"success": true, "optimization": optimization}))
}

async fn renewable_status(State(platform): State<Shared<EnergyPlatform>>) -> Json<Value> {
    let status = platform.lock().await.renewable_status();
    Json(json!({"success": true, "renewable_status": status}))
}
