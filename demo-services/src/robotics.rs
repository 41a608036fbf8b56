use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use demo_core::{banner, mock, shared, DemoService, Payload, Route, ServiceDescriptor, Shared};
use rand::{rngs::StdRng, Rng};
use serde::Serialize;
use serde_json::{json, Value};

pub const DESCRIPTOR: ServiceDescriptor = ServiceDescriptor {
    name: "robotics",
    title: "Robotics Automation Platform",
    tagline: "Intelligent automation systems",
    version: "1.0.0",
    default_port: 8010,
    features: &[
        "Robot fleet management",
        "Workflow optimization",
        "Predictive maintenance",
        "Performance analytics",
    ],
    routes: &[
        Route::new("GET", "/api/robots", "Snapshot of the robot fleet"),
        Route::new("POST", "/api/optimize-workflow", "Workflow optimization report"),
    ],
};

const FLEET_SIZE: usize = 10;
const ROBOT_TYPES: [&str; 5] = ["Industrial", "Service", "Medical", "Agricultural", "Security"];
const TASKS: [&str; 5] = ["Assembly", "Welding", "Packaging", "Inspection", "Delivery"];
const STATUSES: [&str; 4] = ["Active", "Idle", "Maintenance", "Error"];
const RECOMMENDED_CHANGES: [&str; 4] = [
    "Optimize robot path planning",
    "Implement predictive maintenance",
    "Adjust task scheduling",
    "Upgrade sensor systems",
];

#[derive(Debug, Serialize)]
pub struct Robot {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub status: &'static str,
    pub current_task: &'static str,
    pub efficiency: f64,
    pub battery_level: u8,
    pub location: String,
    pub last_update: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct WorkflowOptimization {
    pub current_efficiency: f64,
    pub optimized_efficiency: f64,
    pub time_savings: f64,
    pub cost_reduction: f64,
    pub recommended_changes: [&'static str; 4],
    pub automation_level: f64,
}

pub struct RoboticsPlatform {
    rng: StdRng,
}

impl RoboticsPlatform {
    pub fn new(rng: StdRng) -> Self {
        Self { rng }
    }

    /// A fresh fleet snapshot on every call.
    pub fn robots(&mut self) -> Vec<Robot> {
        let rng = &mut self.rng;
        (0..FLEET_SIZE)
            .map(|i| Robot {
                id: format!("ROBOT_{:03}", i),
                name: format!("Robot {}", i + 1),
                kind: mock::pick(rng, &ROBOT_TYPES),
                status: mock::pick(rng, &STATUSES),
                current_task: mock::pick(rng, &TASKS),
                efficiency: mock::uniform_rounded(rng, 75.0, 98.0, 1),
                battery_level: rng.gen_range(20..=100),
                location: format!("Zone {}", rng.gen_range(1..=5)),
                last_update: mock::now(),
            })
            .collect()
    }

    pub fn optimize_workflow(&mut self) -> WorkflowOptimization {
        let rng = &mut self.rng;
        WorkflowOptimization {
            current_efficiency: mock::uniform_rounded(rng, 70.0, 90.0, 1),
            optimized_efficiency: mock::uniform_rounded(rng, 85.0, 98.0, 1),
            time_savings: mock::uniform_rounded(rng, 15.0, 35.0, 1),
            cost_reduction: mock::uniform_rounded(rng, 1000.0, 5000.0, 2),
            recommended_changes: RECOMMENDED_CHANGES,
            automation_level: mock::uniform_rounded(rng, 60.0, 95.0, 1),
        }
    }
}

pub struct RoboticsService;

impl DemoService for RoboticsService {
    fn descriptor(&self) -> &'static ServiceDescriptor {
        &DESCRIPTOR
    }

    fn router(&self, rng: StdRng) -> Router {
        Router::new()
            .route("/", get(root))
            .route("/api/robots", get(robots))
            .route("/api/optimize-workflow", post(optimize_workflow))
            .with_state(shared(RoboticsPlatform::new(rng)))
    }
}

async fn root() -> Json<Value> {
    Json(banner(&DESCRIPTOR))
}

async fn robots(State(platform): State<Shared<RoboticsPlatform>>) -> Json<Value> {
    let robots = platform.lock().await.robots();
    Json(json!({"success": true, "robots": robots}))
}

async fn optimize_workflow(
    State(platform): State<Shared<RoboticsPlatform>>,
    Payload(_workflow): Payload<Value>,
) -> Json<Value> {
    let optimization = platform.lock().await.optimize_workflow();
    Json(json!({"success": true, "optimization": optimization}))
}
