use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Duration, Utc};
use demo_core::{banner, mock, shared, DemoService, Payload, Route, ServiceDescriptor, Shared};
use rand::{rngs::StdRng, Rng};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

pub const DESCRIPTOR: ServiceDescriptor = ServiceDescriptor {
    name: "space",
    title: "Space Exploration Platform",
    tagline: "Advanced space mission management",
    version: "1.0.0",
    default_port: 8011,
    features: &[
        "Mission planning",
        "Space data analysis",
        "Satellite tracking",
        "Planetary exploration",
    ],
    routes: &[
        Route::new("GET", "/api/missions", "Current mission board"),
        Route::new("POST", "/api/analyze-space-data", "Analyze collected space data"),
    ],
};

const MISSION_COUNT: usize = 5;
const MISSION_TYPES: [&str; 4] = [
    "Mars Rover",
    "Satellite Deployment",
    "Space Station",
    "Asteroid Mining",
];
const PLANETS: [&str; 5] = ["Mars", "Jupiter", "Saturn", "Venus", "Mercury"];
const STATUSES: [&str; 4] = ["Planning", "Active", "Completed", "Delayed"];
const ACTIONS: [&str; 4] = [
    "Continue current trajectory",
    "Adjust orbit parameters",
    "Collect additional samples",
    "Monitor for changes",
];

fn default_data_type() -> String {
    "Planetary Surface".to_string()
}

#[derive(Debug, Deserialize)]
pub struct AnalysisRequest {
    #[serde(default = "default_data_type")]
    pub data_type: String,
}

#[derive(Debug, Serialize)]
pub struct Mission {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub target: &'static str,
    pub status: &'static str,
    pub progress: f64,
    pub crew_size: u8,
    pub duration_days: u32,
    pub budget: f64,
    pub launch_date: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct SpaceDataAnalysis {
    pub data_type: String,
    pub samples_collected: u32,
    pub analysis_accuracy: f64,
    pub discoveries: u32,
    pub anomalies_detected: u32,
    pub recommended_actions: [&'static str; 4],
}

pub struct SpacePlatform {
    rng: StdRng,
}

impl SpacePlatform {
    pub fn new(rng: StdRng) -> Self {
        Self { rng }
    }

    pub fn missions(&mut self) -> Vec<Mission> {
        let rng = &mut self.rng;
        (0..MISSION_COUNT)
            .map(|i| Mission {
                id: format!("MISSION_{:03}", i),
                name: format!("Space Mission {}", i + 1),
                kind: mock::pick(rng, &MISSION_TYPES),
                target: mock::pick(rng, &PLANETS),
                status: mock::pick(rng, &STATUSES),
                progress: mock::uniform_rounded(rng, 0.0, 100.0, 1),
                crew_size: rng.gen_range(2..=8),
                duration_days: rng.gen_range(30..=365),
                budget: mock::uniform_rounded(rng, 1_000_000.0, 10_000_000.0, 2),
                launch_date: Utc::now() - Duration::days(rng.gen_range(0..=365)),
            })
            .collect()
    }

    pub fn analyze(&mut self, data_type: String) -> SpaceDataAnalysis {
        let rng = &mut self.rng;
        SpaceDataAnalysis {
            data_type,
            samples_collected: rng.gen_range(100..=10_000),
            analysis_accuracy: mock::uniform_rounded(rng, 85.0, 99.0, 1),
            discoveries: rng.gen_range(0..=5),
            anomalies_detected: rng.gen_range(0..=3),
            recommended_actions: ACTIONS,
        }
    }
}

pub struct SpaceService;

impl DemoService for SpaceService {
    fn descriptor(&self) -> &'static ServiceDescriptor {
        &DESCRIPTOR
    }

    fn router(&self, rng: StdRng) -> Router {
        Router::new()
            .route("/", get(root))
            .route("/api/missions", get(missions))
            .route("/api/analyze-space-data", post(analyze_space_data))
            .with_state(shared(SpacePlatform::new(rng)))
    }
}

async fn root() -> Json<Value> {
    Json(banner(&DESCRIPTOR))
}

async fn missions(State(platform): State<Shared<SpacePlatform>>) -> Json<Value> {
    let missions = platform.lock().await.missions();
    Json(json!({"success": true, "missions": missions}))
}

async fn analyze_space_data(
    State(platform): State<Shared<SpacePlatform>>,
    Payload(request): Payload<AnalysisRequest>,
) -> Json<Value> {
    let analysis = platform.lock().await.analyze(request.data_type);
    Json(json!({"success": true, "analysis": analysis}))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_app;
    use demo_core::testing;

    #[tokio::test]
    async fn test_analysis_defaults_data_type() {
        let app = test_app(&SpaceService);
        let (_, body) = testing::post(&app, "/api/analyze-space-data", json!({})).await;
        assert_eq!(body["analysis"]["data_type"], "Planetary Surface");

        let (_, body) = testing::post(
            &app,
            "/api/analyze-space-data",
            json!({"data_type": "Spectrometry"}),
        )
        .await;
        assert_eq!(body["analysis"]["data_type"], "Spectrometry");
    }

    #[tokio::test]
    async fn test_missions() {
        let app = test_app(&SpaceService);
        let (_, body) = testing::get(&app, "/api/missions").await;
        let missions = body["missions"].as_array().unwrap();
        assert_eq!(missions.len(), 5);
        let crew = missions[0]["crew_size"].as_u64().unwrap();
        assert!((2..=8).contains(&crew));
    }
}
