//! Agriculture AI: crop health scoring and weather advice.

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
    name: "agriculture",
    title: "Agriculture AI",
    tagline: "Smart farming optimization platform",
    version: "1.0.0",
    default_port: 8008,
    features: &[
        "Crop health monitoring",
        "Yield prediction",
        "Weather analysis",
        "Smart irrigation",
    ],
    routes: &[
        Route::new("POST", "/api/crop-analysis", "Analyze crop health"),
        Route::new("GET", "/api/weather", "Current weather and field recommendations"),
    ],
};

const CROPS: [&str; 5] = ["Wheat", "Corn", "Soybean", "Rice", "Potato"];
const WEATHER: [&str; 4] = ["Sunny", "Rainy", "Cloudy", "Windy"];
const PEST_LEVELS: [&str; 4] = ["None", "Low", "Medium", "High"];
const RECOMMENDATIONS: [&str; 4] = [
    "Optimal planting conditions",
    "Increase irrigation by 15%",
    "Monitor for pest activity",
    "Harvest window opening",
];

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct CropRequest {
    pub crop: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CropAnalysis {
    pub crop_type: String,
    pub health_score: f64,
    pub yield_prediction: f64,
    pub disease_risk: f64,
    pub pest_detection: &'static str,
    pub irrigation_needed: bool,
    pub fertilizer_recommendation: f64,
    pub harvest_date: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct WeatherReport {
    pub current_weather: &'static str,
    pub temperature: f64,
    pub humidity: f64,
    pub recommendations: [&'static str; 4],
}

pub struct AgricultureAi {
    rng: StdRng,
}

impl AgricultureAi {
    pub fn new(rng: StdRng) -> Self {
        Self { rng }
    }

    pub fn analyze_crop_health(&mut self, request: &CropRequest) -> CropAnalysis {
        let rng = &mut self.rng;
        let crop_type = match &request.crop {
            Some(crop) => crop.clone(),
            None => mock::pick(rng, &CROPS).to_string(),
        };
        CropAnalysis {
            crop_type,
            health_score: mock::uniform_rounded(rng, 60.0, 95.0, 1),
            yield_prediction: mock::uniform_rounded(rng, 80.0, 120.0, 1),
            disease_risk: mock::uniform_rounded(rng, 5.0, 30.0, 1),
            pest_detection: mock::pick(rng, &PEST_LEVELS),
            irrigation_needed: rng.gen_bool(0.5),
            fertilizer_recommendation: mock::uniform_rounded(rng, 50.0, 200.0, 1),
            harvest_date: Utc::now() + Duration::days(rng.gen_range(30..=120)),
        }
    }

    pub fn weather(&mut self) -> WeatherReport {
        let rng = &mut self.rng;
        WeatherReport {
            current_weather: mock::pick(rng, &WEATHER),
            temperature: mock::uniform_rounded(rng, 15.0, 35.0, 1),
            humidity: mock::uniform_rounded(rng, 40.0, 90.0, 1),
            recommendations: RECOMMENDATIONS,
        }
    }
}

pub struct AgricultureService;

impl DemoService for AgricultureService {
    fn descriptor(&self) -> &'static ServiceDescriptor {
        &DESCRIPTOR
    }

    fn router(&self, rng: StdRng) -> Router {
        Router::new()
            .route("/", get(root))
            .route("/api/crop-analysis", post(analyze_crop))
            .route("/api/weather", get(weather))
            .with_state(shared(AgricultureAi::new(rng)))
    }
}

async fn root() -> Json<Value> {
    Json(banner(&DESCRIPTOR))
}

async fn analyze_crop(
    State(ai): State<Shared<AgricultureAi>>,
    Payload(request): Payload<CropRequest>,
) -> Json<Value> {
    let analysis = ai.lock().await.analyze_crop_health(&request);
    Json(json!({"success": true, "analysis": analysis}))
}

async fn weather(State(ai): State<Shared<AgricultureAi>>) -> Json<Value> {
    let weather = ai.lock().await.weather();
    Json(json!({"success": true, "weather": weather}))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_app;
    use axum::http::StatusCode;
    use demo_core::testing;

    #[tokio::test]
    async fn test_crop_analysis_echoes_crop() {
        let app = test_app(&AgricultureService);
        let (status, body) =
            testing::post(&app, "/api/crop-analysis", json!({"crop": "Barley"})).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        let analysis = &body["analysis"];
        assert_eq!(analysis["crop_type"], "Barley");
        let health = analysis["health_score"].as_f64().unwrap();
        assert!((60.0..=95.0).contains(&health));
    }

    #[tokio::test]
    async fn test_crop_analysis_without_body_picks_known_crop() {
        let app = test_app(&AgricultureService);
        let (_, body) = testing::call(&app, axum::http::Method::POST, "/api/crop-analysis", None).await;
        let crop = body["analysis"]["crop_type"].as_str().unwrap();
        assert!(CROPS.contains(&crop));
    }

    #[test]
    fn test_weather_ranges() {
        let mut ai = AgricultureAi::new(mock::seeded(Some(11)));
        for _ in 0..50 {
            let report = ai.weather();
            assert!((15.0..=35.0).contains(&report.temperature));
            assert!((40.0..=90.0).contains(&report.humidity));
            assert_eq!(report.recommendations.len(), 4);
        }
    }
}
