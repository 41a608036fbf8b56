//! Metaverse platform: avatars spread over a handful of virtual worlds.

use axum::{extract::State, routing::get, Json, Router};
use chrono::{DateTime, Utc};
use demo_core::{banner, mock, shared, DemoService, Route, ServiceDescriptor, Shared};
use rand::{rngs::StdRng, Rng};
use serde::Serialize;
use serde_json::{json, Value};

pub const DESCRIPTOR: ServiceDescriptor = ServiceDescriptor {
    name: "metaverse",
    title: "Metaverse Platform",
    tagline: "Virtual world experience platform",
    version: "1.0.0",
    default_port: 8012,
    features: &[
        "Virtual world creation",
        "Avatar management",
        "Social interactions",
        "Digital economy",
    ],
    routes: &[
        Route::new("GET", "/api/avatars", "List avatars"),
        Route::new("GET", "/api/analytics", "World analytics"),
    ],
};

const WORLDS: [&str; 4] = ["Virtual City", "Space Station", "Fantasy Realm", "Digital Office"];
const AVATAR_COUNT: usize = 15;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Presence {
    Online,
    Offline,
    Away,
}

#[derive(Debug, Clone, Serialize)]
pub struct Avatar {
    pub id: String,
    pub name: String,
    pub world: &'static str,
    pub level: u32,
    pub experience: u32,
    pub currency: u64,
    pub status: Presence,
    pub last_active: DateTime<Utc>,
    pub achievements: u32,
}

#[derive(Debug, Serialize)]
pub struct WorldAnalytics {
    pub total_avatars: usize,
    pub online_users: usize,
    pub worlds_active: usize,
    pub total_currency: u64,
    pub average_level: f64,
    pub engagement_score: f64,
}

pub struct MetaversePlatform {
    rng: StdRng,
    avatars: Vec<Avatar>,
}

impl MetaversePlatform {
    pub fn new(mut rng: StdRng) -> Self {
        let presences = [Presence::Online, Presence::Offline, Presence::Away];
        let avatars = (0..AVATAR_COUNT)
            .map(|i| Avatar {
                id: format!("AVATAR_{:03}", i),
                name: format!("Player_{}", i + 1),
                world: mock::pick(&mut rng, &WORLDS),
                level: rng.gen_range(1..=100),
                experience: rng.gen_range(100..=10_000),
                currency: rng.gen_range(100..=50_000),
                status: mock::pick(&mut rng, &presences),
                last_active: mock::now(),
                achievements: rng.gen_range(0..=25),
            })
            .collect();
        Self { rng, avatars }
    }

    pub fn avatars(&self) -> &[Avatar] {
        &self.avatars
    }

    pub fn analytics(&mut self) -> WorldAnalytics {
        let levels: Vec<f64> = self.avatars.iter().map(|a| f64::from(a.level)).collect();
        WorldAnalytics {
            total_avatars: self.avatars.len(),
            online_users: self
                .avatars
                .iter()
                .filter(|a| a.status == Presence::Online)
                .count(),
            worlds_active: WORLDS.len(),
            total_currency: self.avatars.iter().map(|a| a.currency).sum(),
            average_level: mock::round_to(mock::mean(&levels).unwrap_or_default(), 1),
            engagement_score: mock::uniform_rounded(&mut self.rng, 75.0, 95.0, 1),
        }
    }
}

pub struct MetaverseService;

impl DemoService for MetaverseService {
    fn descriptor(&self) -> &'static ServiceDescriptor {
        &DESCRIPTOR
    }

    fn router(&self, rng: StdRng) -> Router {
        Router::new()
            .route("/", get(root))
            .route("/api/avatars", get(avatars))
            .route("/api/analytics", get(analytics))
            .with_state(shared(MetaversePlatform::new(rng)))
    }
}

async fn root() -> Json<Value> {
    Json(banner(&DESCRIPTOR))
}

async fn avatars(State(platform): State<Shared<MetaversePlatform>>) -> Json<Value> {
    let platform = platform.lock().await;
    Json(json!({"success": true, "avatars": platform.avatars()}))
}

async fn analytics(State(platform): State<Shared<MetaversePlatform>>) -> Json<Value> {
    let analytics = platform.lock().await.analytics();
    Json(json!({"success": true, "analytics": analytics}))
}
