//! IoT edge platform: a fixed fleet of devices generated at startup.

use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};
use chrono::{DateTime, Utc};
use demo_core::{
    banner, mock, shared, ApiError, ApiResult, DemoService, Route, ServiceDescriptor, Shared,
};
use rand::{rngs::StdRng, Rng};
use serde::Serialize;
use serde_json::{json, Value};

pub const DESCRIPTOR: ServiceDescriptor = ServiceDescriptor {
    name: "iot",
    title: "IoT Edge Computing Platform",
    tagline: "Smart device management",
    version: "1.0.0",
    default_port: 8006,
    features: &[
        "Device management",
        "Real-time monitoring",
        "Edge analytics",
        "Predictive maintenance",
    ],
    routes: &[
        Route::new("GET", "/api/devices", "List all devices"),
        Route::new("GET", "/api/devices/:id", "Fetch one device"),
        Route::new("GET", "/api/analytics", "Fleet analytics"),
    ],
};

const FLEET_SIZE: usize = 20;
const DEVICE_TYPES: [&str; 5] = ["Sensor", "Actuator", "Gateway", "Camera", "Thermostat"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DeviceStatus {
    Online,
    Offline,
    Maintenance,
}

#[derive(Debug, Clone, Serialize)]
pub struct Device {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub status: DeviceStatus,
    pub location: String,
    pub last_seen: DateTime<Utc>,
    pub data_points: u32,
    pub battery_level: u8,
    pub temperature: f64,
    pub humidity: f64,
}

#[derive(Debug, Serialize)]
pub struct FleetAnalytics {
    pub total_devices: usize,
    pub online_devices: usize,
    pub offline_devices: usize,
    pub maintenance_devices: usize,
    pub avg_temperature: f64,
    pub avg_humidity: f64,
    pub total_data_points: u64,
}

pub struct IotPlatform {
    devices: Vec<Device>,
}

impl IotPlatform {
    pub fn new(mut rng: StdRng) -> Self {
        let devices = (0..FLEET_SIZE).map(|i| generate_device(&mut rng, i)).collect();
        Self { devices }
    }

    pub fn devices(&self) -> &[Device] {
        &self.devices
    }

    pub fn device(&self, id: &str) -> Option<&Device> {
        self.devices.iter().find(|d| d.id == id)
    }

    pub fn analytics(&self) -> FleetAnalytics {
        let count = |status| self.devices.iter().filter(|d| d.status == status).count();
        let temperatures: Vec<f64> = self.devices.iter().map(|d| d.temperature).collect();
        let humidities: Vec<f64> = self.devices.iter().map(|d| d.humidity).collect();
        FleetAnalytics {
            total_devices: self.devices.len(),
            online_devices: count(DeviceStatus::Online),
            offline_devices: count(DeviceStatus::Offline),
            maintenance_devices: count(DeviceStatus::Maintenance),
            avg_temperature: mock::round_to(mock::mean(&temperatures).unwrap_or_default(), 1),
            avg_humidity: mock::round_to(mock::mean(&humidities).unwrap_or_default(), 1),
            total_data_points: self.devices.iter().map(|d| u64::from(d.data_points)).sum(),
        }
    }
}

fn generate_device(rng: &mut StdRng, index: usize) -> Device {
    let statuses = [
        DeviceStatus::Online,
        DeviceStatus::Offline,
        DeviceStatus::Maintenance,
    ];
    let kind = mock::pick(rng, &DEVICE_TYPES);
    Device {
        id: format!("DEVICE_{:03}", index),
        name: format!("Smart {} {}", kind, index),
        kind,
        status: mock::pick(rng, &statuses),
        location: format!(
            "Building {} Floor {}",
            rng.gen_range(1..=10),
            rng.gen_range(1..=5)
        ),
        last_seen: mock::now(),
        data_points: rng.gen_range(100..=10_000),
        battery_level: rng.gen_range(10..=100),
        temperature: mock::uniform_rounded(rng, 15.0, 35.0, 1),
        humidity: mock::uniform_rounded(rng, 30.0, 80.0, 1),
    }
}

pub struct IotService;

impl DemoService for IotService {
    fn descriptor(&self) -> &'static ServiceDescriptor {
        &DESCRIPTOR
    }

    fn router(&self, rng: StdRng) -> Router {
        Router::new()
            .route("/", get(root))
            .route("/api/devices", get(devices))
            .route("/api/devices/:id", get(device))
            .route("/api/analytics", get(analytics))
            .with_state(shared(IotPlatform::new(rng)))
    }
}

async fn root() -> Json<Value> {
    Json(banner(&DESCRIPTOR))
}

async fn devices(State(platform): State<Shared<IotPlatform>>) -> Json<Value> {
    let platform = platform.lock().await;
    Json(json!({"success": true, "devices": platform.devices()}))
}

async fn device(
    State(platform): State<Shared<IotPlatform>>,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    let platform = platform.lock().await;
    let device = platform
        .device(&id)
        .ok_or_else(|| ApiError::not_found(format!("Device {} not found", id)))?;
    Ok(Json(json!({"success": true, "device": device})))
}

async fn analytics(State(platform): State<Shared<IotPlatform>>) -> Json<Value> {
    let analytics = platform.lock().await.analytics();
    Json(json!({"success": true, "analytics": analytics}))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_app;
    use axum::http::StatusCode;
    use demo_core::testing;

    #[test]
    fn test_fleet_and_analytics() {
        let platform = IotPlatform::new(mock::seeded(Some(3)));
        assert_eq!(platform.devices().len(), 20);
        assert_eq!(platform.devices()[0].id, "DEVICE_000");
        assert_eq!(platform.devices()[19].id, "DEVICE_019");

        let analytics = platform.analytics();
        assert_eq!(
            analytics.online_devices + analytics.offline_devices + analytics.maintenance_devices,
            20
        );
        let total: u64 = platform.devices().iter().map(|d| d.data_points as u64).sum();
        assert_eq!(analytics.total_data_points, total);
        assert!((15.0..=35.0).contains(&analytics.avg_temperature));
    }

    #[tokio::test]
    async fn test_device_lookup() {
        let app = test_app(&IotService);
        let (status, body) = testing::get(&app, "/api/devices/DEVICE_007").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["device"]["id"], "DEVICE_007");

        let (status, body) = testing::get(&app, "/api/devices/DEVICE_999").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["success"], false);
    }
}
