//! The contract every demo backend implements.

use axum::Router;
use rand::rngs::StdRng;
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::sync::Mutex;

/// Engine state shared between the handlers of one service.
pub type Shared<T> = Arc<Mutex<T>>;

pub fn shared<T>(value: T) -> Shared<T> {
    Arc::new(Mutex::new(value))
}

/// One documented endpoint of a service.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct Route {
    pub method: &'static str,
    pub path: &'static str,
    pub summary: &'static str,
}

impl Route {
    pub const fn new(method: &'static str, path: &'static str, summary: &'static str) -> Self {
        Self {
            method,
            path,
            summary,
        }
    }
}

/// Static metadata describing a demo service.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct ServiceDescriptor {
    /// Unique, CLI-friendly identifier (e.g. `carbon`).
    pub name: &'static str,
    /// Display title used in the banner.
    pub title: &'static str,
    /// One-line description.
    pub tagline: &'static str,
    pub version: &'static str,
    /// Port the service listens on unless configured otherwise.
    pub default_port: u16,
    pub features: &'static [&'static str],
    pub routes: &'static [Route],
}

/// A demo backend that can be mounted on its own listener.
pub trait DemoService: Send + Sync {
    fn descriptor(&self) -> &'static ServiceDescriptor;

    /// Builds the service routes around a fresh engine drawing from `rng`.
    ///
    /// The returned router does not carry the shared layers; see
    /// [`crate::server::mount`].
    fn router(&self, rng: StdRng) -> Router;
}

/// The body served on `GET /` by every service.
pub fn banner(descriptor: &ServiceDescriptor) -> Value {
    json!({
        "message": format!("{} - {}", descriptor.title, descriptor.tagline),
        "version": descriptor.version,
        "status": "operational",
        "features": descriptor.features,
    })
}

/// Like [`banner`] with additional top-level fields merged in.
pub fn banner_with(descriptor: &ServiceDescriptor, extra: Value) -> Value {
    let mut body = banner(descriptor);
    if let (Some(target), Value::Object(extra)) = (body.as_object_mut(), extra) {
        target.extend(extra);
    }
    body
}

#[cfg(test)]
mod tests {
    use super::*;

    const DESCRIPTOR: ServiceDescriptor = ServiceDescriptor {
        name: "sample",
        title: "Sample Platform",
        tagline: "Does sample things",
        version: "1.0.0",
        default_port: 9000,
        features: &["One", "Two"],
        routes: &[Route::new("GET", "/api/sample", "Sample route")],
    };

    #[test]
    fn test_banner_shape() {
        let body = banner(&DESCRIPTOR);
        assert_eq!(body["message"], "Sample Platform - Does sample things");
        assert_eq!(body["version"], "1.0.0");
        assert_eq!(body["status"], "operational");
        assert_eq!(body["features"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn test_banner_with_extra_fields() {
        let body = banner_with(&DESCRIPTOR, json!({"protocols": ["curve"]}));
        assert_eq!(body["protocols"][0], "curve");
        assert_eq!(body["status"], "operational");
    }
}
