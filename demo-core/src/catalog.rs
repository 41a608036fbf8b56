//! In-memory registry of the demo services that can be served.
//!
//! Pure data: it does no I/O and starts nothing.

use crate::service::{DemoService, ServiceDescriptor};
use std::collections::BTreeMap;

/// Registry of demo services, ordered by name.
#[derive(Default)]
pub struct ServiceCatalog {
    services: BTreeMap<&'static str, Box<dyn DemoService>>,
}

impl ServiceCatalog {
    pub fn new() -> Self {
        Self {
            services: BTreeMap::new(),
        }
    }

    /// Register a service, replacing any previous one with the same name.
    pub fn register(&mut self, service: Box<dyn DemoService>) {
        let name = service.descriptor().name;
        if self.services.insert(name, service).is_some() {
            log::warn!("Service '{}' registered twice, keeping the latest", name);
        }
    }

    pub fn with(mut self, service: impl DemoService + 'static) -> Self {
        self.register(Box::new(service));
        self
    }

    pub fn get(&self, name: &str) -> Option<&(dyn DemoService + 'static)> {
        self.services.get(name).map(|s| &**s)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.services.contains_key(name)
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.services.keys().copied().collect()
    }

    pub fn descriptors(&self) -> Vec<&'static ServiceDescriptor> {
        self.services.values().map(|s| s.descriptor()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &(dyn DemoService + 'static)> {
        self.services.values().map(|s| &**s)
    }

    pub fn len(&self) -> usize {
        self.services.len()
    }

    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::Route;
    use axum::Router;
    use rand::rngs::StdRng;

    struct Dummy(&'static ServiceDescriptor);

    impl DemoService for Dummy {
        fn descriptor(&self) -> &'static ServiceDescriptor {
            self.0
        }

        fn router(&self, _rng: StdRng) -> Router {
            Router::new()
        }
    }

    const ALPHA: ServiceDescriptor = ServiceDescriptor {
        name: "alpha",
        title: "Alpha",
        tagline: "first",
        version: "1.0.0",
        default_port: 9001,
        features: &[],
        routes: &[Route::new("GET", "/api/a", "a")],
    };

    const BETA: ServiceDescriptor = ServiceDescriptor {
        name: "beta",
        title: "Beta",
        tagline: "second",
        version: "1.0.0",
        default_port: 9002,
        features: &[],
        routes: &[],
    };

    #[test]
    fn test_register_and_lookup() {
        let catalog = ServiceCatalog::new().with(Dummy(&BETA)).with(Dummy(&ALPHA));
        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.names(), vec!["alpha", "beta"]);
        assert!(catalog.contains("beta"));
        assert_eq!(catalog.get("alpha").unwrap().descriptor().default_port, 9001);
        assert!(catalog.get("gamma").is_none());
    }

    #[test]
    fn test_register_replaces_same_name() {
        let mut catalog = ServiceCatalog::new();
        catalog.register(Box::new(Dummy(&ALPHA)));
        catalog.register(Box::new(Dummy(&ALPHA)));
        assert_eq!(catalog.len(), 1);
        assert!(!catalog.is_empty());
    }
}
