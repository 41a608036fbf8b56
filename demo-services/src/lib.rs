//! # Demo Services
//!
//! One module per demo backend. Each exposes a `DESCRIPTOR` and a unit struct
//! implementing [`DemoService`]; [`catalog`] registers all of them.
//!
//! Nearly every value served here is fabricated with the service RNG. The few
//! pieces that are derived from input (task scoring, portfolio bookkeeping,
//! greedy allocations, aggregate statistics) are exact and tested as such.

pub mod agriculture;
pub mod carbon;
pub mod code_review;
pub mod contract_scanner;
pub mod defi_yield;
pub mod defimax;
pub mod edge_ai;
pub mod energy;
pub mod financequest;
pub mod fraud;
pub mod iot;
pub mod markets;
pub mod metaverse;
pub mod neurotrade;
pub mod quantum;
pub mod robotics;
pub mod space;
pub mod task_priority;
pub mod trading_bot;

use demo_core::{DemoService, ServiceCatalog};

/// Every demo backend in this crate.
pub fn catalog() -> ServiceCatalog {
    ServiceCatalog::new()
        .with(agriculture::AgricultureService)
        .with(carbon::CarbonService)
        .with(code_review::CodeReviewService)
        .with(contract_scanner::ContractScannerService)
        .with(defi_yield::DefiYieldService)
        .with(defimax::DefiMaxService)
        .with(edge_ai::EdgeAiService)
        .with(energy::EnergyService)
        .with(financequest::FinanceQuestService)
        .with(fraud::FraudService)
        .with(iot::IotService)
        .with(metaverse::MetaverseService)
        .with(neurotrade::NeuroTradeService)
        .with(quantum::QuantumService)
        .with(robotics::RoboticsService)
        .with(space::SpaceService)
        .with(task_priority::TaskPriorityService)
        .with(trading_bot::TradingBotService)
}

/// Mounts `service` with the shared layers and a fixed seed.
#[cfg(test)]
pub(crate) fn test_app(service: &dyn DemoService) -> axum::Router {
    let descriptor = service.descriptor();
    demo_core::server::mount(descriptor, service.router(demo_core::mock::seeded(Some(7))))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use demo_core::testing;
    use std::collections::HashSet;

    #[test]
    fn test_catalog_has_every_service() {
        let catalog = catalog();
        assert_eq!(catalog.len(), 18);
        for name in ["carbon", "task-priority", "edge-ai", "defimax", "fraud"] {
            assert!(catalog.contains(name), "missing {}", name);
        }
    }

    #[test]
    fn test_descriptors_are_well_formed() {
        let mut names = HashSet::new();
        for descriptor in catalog().descriptors() {
            assert!(names.insert(descriptor.name));
            assert!(!descriptor.routes.is_empty(), "{} has no routes", descriptor.name);
            assert!(descriptor.routes.iter().all(|r| r.path.starts_with("/api/")));
        }
    }

    #[tokio::test]
    async fn test_every_service_serves_banner_and_health() {
        for service in catalog().iter() {
            let app = test_app(service);
            let (status, body) = testing::get(&app, "/").await;
            assert_eq!(status, StatusCode::OK, "{}", service.descriptor().name);
            assert_eq!(body["status"], "operational");
            assert_eq!(body["version"], "1.0.0");

            let (status, _) = testing::get(&app, "/health").await;
            assert_eq!(status, StatusCode::OK);
        }
    }
}
