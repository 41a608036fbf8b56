//! # Demo Core Library
//!
//! The shared foundation every demo backend is built on.
//!
//! ## Modules
//! - `service`: The `DemoService` trait, descriptors and shared engine state.
//! - `catalog`: Ordered registry of the available demo services.
//! - `ports`: Port bookkeeping used to resolve listener collisions.
//! - `config`: Layered hub configuration (file, environment, defaults).
//! - `server`: Router finishing (CORS, health, logging, fallback) and serving.
//! - `extract`: Lenient JSON body extractor.
//! - `error`: The `ApiError` type returned by handlers.
//! - `mock`: Random value helpers used to fabricate responses.

pub mod catalog;
pub mod config;
pub mod error;
pub mod extract;
pub mod mock;
pub mod ports;
pub mod server;
pub mod service;

#[cfg(any(test, feature = "test-utils"))]
pub mod testing;

pub use catalog::ServiceCatalog;
pub use error::{ApiError, ApiResult};
pub use extract::Payload;
pub use service::{banner, banner_with, shared, DemoService, Route, ServiceDescriptor, Shared};
