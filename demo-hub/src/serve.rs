//! Runs the selected services side by side in one runtime.

use crate::error::HubError;
use crate::plan::{plan_ports, Assignment};
use demo_core::{config::HubConfig, mock, server, DemoService, ServiceCatalog};
use log::{error, info};
use std::collections::HashSet;
use std::net::{IpAddr, SocketAddr};
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio::task::JoinSet;

/// Resolves CLI names against the catalog. No names means every enabled
/// service. Repeated names are served once.
pub fn select<'a>(
    catalog: &'a ServiceCatalog,
    config: &HubConfig,
    names: &[String],
) -> Result<Vec<&'a dyn DemoService>, HubError> {
    if names.is_empty() {
        return Ok(catalog
            .iter()
            .filter(|s| config.is_enabled(s.descriptor().name))
            .collect());
    }
    let mut seen = HashSet::new();
    let mut selected = Vec::with_capacity(names.len());
    for name in names {
        let service = catalog
            .get(name)
            .ok_or_else(|| HubError::UnknownService(name.clone()))?;
        if seen.insert(service.descriptor().name) {
            selected.push(service);
        }
    }
    Ok(selected)
}

struct Bound<'a> {
    service: &'a dyn DemoService,
    assignment: Assignment,
    listener: TcpListener,
}

pub async fn serve(
    catalog: &ServiceCatalog,
    config: &HubConfig,
    names: &[String],
) -> Result<(), HubError> {
    let services = select(catalog, config, names)?;
    if services.is_empty() {
        info!("No services selected, nothing to serve");
        return Ok(());
    }
    let ip: IpAddr = config
        .host
        .parse()
        .map_err(|_| HubError::InvalidHost(config.host.clone()))?;

    let descriptors: Vec<_> = services.iter().map(|s| s.descriptor()).collect();
    let plan = plan_ports(config, &descriptors)?;

    // Bind everything before serving anything.
    let mut bound = Vec::with_capacity(plan.len());
    for assignment in plan {
        let addr = SocketAddr::new(ip, assignment.port);
        let listener = server::bind(addr)
            .await
            .map_err(|source| HubError::Io { addr, source })?;
        let service = services
            .iter()
            .copied()
            .find(|s| s.descriptor().name == assignment.service.name)
            .ok_or_else(|| HubError::UnknownService(assignment.service.name.to_string()))?;
        bound.push(Bound {
            service,
            assignment,
            listener,
        });
    }

    let (stop_tx, stop_rx) = watch::channel(false);
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("Ctrl-C received, shutting down"),
            Err(e) => error!("Failed to listen for Ctrl-C: {}", e),
        }
        let _ = stop_tx.send(true);
    });

    let mut tasks = JoinSet::new();
    for Bound {
        service,
        assignment,
        listener,
    } in bound
    {
        let descriptor = assignment.service;
        let rng = mock::seeded(config.seed.map(|seed| mock::derive_seed(seed, descriptor.name)));
        let app = server::mount(descriptor, service.router(rng));
        info!(
            "{} ({}) listening on http://{}:{}",
            descriptor.title, descriptor.name, config.host, assignment.port
        );

        let mut stop = stop_rx.clone();
        let shutdown = async move {
            while !*stop.borrow() {
                if stop.changed().await.is_err() {
                    break;
                }
            }
        };
        tasks.spawn(async move { (descriptor.name, server::serve(listener, app, shutdown).await) });
    }

    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok((name, Ok(()))) => info!("{} stopped", name),
            Ok((name, Err(e))) => error!("{} failed: {}", name, e),
            Err(e) => error!("Service task panicked: {}", e),
        }
    }
    Ok(())
}
