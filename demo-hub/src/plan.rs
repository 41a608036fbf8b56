//! Port planning for `serve`.
//!
//! Each service asks for its configured port, else its default. Configured
//! ports are claimed first; whoever loses a collision is moved into the
//! fallback range.

use crate::error::HubError;
use demo_core::{config::HubConfig, ServiceDescriptor};
use log::warn;

#[derive(Debug, Clone)]
pub struct Assignment {
    pub service: &'static ServiceDescriptor,
    pub port: u16,
    /// The port that was asked for, when it had to be given up.
    pub displaced_from: Option<u16>,
}

pub fn plan_ports(
    config: &HubConfig,
    services: &[&'static ServiceDescriptor],
) -> Result<Vec<Assignment>, HubError> {
    let mut ports = config.fallback_ports.allocator();

    let mut wanted: Vec<(usize, u16, bool)> = services
        .iter()
        .enumerate()
        .map(|(i, d)| match config.service(d.name).port {
            Some(port) => (i, port, true),
            None => (i, d.default_port, false),
        })
        .collect();
    // Configured first, then catalog order.
    wanted.sort_by_key(|(i, _, configured)| (!configured, *i));

    let mut granted: Vec<Option<u16>> = vec![None; services.len()];
    for (i, port, _) in &wanted {
        if ports.reserve(*port) {
            granted[*i] = Some(*port);
        }
    }

    let mut plan = Vec::with_capacity(services.len());
    for (i, port, _) in wanted {
        let service = services[i];
        let assignment = match granted[i] {
            Some(port) => Assignment {
                service,
                port,
                displaced_from: None,
            },
            None => {
                let fallback = ports.allocate().ok_or(HubError::PortExhausted {
                    service: service.name,
                    start: config.fallback_ports.start,
                    end: config.fallback_ports.end,
                })?;
                warn!(
                    "Port {} for '{}' is already taken, using {} instead",
                    port, service.name, fallback
                );
                Assignment {
                    service,
                    port: fallback,
                    displaced_from: Some(port),
                }
            }
        };
        plan.push(assignment);
    }
    plan.sort_by_key(|a| a.service.name);
    Ok(plan)
}

#[cfg(test)]
mod tests {
    use super::*;
    use demo_core::Route;

    const ROUTES: &[Route] = &[Route::new("GET", "/api/x", "x")];

    const fn descriptor(name: &'static str, default_port: u16) -> ServiceDescriptor {
        ServiceDescriptor {
            name,
            title: name,
            tagline: "",
            version: "1.0.0",
            default_port,
            features: &[],
            routes: ROUTES,
        }
    }

    static ALPHA: ServiceDescriptor = descriptor("alpha", 8002);
    static BETA: ServiceDescriptor = descriptor("beta", 8002);
    static GAMMA: ServiceDescriptor = descriptor("gamma", 8003);

    fn ports(plan: &[Assignment]) -> Vec<(&str, u16, Option<u16>)> {
        plan.iter()
            .map(|a| (a.service.name, a.port, a.displaced_from))
            .collect()
    }

    #[test]
    fn test_defaults_without_collisions() {
        let config = HubConfig::default();
        let plan = plan_ports(&config, &[&ALPHA, &GAMMA]).unwrap();
        assert_eq!(ports(&plan), vec![("alpha", 8002, None), ("gamma", 8003, None)]);
    }

    #[test]
    fn test_collision_moves_later_service_to_fallback() {
        let config = HubConfig::default();
        let plan = plan_ports(&config, &[&ALPHA, &BETA, &GAMMA]).unwrap();
        assert_eq!(
            ports(&plan),
            vec![
                ("alpha", 8002, None),
                ("beta", 8100, Some(8002)),
                ("gamma", 8003, None),
            ]
        );
    }

    #[test]
    fn test_configured_port_wins_over_default() {
        let config = HubConfig::from_toml_str(
            r#"
            [services.beta]
            port = 8002

            [services.gamma]
            port = 9000
            "#,
        )
        .unwrap();
        let plan = plan_ports(&config, &[&ALPHA, &BETA, &GAMMA]).unwrap();
        assert_eq!(
            ports(&plan),
            vec![
                ("alpha", 8100, Some(8002)),
                ("beta", 8002, None),
                ("gamma", 9000, None),
            ]
        );
    }

    #[test]
    fn test_fallback_skips_requested_ports() {
        let config = HubConfig::from_toml_str(
            r#"
            [fallback_ports]
            start = 8003
            end = 8004
            "#,
        )
        .unwrap();
        let plan = plan_ports(&config, &[&ALPHA, &BETA, &GAMMA]).unwrap();
        assert_eq!(plan[1].port, 8004);
    }

    #[test]
    fn test_exhausted_fallback_is_an_error() {
        let config = HubConfig::from_toml_str(
            r#"
            [fallback_ports]
            start = 8003
            end = 8003
            "#,
        )
        .unwrap();
        let err = plan_ports(&config, &[&ALPHA, &BETA, &GAMMA]).unwrap_err();
        assert!(matches!(err, HubError::PortExhausted { service: "beta", .. }));
    }
}
