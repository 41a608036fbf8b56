use std::net::SocketAddr;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum HubError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Failed to bind {addr}: {source}")]
    Io {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("Unknown service '{0}' (see `demo-hub list`)")]
    UnknownService(String),

    #[error("Invalid listen host '{0}'")]
    InvalidHost(String),

    #[error("No free port left in {start}-{end} for service '{service}'")]
    PortExhausted {
        service: &'static str,
        start: u16,
        end: u16,
    },
}
