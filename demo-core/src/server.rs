use crate::service::ServiceDescriptor;
use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use log::info;
use serde_json::json;
use std::future::Future;
use std::net::SocketAddr;
use std::time::Instant;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;

/// Adds the layers every demo shares: `/health`, a JSON 404 fallback, request
/// logging and permissive CORS.
pub fn mount(descriptor: &'static ServiceDescriptor, router: Router) -> Router {
    router
        .route("/health", get(health_check))
        .fallback(not_found)
        .layer(middleware::from_fn_with_state(descriptor.name, log_request))
        .layer(CorsLayer::permissive())
}

pub async fn bind(addr: SocketAddr) -> std::io::Result<TcpListener> {
    TcpListener::bind(addr).await
}

/// Serves `app` until `shutdown` resolves.
pub async fn serve<F>(listener: TcpListener, app: Router, shutdown: F) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
}

async fn health_check() -> &'static str {
    "OK"
}

async fn not_found() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(json!({"success": false, "error": "Endpoint not found"})),
    )
}

async fn log_request(State(service): State<&'static str>, req: Request, next: Next) -> Response {
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let started = Instant::now();

    let response = next.run(req).await;

    info!(
        "[{}] {} {} -> {} ({} us)",
        service,
        method,
        path,
        response.status().as_u16(),
        started.elapsed().as_micros()
    );
    response
}
