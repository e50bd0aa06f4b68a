//! HTTP surface for the transaction module.
//!
//! The session layer in front of this router resolves the signed-in user and
//! inserts a [`CurrentUser`](crate::rbac::CurrentUser) into request
//! extensions. Handlers never read it directly: they pass a [`RequestAuth`]
//! to the service, which resolves the tenant context itself.
//!
//! # Routes
//!
//! - `GET /health`, `GET /metrics` (unversioned)
//! - `/api/v1/...` (see [`v1::v1_router`])

mod extract;
mod handlers;
pub mod v1;

use axum::{routing::get, Router};
use metrics_exporter_prometheus::PrometheusHandle;
use serde::Serialize;
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::rbac::AccessPolicy;
use crate::transactions::TransactionService;

pub use extract::RequestAuth;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub transactions: Arc<TransactionService>,
    pub policy: AccessPolicy,
    pub metrics: Option<PrometheusHandle>,
}

impl AppState {
    pub fn new(transactions: TransactionService, policy: AccessPolicy) -> Self {
        Self {
            transactions: Arc::new(transactions),
            policy,
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }
}

/// Build the full router.
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/metrics", get(handlers::prometheus_metrics))
        .nest(v1::V1_PREFIX, v1::v1_router(state.policy.clone()))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Success envelope. Failures use [`ErrorResponse`](crate::error::ErrorResponse).
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: T,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data,
        }
    }
}
