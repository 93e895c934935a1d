//! SCIM 2.0 provisioning service.
//!
//! Identity providers push users, groups and group memberships into an
//! organization over the SCIM protocol. Each organization authenticates with
//! its own bearer tokens and can only see its own resources.

use std::sync::Arc;

use axum::{Router, body::Body, http::Request, routing::get};
use tokio_util::task::TaskTracker;
use tower_http::{
    limit::RequestBodyLimitLayer,
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

pub mod config;
pub mod db;
pub mod middleware;
pub mod models;
pub mod observability;
pub mod routes;
pub mod scim;
pub mod services;

#[cfg(test)]
mod tests;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<config::AppConfig>,
    pub db: Arc<db::DbPool>,
    pub services: services::Services,
    /// Task tracker for background tasks (token `last_used_at` updates).
    /// Drained during graceful shutdown.
    pub task_tracker: TaskTracker,
}

impl AppState {
    /// Open the database, apply migrations if configured, and build services.
    pub async fn new(config: config::AppConfig) -> db::DbResult<Self> {
        let db = Arc::new(db::DbPool::from_config(&config.database).await?);

        if config.database.run_migrations {
            db.run_migrations().await?;
        }

        Ok(Self::from_parts(config, db, TaskTracker::new()))
    }

    /// Assemble state from an already-open pool.
    pub fn from_parts(
        config: config::AppConfig,
        db: Arc<db::DbPool>,
        task_tracker: TaskTracker,
    ) -> Self {
        let services = services::Services::new(db.clone(), &config, task_tracker.clone());
        Self {
            config: Arc::new(config),
            db,
            services,
            task_tracker,
        }
    }
}

pub fn build_app(config: &config::AppConfig, state: AppState) -> Router {
    let app = Router::new()
        .route("/health", get(routes::health::health_check))
        .route("/health/live", get(routes::health::liveness))
        .nest(
            config::SCIM_MOUNT_PATH,
            routes::scim_routes(state.clone()),
        );

    // Layers run bottom-up: the request id is set before the trace span opens.
    app.layer(TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
        tracing::info_span!(
            "http.request",
            method = %request.method(),
            uri = %request.uri(),
            request_id = %middleware::request_id_of(request),
        )
    }))
    .layer(PropagateRequestIdLayer::new(middleware::REQUEST_ID_HEADER))
    .layer(SetRequestIdLayer::new(
        middleware::REQUEST_ID_HEADER,
        middleware::MakeHexRequestId,
    ))
    .layer(RequestBodyLimitLayer::new(config.server.body_limit_bytes))
    .with_state(state)
}
