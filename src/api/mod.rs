mod handlers;

use std::sync::Arc;

use axum::{
    routing::{get, post, put},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::estimator::Estimator;
use crate::sessions::SessionStore;

/// Shared handler state: the read-only estimator and the per-session projects.
#[derive(Clone)]
pub struct AppState {
    pub estimator: Arc<Estimator>,
    pub sessions: SessionStore,
}

impl AppState {
    pub fn new(estimator: Estimator) -> Self {
        Self::with_sessions(estimator, SessionStore::new())
    }

    pub fn with_sessions(estimator: Estimator, sessions: SessionStore) -> Self {
        Self {
            estimator: Arc::new(estimator),
            sessions,
        }
    }
}

pub fn create_router(state: AppState) -> Router {
    let api = Router::new()
        // Catalogues
        .route("/clients", get(handlers::list_clients))
        .route("/line-items", get(handlers::list_line_items))
        // Sessions
        .route("/sessions", post(handlers::create_session))
        .route(
            "/sessions/{id}",
            get(handlers::get_session).delete(handlers::delete_session),
        )
        .route("/sessions/{id}/client", put(handlers::set_session_client))
        .route(
            "/sessions/{id}/tickets",
            get(handlers::list_tickets).post(handlers::add_ticket),
        )
        .route("/sessions/{id}/reset", post(handlers::reset_session))
        .route("/sessions/{id}/prediction", get(handlers::get_prediction))
        // Stateless
        .route("/predict", post(handlers::predict))
        // Health
        .route("/health", get(handlers::health));

    Router::new()
        .nest("/api/v1", api)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}
