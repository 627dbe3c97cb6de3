use axum::{routing::get, Router};
use tower_http::trace::TraceLayer;

use crate::api::{api_routes, prometheus_metrics};

use super::AppState;

pub fn create_app(state: AppState) -> Router {
    Router::new()
        .route("/metrics", get(prometheus_metrics))
        .merge(api_routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
