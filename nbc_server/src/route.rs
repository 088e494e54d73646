pub mod calendar;

use axum::{routing::get, Router};
use tower_http::trace::TraceLayer;

use crate::snapshot::Snapshot;

/// Build the router serving the snapshot.
pub fn app(snapshot: Snapshot) -> Router {
    Router::new()
        .route("/", get(calendar::handler))
        .route("/calendar", get(calendar::handler))
        .layer(TraceLayer::new_for_http())
        .with_state(snapshot)
}
