//! # api-adapters
//!
//! The HTTP transport for topic-board. The core is transport-agnostic; this
//! crate only maps requests onto `ForumService` calls.

#[cfg(feature = "web-axum")]
pub mod error;
#[cfg(feature = "web-axum")]
pub mod handlers;

#[cfg(feature = "web-axum")]
pub use handlers::AppState;

/// Builds the router.
///
/// ```text
/// GET  /v0/boards/{kind}/{parent_id}/topics?limit&offset
/// POST /v0/boards/{kind}/{parent_id}/topics
/// GET  /v0/topics/{kind}/{topic_id}
/// POST /v0/topics/{kind}/{topic_id}/replies
/// ```
#[cfg(feature = "web-axum")]
pub fn router(state: AppState) -> axum::Router {
    use axum::routing::{get, post};
    use tower_http::trace::TraceLayer;

    axum::Router::new()
        .route(
            "/v0/boards/{kind}/{parent_id}/topics",
            get(handlers::list_topics).post(handlers::create_topic),
        )
        .route("/v0/topics/{kind}/{topic_id}", get(handlers::get_thread))
        .route("/v0/topics/{kind}/{topic_id}/replies", post(handlers::create_reply))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
