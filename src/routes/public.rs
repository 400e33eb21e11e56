use crate::{AppState, handlers};
use axum::{Router, routing::get};

/// Public Router Module
///
/// Read-only pages. Hidden posts, scheduled posts and unpublished categories are
/// filtered by the handlers, so anonymous visitors only ever see what is publicly
/// visible.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /health
        // Liveness probe for load balancers.
        .route("/health", get(handlers::health))
        // GET /?page=N
        // The front page, paginated.
        .route("/", get(handlers::index))
        // GET /category/{slug}/?page=N
        // 404 when the category is unknown or unpublished.
        .route("/category/{slug}/", get(handlers::category_posts))
        // GET /posts/{id}/
        // Post detail with published comments. Authors also see their own hidden posts.
        .route("/posts/{id}/", get(handlers::post_detail))
        // GET /profile/{username}/?page=N
        // The owner sees every post of their own; others only the visible ones.
        .route("/profile/{username}/", get(handlers::profile))
}
