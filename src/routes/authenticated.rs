use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post},
};

/// Authenticated Router Module
///
/// Every write, plus the form pages that lead to one. Handlers receive the
/// resolved `AuthUser` and perform the owner checks themselves: a non-author
/// editing or deleting a post is redirected to it, a non-author deleting a
/// comment gets 404.
pub fn authenticated_routes() -> Router<AppState> {
    Router::<AppState>::new()
        // POST /upload/presigned
        // Short-lived URL for uploading a post image straight to storage.
        .route("/upload/presigned", post(handlers::get_presigned_url))
        // --- Posts ---
        .route(
            "/posts/create/",
            get(handlers::create_post_form).post(handlers::create_post),
        )
        // POST /posts/{id}/
        // The comment form embedded in the detail page (the GET side is public).
        .route("/posts/{id}/", post(handlers::comment_from_detail))
        .route(
            "/posts/{id}/edit/",
            get(handlers::edit_post_form).post(handlers::edit_post),
        )
        .route(
            "/posts/{id}/delete/",
            get(handlers::delete_post_confirm).post(handlers::delete_post),
        )
        // --- Comments ---
        .route("/posts/{id}/comment/", post(handlers::add_comment))
        .route(
            "/posts/{id}/comment/{comment_id}/edit/",
            get(handlers::edit_comment_form).post(handlers::edit_comment),
        )
        .route(
            "/posts/{id}/comment/{comment_id}/delete/",
            get(handlers::delete_comment_confirm).post(handlers::delete_comment),
        )
        // --- Profile ---
        .route(
            "/profile/edit/",
            get(handlers::edit_profile_form).post(handlers::edit_profile),
        )
}
