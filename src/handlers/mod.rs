//! Request handlers.
//!
//! GET routes answer with JSON view models for the frontend to render; successful
//! form submissions answer with a 303 redirect to the page the browser should load
//! next, and invalid ones re-render the form with status 422.

use axum::{
    Json,
    extract::{FromRequest, Request, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use serde::{Serialize, de::DeserializeOwned};
use validator::{ValidationError, ValidationErrors};

use crate::{
    AppState,
    errors::{AppError, AppResult},
    models::{PostListView, PostSummary},
    pagination::{Page, Paginator},
    policy,
    query::PostQuery,
};

pub mod comments;
pub mod listings;
pub mod posts;
pub mod profiles;
pub mod uploads;

pub use comments::*;
pub use listings::*;
pub use posts::*;
pub use profiles::*;
pub use uploads::*;

/// health
///
/// [Public Route] Liveness probe.
#[utoipa::path(
    get,
    path = "/health",
    responses((status = 200, description = "Service is up", body = String))
)]
pub async fn health() -> &'static str {
    "ok"
}

/// JsonBody
///
/// `Json` for submitted forms. A body that is not valid JSON for `T` is rejected
/// as a validation error on `body`, in the same envelope as every other error.
pub struct JsonBody<T>(pub T);

impl<S, T> FromRequest<S> for JsonBody<T>
where
    S: Send + Sync,
    T: DeserializeOwned,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(Self(value)),
            Err(rejection) => Err(body_error(rejection)),
        }
    }
}

fn body_error(rejection: JsonRejection) -> AppError {
    tracing::debug!("Rejected request body: {}", rejection.body_text());
    let mut error = ValidationError::new("invalid_body");
    error.message = Some(rejection.body_text().into());
    let mut errors = ValidationErrors::new();
    errors.add("body", error);
    AppError::Validation(errors)
}

pub(crate) fn post_url(post_id: i64) -> String {
    format!("/posts/{}/", post_id)
}

pub(crate) fn profile_url(username: &str) -> String {
    format!("/profile/{}/", username)
}

pub(crate) fn redirect(url: String) -> Response {
    Redirect::to(&url).into_response()
}

/// A view re-rendered after a failed submission.
pub(crate) fn unprocessable<T: Serialize>(view: T) -> Response {
    (StatusCode::UNPROCESSABLE_ENTITY, Json(view)).into_response()
}

pub(crate) fn with_image_url(state: &AppState, mut post: PostSummary) -> PostSummary {
    post.image_url = post.image.as_deref().map(|key| state.storage.object_url(key));
    post
}

/// load_page
///
/// Counts the listing, resolves the requested page against that count, then
/// fetches only the rows of that page.
pub(crate) async fn load_page(
    state: &AppState,
    query: &PostQuery,
    requested: Option<&str>,
) -> AppResult<Page<PostSummary>> {
    let now = state.clock.now();
    let paginator = Paginator::new(state.config.posts_per_page);

    let total_count = state.repo.count_posts(query, now).await?;
    let window = paginator.window(requested, total_count);
    let posts = state
        .repo
        .list_posts(query, now, window.limit, window.offset)
        .await?
        .into_iter()
        .map(|post| with_image_url(state, post))
        .collect();

    Ok(paginator.page(window, posts, total_count))
}

pub(crate) fn list_view(page: Page<PostSummary>) -> PostListView {
    PostListView {
        posts: page.items,
        page: page.meta,
        category: None,
        profile: None,
    }
}

/// The post, if `viewer_id` may see it; `NotFound` otherwise.
pub(crate) async fn visible_post(
    state: &AppState,
    viewer_id: Option<uuid::Uuid>,
    post_id: i64,
) -> AppResult<PostSummary> {
    let post = state.repo.get_post(post_id).await?;
    let post = policy::authorize_view(post, viewer_id, state.clock.now())?;
    Ok(with_image_url(state, post))
}
