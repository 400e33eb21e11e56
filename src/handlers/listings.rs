use axum::{
    Json,
    extract::{Path, Query, State},
};

use crate::{
    AppState,
    errors::{AppError, AppResult},
    models::PostListView,
    pagination::PageParams,
    query::{PostQuery, PostScope},
};

use super::{list_view, load_page};

/// index
///
/// [Public Route] The front page: every publicly visible post, newest first.
#[utoipa::path(
    get,
    path = "/",
    params(PageParams),
    responses((status = 200, description = "Public posts", body = PostListView))
)]
pub async fn index(
    State(state): State<AppState>,
    Query(params): Query<PageParams>,
) -> AppResult<Json<PostListView>> {
    let query = PostQuery::new(PostScope::All);
    let page = load_page(&state, &query, params.page.as_deref()).await?;
    Ok(Json(list_view(page)))
}

/// category_posts
///
/// [Public Route] Publicly visible posts of one category. An unknown or
/// unpublished category is `NotFound`.
#[utoipa::path(
    get,
    path = "/category/{slug}/",
    params(("slug" = String, Path, description = "Category slug"), PageParams),
    responses(
        (status = 200, description = "Category posts", body = PostListView),
        (status = 404, description = "Unknown or unpublished category")
    )
)]
pub async fn category_posts(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    Query(params): Query<PageParams>,
) -> AppResult<Json<PostListView>> {
    let category = state
        .repo
        .get_published_category(&slug)
        .await?
        .ok_or(AppError::NotFound)?;

    let query = PostQuery::new(PostScope::Category(category.id));
    let page = load_page(&state, &query, params.page.as_deref()).await?;

    Ok(Json(PostListView {
        category: Some(category),
        ..list_view(page)
    }))
}
