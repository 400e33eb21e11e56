use axum::{
    Json,
    extract::{Path, State},
    response::{IntoResponse, Response},
};
use validator::Validate;

use crate::{
    AppState,
    auth::AuthUser,
    errors::{AppError, AppResult, field_errors},
    models::{Comment, CommentForm, DeleteView, FormView},
};

use super::{JsonBody, post_url, redirect, unprocessable, visible_post};

/// find_comment
///
/// Resolves `/posts/{id}/comment/{comment_id}/...`: the post must exist and the
/// comment must belong to it.
async fn find_comment(state: &AppState, post_id: i64, comment_id: i64) -> AppResult<Comment> {
    if state.repo.get_post(post_id).await?.is_none() {
        return Err(AppError::NotFound);
    }
    state
        .repo
        .get_comment(post_id, comment_id)
        .await?
        .ok_or(AppError::NotFound)
}

/// add_comment
///
/// [Authenticated Route] Adds a comment to a post the user may see and redirects
/// back to the post. Empty text adds nothing.
#[utoipa::path(
    post,
    path = "/posts/{id}/comment/",
    params(("id" = i64, Path, description = "Post ID")),
    request_body = CommentForm,
    responses(
        (status = 303, description = "Redirect to the post"),
        (status = 404, description = "Missing or not visible to the user")
    )
)]
pub async fn add_comment(
    user: AuthUser,
    State(state): State<AppState>,
    Path(post_id): Path<i64>,
    JsonBody(form): JsonBody<CommentForm>,
) -> AppResult<Response> {
    let post = visible_post(&state, Some(user.id), post_id).await?;

    if form.validate().is_ok() {
        let comment = state.repo.add_comment(post.id, user.id, form.text).await?;
        tracing::info!(post_id = post.id, comment_id = comment.id, "Comment added");
    }
    Ok(redirect(post_url(post.id)))
}

/// edit_comment_form
///
/// [Authenticated Route] The author's comment, prefilled for editing. Anyone else
/// is redirected to the post.
#[utoipa::path(
    get,
    path = "/posts/{id}/comment/{comment_id}/edit/",
    params(
        ("id" = i64, Path, description = "Post ID"),
        ("comment_id" = i64, Path, description = "Comment ID")
    ),
    responses(
        (status = 200, description = "Prefilled comment form", body = CommentForm),
        (status = 303, description = "Not the author; redirect to the post"),
        (status = 404, description = "Post or comment not found")
    )
)]
pub async fn edit_comment_form(
    user: AuthUser,
    State(state): State<AppState>,
    Path((post_id, comment_id)): Path<(i64, i64)>,
) -> AppResult<Response> {
    let comment = find_comment(&state, post_id, comment_id).await?;
    if comment.author_id != user.id {
        tracing::debug!(comment_id, user = %user.username, "Not the author; redirecting to post");
        return Ok(redirect(post_url(post_id)));
    }
    Ok(Json(FormView::edit(CommentForm { text: comment.text })).into_response())
}

/// edit_comment
///
/// [Authenticated Route] Saves the author's new text and redirects to the post.
#[utoipa::path(
    post,
    path = "/posts/{id}/comment/{comment_id}/edit/",
    params(
        ("id" = i64, Path, description = "Post ID"),
        ("comment_id" = i64, Path, description = "Comment ID")
    ),
    request_body = CommentForm,
    responses(
        (status = 303, description = "Redirect to the post"),
        (status = 404, description = "Post or comment not found"),
        (status = 422, description = "Form re-rendered with errors", body = CommentForm)
    )
)]
pub async fn edit_comment(
    user: AuthUser,
    State(state): State<AppState>,
    Path((post_id, comment_id)): Path<(i64, i64)>,
    JsonBody(form): JsonBody<CommentForm>,
) -> AppResult<Response> {
    let comment = find_comment(&state, post_id, comment_id).await?;
    if comment.author_id != user.id {
        tracing::debug!(comment_id, user = %user.username, "Not the author; redirecting to post");
        return Ok(redirect(post_url(post_id)));
    }

    if let Err(errors) = form.validate() {
        return Ok(unprocessable(
            FormView::edit(form).with_errors(field_errors(&errors)),
        ));
    }

    if state
        .repo
        .update_comment(comment.id, user.id, form.text)
        .await?
        .is_some()
    {
        tracing::info!(post_id, comment_id, "Comment updated");
    }
    Ok(redirect(post_url(post_id)))
}

/// delete_comment_confirm
///
/// [Authenticated Route] The confirmation page for deleting a comment. A comment
/// of someone else is `NotFound`.
#[utoipa::path(
    get,
    path = "/posts/{id}/comment/{comment_id}/delete/",
    params(
        ("id" = i64, Path, description = "Post ID"),
        ("comment_id" = i64, Path, description = "Comment ID")
    ),
    responses(
        (status = 200, description = "Comment to be deleted", body = Comment),
        (status = 404, description = "Not found, or not the author")
    )
)]
pub async fn delete_comment_confirm(
    user: AuthUser,
    State(state): State<AppState>,
    Path((post_id, comment_id)): Path<(i64, i64)>,
) -> AppResult<Json<DeleteView>> {
    let comment = find_comment(&state, post_id, comment_id).await?;
    if comment.author_id != user.id {
        return Err(AppError::NotFound);
    }
    Ok(Json(DeleteView::Comment(comment)))
}

/// delete_comment
///
/// [Authenticated Route] Deletes the author's comment and redirects to the post.
#[utoipa::path(
    post,
    path = "/posts/{id}/comment/{comment_id}/delete/",
    params(
        ("id" = i64, Path, description = "Post ID"),
        ("comment_id" = i64, Path, description = "Comment ID")
    ),
    responses(
        (status = 303, description = "Deleted; redirect to the post"),
        (status = 404, description = "Not found, or not the author")
    )
)]
pub async fn delete_comment(
    user: AuthUser,
    State(state): State<AppState>,
    Path((post_id, comment_id)): Path<(i64, i64)>,
) -> AppResult<Response> {
    let comment = find_comment(&state, post_id, comment_id).await?;
    if comment.author_id != user.id {
        return Err(AppError::NotFound);
    }

    if state.repo.delete_comment(comment.id, user.id).await? {
        tracing::info!(post_id, comment_id, "Comment deleted");
    }
    Ok(redirect(post_url(post_id)))
}
