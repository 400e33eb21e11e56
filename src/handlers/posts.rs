use std::collections::BTreeMap;

use axum::{
    Json,
    extract::{Path, State},
    response::{IntoResponse, Response},
};
use validator::{Validate, ValidationError, ValidationErrors};

use crate::{
    AppState,
    auth::{AuthUser, Viewer},
    errors::{AppError, AppResult, field_errors},
    models::{CommentForm, DeleteView, FormView, PostDetailView, PostForm, PostSummary},
    storage::POST_IMAGES_PREFIX,
};

use super::{
    JsonBody, post_url, profile_url, redirect, unprocessable, visible_post, with_image_url,
};

fn field_error(code: &'static str, message: &'static str) -> ValidationError {
    let mut error = ValidationError::new(code);
    error.message = Some(message.into());
    error
}

/// check_post_form
///
/// Field validation plus the checks that need the database: the referenced
/// category and location must exist, and an image must be a key this service
/// handed out.
async fn check_post_form(
    state: &AppState,
    form: &PostForm,
) -> AppResult<Option<BTreeMap<String, Vec<String>>>> {
    let mut errors = form.validate().err().unwrap_or_else(ValidationErrors::new);

    if let Some(category_id) = form.category_id {
        if state.repo.get_category(category_id).await?.is_none() {
            errors.add(
                "category_id",
                field_error("does_not_exist", "Select an existing category."),
            );
        }
    }
    if let Some(location_id) = form.location_id {
        if state.repo.get_location(location_id).await?.is_none() {
            errors.add(
                "location_id",
                field_error("does_not_exist", "Select an existing location."),
            );
        }
    }
    if let Some(image) = form.image.as_deref() {
        if !image.starts_with(POST_IMAGES_PREFIX) {
            errors.add(
                "image",
                field_error("invalid_key", "Upload the image before attaching it."),
            );
        }
    }

    if errors.errors().is_empty() {
        Ok(None)
    } else {
        Ok(Some(field_errors(&errors)))
    }
}

/// The post for an owner-only page. A missing post is `NotFound`; a post of
/// someone else sends the user back to its detail page.
async fn owned_post(
    state: &AppState,
    user: &AuthUser,
    post_id: i64,
) -> AppResult<Result<PostSummary, Response>> {
    let post = state
        .repo
        .get_post(post_id)
        .await?
        .ok_or(AppError::NotFound)?;

    if post.author_id != user.id {
        tracing::debug!(post_id, user = %user.username, "Not the author; redirecting to detail");
        return Ok(Err(redirect(post_url(post_id))));
    }
    Ok(Ok(with_image_url(state, post)))
}

/// post_detail
///
/// [Public Route] A post with its published comments. Hidden and scheduled posts
/// are `NotFound` for everyone but their author.
#[utoipa::path(
    get,
    path = "/posts/{id}/",
    params(("id" = i64, Path, description = "Post ID")),
    responses(
        (status = 200, description = "Post detail", body = PostDetailView),
        (status = 404, description = "Missing or not visible to the viewer")
    )
)]
pub async fn post_detail(
    State(state): State<AppState>,
    viewer: Viewer,
    Path(post_id): Path<i64>,
) -> AppResult<Json<PostDetailView>> {
    let post = visible_post(&state, viewer.id(), post_id).await?;
    let comments = state.repo.get_published_comments(post.id).await?;

    Ok(Json(PostDetailView {
        post,
        comments,
        form: CommentForm::default(),
        errors: BTreeMap::new(),
    }))
}

/// comment_from_detail
///
/// [Authenticated Route] The comment form embedded in the detail page. An invalid
/// comment re-renders the detail page with the errors.
#[utoipa::path(
    post,
    path = "/posts/{id}/",
    params(("id" = i64, Path, description = "Post ID")),
    request_body = CommentForm,
    responses(
        (status = 303, description = "Comment added; redirect to the post"),
        (status = 404, description = "Missing or not visible to the user"),
        (status = 422, description = "Detail page with form errors", body = PostDetailView)
    )
)]
pub async fn comment_from_detail(
    user: AuthUser,
    State(state): State<AppState>,
    Path(post_id): Path<i64>,
    JsonBody(form): JsonBody<CommentForm>,
) -> AppResult<Response> {
    let post = visible_post(&state, Some(user.id), post_id).await?;

    if let Err(errors) = form.validate() {
        let comments = state.repo.get_published_comments(post.id).await?;
        return Ok(unprocessable(PostDetailView {
            post,
            comments,
            form,
            errors: field_errors(&errors),
        }));
    }

    let comment = state.repo.add_comment(post.id, user.id, form.text).await?;
    tracing::info!(post_id = post.id, comment_id = comment.id, "Comment added");
    Ok(redirect(post_url(post.id)))
}

/// create_post_form
///
/// [Authenticated Route] An empty post form.
#[utoipa::path(
    get,
    path = "/posts/create/",
    responses((status = 200, description = "Blank post form", body = PostForm))
)]
pub async fn create_post_form(_user: AuthUser) -> Json<FormView<PostForm>> {
    Json(FormView::blank(PostForm::default()))
}

/// create_post
///
/// [Authenticated Route] Creates a post authored by the signed-in user and
/// redirects to their profile. Without a `pub_date` the post is published now.
#[utoipa::path(
    post,
    path = "/posts/create/",
    request_body = PostForm,
    responses(
        (status = 303, description = "Created; redirect to the author's profile"),
        (status = 422, description = "Form re-rendered with errors", body = PostForm)
    )
)]
pub async fn create_post(
    user: AuthUser,
    State(state): State<AppState>,
    JsonBody(form): JsonBody<PostForm>,
) -> AppResult<Response> {
    if let Some(errors) = check_post_form(&state, &form).await? {
        return Ok(unprocessable(FormView::blank(form).with_errors(errors)));
    }

    let pub_date = form.pub_date.unwrap_or_else(|| state.clock.now());
    let post = state.repo.create_post(user.id, form, pub_date).await?;

    tracing::info!(post_id = post.id, author = %user.username, "Post created");
    Ok(redirect(profile_url(&user.username)))
}

/// edit_post_form
///
/// [Authenticated Route] The author's post, prefilled for editing.
#[utoipa::path(
    get,
    path = "/posts/{id}/edit/",
    params(("id" = i64, Path, description = "Post ID")),
    responses(
        (status = 200, description = "Prefilled post form", body = PostForm),
        (status = 303, description = "Not the author; redirect to the post"),
        (status = 404, description = "Post not found")
    )
)]
pub async fn edit_post_form(
    user: AuthUser,
    State(state): State<AppState>,
    Path(post_id): Path<i64>,
) -> AppResult<Response> {
    let post = match owned_post(&state, &user, post_id).await? {
        Ok(post) => post,
        Err(response) => return Ok(response),
    };
    Ok(Json(FormView::edit(PostForm::from(&post))).into_response())
}

/// edit_post
///
/// [Authenticated Route] Saves the author's changes and redirects to the post.
/// Anyone else is redirected to the post with nothing changed.
#[utoipa::path(
    post,
    path = "/posts/{id}/edit/",
    params(("id" = i64, Path, description = "Post ID")),
    request_body = PostForm,
    responses(
        (status = 303, description = "Redirect to the post"),
        (status = 404, description = "Post not found"),
        (status = 422, description = "Form re-rendered with errors", body = PostForm)
    )
)]
pub async fn edit_post(
    user: AuthUser,
    State(state): State<AppState>,
    Path(post_id): Path<i64>,
    JsonBody(form): JsonBody<PostForm>,
) -> AppResult<Response> {
    if let Err(response) = owned_post(&state, &user, post_id).await? {
        return Ok(response);
    }

    if let Some(errors) = check_post_form(&state, &form).await? {
        return Ok(unprocessable(FormView::edit(form).with_errors(errors)));
    }

    if state.repo.update_post(post_id, user.id, form).await?.is_some() {
        tracing::info!(post_id, "Post updated");
    }
    Ok(redirect(post_url(post_id)))
}

/// delete_post_confirm
///
/// [Authenticated Route] The confirmation page for deleting a post.
#[utoipa::path(
    get,
    path = "/posts/{id}/delete/",
    params(("id" = i64, Path, description = "Post ID")),
    responses(
        (status = 200, description = "Post to be deleted", body = PostSummary),
        (status = 303, description = "Not the author; redirect to the post"),
        (status = 404, description = "Post not found")
    )
)]
pub async fn delete_post_confirm(
    user: AuthUser,
    State(state): State<AppState>,
    Path(post_id): Path<i64>,
) -> AppResult<Response> {
    match owned_post(&state, &user, post_id).await? {
        Ok(post) => Ok(Json(DeleteView::Post(post)).into_response()),
        Err(response) => Ok(response),
    }
}

/// delete_post
///
/// [Authenticated Route] Deletes the author's post along with its comments and
/// redirects to their profile.
#[utoipa::path(
    post,
    path = "/posts/{id}/delete/",
    params(("id" = i64, Path, description = "Post ID")),
    responses(
        (status = 303, description = "Deleted, or not the author"),
        (status = 404, description = "Post not found")
    )
)]
pub async fn delete_post(
    user: AuthUser,
    State(state): State<AppState>,
    Path(post_id): Path<i64>,
) -> AppResult<Response> {
    if let Err(response) = owned_post(&state, &user, post_id).await? {
        return Ok(response);
    }

    if state.repo.delete_post(post_id, user.id).await? {
        tracing::info!(post_id, author = %user.username, "Post deleted");
    }
    Ok(redirect(profile_url(&user.username)))
}
