use axum::{
    Json,
    extract::{Path, Query, State},
    response::Response,
};
use validator::Validate;

use crate::{
    AppState,
    auth::{AuthUser, Viewer},
    errors::{AppError, AppResult, field_errors},
    models::{FormView, PostListView, Profile, ProfileForm},
    pagination::PageParams,
    query::{PostQuery, PostScope},
};

use super::{JsonBody, list_view, load_page, profile_url, redirect, unprocessable};

/// profile
///
/// [Public Route] A user's page. The owner sees all of their own posts, hidden and
/// scheduled ones included; everyone else sees only the publicly visible ones.
#[utoipa::path(
    get,
    path = "/profile/{username}/",
    params(("username" = String, Path, description = "Username"), PageParams),
    responses(
        (status = 200, description = "Profile with posts", body = PostListView),
        (status = 404, description = "Unknown user")
    )
)]
pub async fn profile(
    State(state): State<AppState>,
    viewer: Viewer,
    Path(username): Path<String>,
    Query(params): Query<PageParams>,
) -> AppResult<Json<PostListView>> {
    let user = state
        .repo
        .get_user_by_username(&username)
        .await?
        .ok_or(AppError::NotFound)?;

    let query = PostQuery::new(PostScope::Author(user.id)).restrict(!viewer.is(user.id));
    let page = load_page(&state, &query, params.page.as_deref()).await?;

    Ok(Json(PostListView {
        profile: Some(Profile::from(user)),
        ..list_view(page)
    }))
}

/// edit_profile_form
///
/// [Authenticated Route] The signed-in user's basic fields, ready for editing.
#[utoipa::path(
    get,
    path = "/profile/edit/",
    responses((status = 200, description = "Profile form", body = ProfileForm))
)]
pub async fn edit_profile_form(
    user: AuthUser,
    State(state): State<AppState>,
) -> AppResult<Json<FormView<ProfileForm>>> {
    let user = state
        .repo
        .get_user(user.id)
        .await?
        .ok_or(AppError::NotFound)?;
    Ok(Json(FormView::edit(ProfileForm::from(&user))))
}

/// edit_profile
///
/// [Authenticated Route] Saves the signed-in user's basic fields and redirects to
/// their profile.
#[utoipa::path(
    post,
    path = "/profile/edit/",
    request_body = ProfileForm,
    responses(
        (status = 303, description = "Saved; redirect to the profile"),
        (status = 422, description = "Form re-rendered with errors", body = ProfileForm)
    )
)]
pub async fn edit_profile(
    user: AuthUser,
    State(state): State<AppState>,
    JsonBody(form): JsonBody<ProfileForm>,
) -> AppResult<Response> {
    if let Err(errors) = form.validate() {
        return Ok(unprocessable(
            FormView::edit(form).with_errors(field_errors(&errors)),
        ));
    }

    let updated = state
        .repo
        .update_profile(user.id, form)
        .await?
        .ok_or(AppError::NotFound)?;

    tracing::info!(username = %updated.username, "Profile updated");
    Ok(redirect(profile_url(&updated.username)))
}
