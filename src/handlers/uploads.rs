use axum::{Json, extract::State};
use validator::{ValidationError, ValidationErrors};

use crate::{
    AppState,
    auth::AuthUser,
    errors::{AppError, AppResult},
    models::{PresignedUrlRequest, PresignedUrlResponse},
    storage::image_key_for,
};

use super::JsonBody;

/// get_presigned_url
///
/// [Authenticated Route] A short-lived URL the client PUTs a post image to. The
/// returned `resource_key` is what `PostForm.image` expects. Only image content
/// types are accepted.
#[utoipa::path(
    post,
    path = "/upload/presigned",
    request_body = PresignedUrlRequest,
    responses(
        (status = 200, description = "URL", body = PresignedUrlResponse),
        (status = 422, description = "Not an image content type"),
        (status = 500, description = "Storage unavailable")
    )
)]
pub async fn get_presigned_url(
    user: AuthUser,
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<PresignedUrlRequest>,
) -> AppResult<Json<PresignedUrlResponse>> {
    if !payload.file_type.starts_with("image/") {
        let mut errors = ValidationErrors::new();
        let mut error = ValidationError::new("not_an_image");
        error.message = Some("Only image uploads are accepted.".into());
        errors.add("file_type", error);
        return Err(AppError::Validation(errors));
    }

    let object_key = image_key_for(&payload.filename);
    let upload_url = state
        .storage
        .get_presigned_upload_url(&object_key, &payload.file_type)
        .await?;

    tracing::debug!(user = %user.username, key = %object_key, "Issued upload URL");
    Ok(Json(PresignedUrlResponse {
        upload_url,
        resource_key: object_key,
    }))
}
