//! Who may see which post.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
    errors::{AppError, AppResult},
    models::{Comment, PostSummary},
};

/// A post is publicly visible when it is published, its category (if any) is
/// published, and its publish time has been reached.
pub fn is_publicly_visible(post: &PostSummary, now: DateTime<Utc>) -> bool {
    post.is_published && post.category_is_published.unwrap_or(true) && post.pub_date <= now
}

/// Comments only carry their own flag.
pub fn is_comment_visible(comment: &Comment) -> bool {
    comment.is_published
}

/// authorize_view
///
/// Resolves a post lookup for a viewer: the post is returned when it is publicly
/// visible or the viewer is its author. Everything else, a missing post included,
/// is `NotFound`.
pub fn authorize_view(
    post: Option<PostSummary>,
    viewer_id: Option<Uuid>,
    now: DateTime<Utc>,
) -> AppResult<PostSummary> {
    let post = post.ok_or(AppError::NotFound)?;
    if is_publicly_visible(&post, now) || viewer_id == Some(post.author_id) {
        Ok(post)
    } else {
        Err(AppError::NotFound)
    }
}
