use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use ts_rs::TS;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::{Validate, ValidateEmail, ValidationError};

use crate::pagination::PageMeta;

// --- Core Application Schemas (Mapped to Database) ---

/// User
///
/// A row of the `users` table. Accounts are provisioned by the external identity
/// provider; this service only reads them and lets the owner edit the basic fields.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
}

/// Profile
///
/// The public face of a `User`. The email address is never part of it.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct Profile {
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    #[ts(type = "string")]
    pub date_joined: DateTime<Utc>,
}

impl From<User> for Profile {
    fn from(user: User) -> Self {
        Self {
            username: user.username,
            first_name: user.first_name,
            last_name: user.last_name,
            date_joined: user.created_at,
        }
    }
}

/// Location
///
/// A place a post can be tagged with. Deleting it nulls `posts.location_id`.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct Location {
    pub id: i64,
    pub name: String,
    pub is_published: bool,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
}

/// Category
///
/// A thematic section addressed by its unique `slug`. Unpublishing a category hides
/// every post in it from everyone but the posts' authors.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct Category {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub slug: String,
    pub is_published: bool,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
}

/// Post
///
/// A raw row of the `posts` table, as returned by inserts and updates.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct Post {
    pub id: i64,
    pub title: String,
    pub text: String,
    // Storage key of the uploaded image, e.g. `post_images/<uuid>.jpg`.
    pub image: Option<String>,
    #[ts(type = "string")]
    pub pub_date: DateTime<Utc>,
    pub location_id: Option<i64>,
    pub category_id: Option<i64>,
    pub author_id: Uuid,
    pub is_published: bool,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
}

/// PostSummary
///
/// A post joined with its author, category and location in one row, which is what
/// both listings and the detail page need. Category and location columns are `None`
/// when the reference is absent.
///
/// `comment_count` is only filled in by restricted listings and counts every comment
/// of the post, published or not.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct PostSummary {
    pub id: i64,
    pub title: String,
    pub text: String,
    pub image: Option<String>,
    #[ts(type = "string")]
    pub pub_date: DateTime<Utc>,
    pub is_published: bool,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,

    pub author_id: Uuid,
    pub author_username: String,

    pub category_id: Option<i64>,
    pub category_title: Option<String>,
    pub category_slug: Option<String>,
    pub category_is_published: Option<bool>,

    pub location_id: Option<i64>,
    pub location_name: Option<String>,
    pub location_is_published: Option<bool>,

    #[sqlx(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment_count: Option<i64>,

    // Resolved from `image` by the storage layer, never stored.
    #[sqlx(skip)]
    #[serde(default)]
    pub image_url: Option<String>,
}

/// Comment
///
/// A row of the `comments` table, joined with the author's username.
/// Listed in ascending creation order.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct Comment {
    pub id: i64,
    pub text: String,
    pub post_id: i64,
    pub author_id: Uuid,
    pub is_published: bool,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[sqlx(default)]
    pub author_username: Option<String>,
}

// --- Forms (Input Schemas) ---

/// PostForm
///
/// Submitted to create or edit a post. `pub_date` may schedule the post in the
/// future; when omitted it defaults to "now" on create and stays unchanged on edit.
/// Missing JSON fields fall back to their defaults so that they surface as field
/// errors instead of a rejected body.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Validate, Default, PartialEq)]
#[serde(default)]
#[ts(export)]
pub struct PostForm {
    #[validate(length(min = 1, max = 256, message = "Title must be 1-256 characters."))]
    pub title: String,

    #[validate(length(min = 1, message = "Text is required."))]
    pub text: String,

    #[ts(type = "string | null")]
    pub pub_date: Option<DateTime<Utc>>,

    pub category_id: Option<i64>,

    pub location_id: Option<i64>,

    /// Storage key returned by `POST /upload/presigned`.
    #[validate(length(max = 255))]
    pub image: Option<String>,
}

impl From<&PostSummary> for PostForm {
    fn from(post: &PostSummary) -> Self {
        Self {
            title: post.title.clone(),
            text: post.text.clone(),
            pub_date: Some(post.pub_date),
            category_id: post.category_id,
            location_id: post.location_id,
            image: post.image.clone(),
        }
    }
}

/// CommentForm
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Validate, Default, PartialEq)]
#[serde(default)]
#[ts(export)]
pub struct CommentForm {
    #[validate(length(min = 1, message = "Comment text is required."))]
    pub text: String,
}

/// ProfileForm
///
/// The basic account fields an owner may edit. Username and credentials belong to
/// the identity provider.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Validate, Default, PartialEq)]
#[serde(default)]
#[ts(export)]
pub struct ProfileForm {
    #[validate(length(max = 150))]
    pub first_name: String,

    #[validate(length(max = 150))]
    pub last_name: String,

    /// Optional: blank clears it.
    #[validate(
        length(max = 254, message = "Ensure this value has at most 254 characters."),
        custom(function = "blank_or_email")
    )]
    pub email: String,
}

fn blank_or_email(email: &str) -> Result<(), ValidationError> {
    if email.is_empty() || email.validate_email() {
        return Ok(());
    }
    let mut error = ValidationError::new("email");
    error.message = Some("Enter a valid email address.".into());
    Err(error)
}

impl From<&User> for ProfileForm {
    fn from(user: &User) -> Self {
        Self {
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            email: user.email.clone(),
        }
    }
}

/// PresignedUrlRequest
///
/// Input payload for requesting a short-lived upload URL for a post image.
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema, TS, Default)]
#[ts(export)]
pub struct PresignedUrlRequest {
    #[schema(example = "sunset.jpg")]
    pub filename: String,
    #[schema(example = "image/jpeg")]
    pub file_type: String,
}

/// PresignedUrlResponse
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, TS, Default)]
#[ts(export)]
pub struct PresignedUrlResponse {
    /// The time-limited URL for the PUT request.
    pub upload_url: String,
    /// The object key to submit as `PostForm.image`.
    pub resource_key: String,
}

// --- Views (Output Schemas) ---

/// PostListView
///
/// One page of a post listing. `category` is set on category pages and `profile`
/// on profile pages.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct PostListView {
    pub posts: Vec<PostSummary>,
    pub page: PageMeta,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<Category>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile: Option<Profile>,
}

/// PostDetailView
///
/// A single post with its published comments and the comment form. After an
/// invalid comment submission the form carries the submitted text and `errors`
/// the field messages.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct PostDetailView {
    pub post: PostSummary,
    pub comments: Vec<Comment>,
    pub form: CommentForm,
    pub errors: BTreeMap<String, Vec<String>>,
}

/// FormView
///
/// A form ready to be rendered: blank for "create", prefilled for "edit", or
/// echoed back together with field errors after a failed submission.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct FormView<F> {
    pub form: F,
    pub errors: BTreeMap<String, Vec<String>>,
    pub is_edit: bool,
}

impl<F> FormView<F> {
    pub fn blank(form: F) -> Self {
        Self {
            form,
            errors: BTreeMap::new(),
            is_edit: false,
        }
    }

    pub fn edit(form: F) -> Self {
        Self {
            form,
            errors: BTreeMap::new(),
            is_edit: true,
        }
    }

    pub fn with_errors(mut self, errors: BTreeMap<String, Vec<String>>) -> Self {
        self.errors = errors;
        self
    }
}

/// DeleteView
///
/// Confirmation page shown before a post or comment is deleted.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(tag = "delete_type", content = "object", rename_all = "snake_case")]
#[ts(export)]
pub enum DeleteView {
    Post(PostSummary),
    Comment(Comment),
}
