use crate::{
    errors::AppResult,
    models::{Category, Comment, Location, Post, PostForm, PostSummary, ProfileForm, User},
    query::{self, PostQuery},
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use std::sync::Arc;
use uuid::Uuid;

/// Repository Trait
///
/// The persistence contract the handlers are written against. Ownership checks for
/// writes live in the queries themselves (`WHERE ... AND author_id = $n`), so a
/// non-owner call affects nothing and reports `None` / `false`.
#[async_trait]
pub trait Repository: Send + Sync {
    // --- Users ---
    async fn get_user(&self, id: Uuid) -> AppResult<Option<User>>;
    async fn get_user_by_username(&self, username: &str) -> AppResult<Option<User>>;
    async fn update_profile(&self, id: Uuid, form: ProfileForm) -> AppResult<Option<User>>;

    // --- Categories & Locations ---
    async fn get_published_category(&self, slug: &str) -> AppResult<Option<Category>>;
    async fn get_category(&self, id: i64) -> AppResult<Option<Category>>;
    async fn get_location(&self, id: i64) -> AppResult<Option<Location>>;

    // --- Posts ---
    async fn count_posts(&self, query: &PostQuery, now: DateTime<Utc>) -> AppResult<i64>;
    async fn list_posts(
        &self,
        query: &PostQuery,
        now: DateTime<Utc>,
        limit: i64,
        offset: i64,
    ) -> AppResult<Vec<PostSummary>>;
    // Unfiltered; callers run the result through `policy::authorize_view`.
    async fn get_post(&self, id: i64) -> AppResult<Option<PostSummary>>;
    async fn create_post(
        &self,
        author_id: Uuid,
        form: PostForm,
        pub_date: DateTime<Utc>,
    ) -> AppResult<Post>;
    // Owner-only. A `None` pub_date or image keeps the stored value.
    async fn update_post(&self, id: i64, author_id: Uuid, form: PostForm)
    -> AppResult<Option<Post>>;
    // Owner-only. Comments go with the post (ON DELETE CASCADE).
    async fn delete_post(&self, id: i64, author_id: Uuid) -> AppResult<bool>;

    // --- Comments ---
    async fn get_published_comments(&self, post_id: i64) -> AppResult<Vec<Comment>>;
    // Scoped to its post: a comment of another post is `None`.
    async fn get_comment(&self, post_id: i64, comment_id: i64) -> AppResult<Option<Comment>>;
    async fn add_comment(&self, post_id: i64, author_id: Uuid, text: String)
    -> AppResult<Comment>;
    async fn update_comment(
        &self,
        comment_id: i64,
        author_id: Uuid,
        text: String,
    ) -> AppResult<Option<Comment>>;
    async fn delete_comment(&self, comment_id: i64, author_id: Uuid) -> AppResult<bool>;
}

/// RepositoryState
///
/// The concrete type used to share the persistence layer across the application state.
pub type RepositoryState = Arc<dyn Repository>;

const USER_COLUMNS: &str = "id, username, first_name, last_name, email, created_at";
const POST_RETURNING: &str = "id, title, text, image, pub_date, location_id, category_id, author_id, is_published, created_at";

/// PostgresRepository
///
/// The `Repository` backed by PostgreSQL.
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Repository for PostgresRepository {
    async fn get_user(&self, id: Uuid) -> AppResult<Option<User>> {
        let query = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        let user = sqlx::query_as::<_, User>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn get_user_by_username(&self, username: &str) -> AppResult<Option<User>> {
        let query = format!("SELECT {USER_COLUMNS} FROM users WHERE username = $1");
        let user = sqlx::query_as::<_, User>(&query)
            .bind(username)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn update_profile(&self, id: Uuid, form: ProfileForm) -> AppResult<Option<User>> {
        let query = format!(
            "UPDATE users SET first_name = $2, last_name = $3, email = $4 WHERE id = $1 RETURNING {USER_COLUMNS}"
        );
        let user = sqlx::query_as::<_, User>(&query)
            .bind(id)
            .bind(form.first_name)
            .bind(form.last_name)
            .bind(form.email)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn get_published_category(&self, slug: &str) -> AppResult<Option<Category>> {
        let category = sqlx::query_as::<_, Category>(
            r#"SELECT id, title, description, slug, is_published, created_at
               FROM categories
               WHERE slug = $1 AND is_published = true"#,
        )
        .bind(slug)
        .fetch_optional(&self.pool)
        .await?;
        Ok(category)
    }

    async fn get_category(&self, id: i64) -> AppResult<Option<Category>> {
        let category = sqlx::query_as::<_, Category>(
            "SELECT id, title, description, slug, is_published, created_at FROM categories WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(category)
    }

    async fn get_location(&self, id: i64) -> AppResult<Option<Location>> {
        let location = sqlx::query_as::<_, Location>(
            "SELECT id, name, is_published, created_at FROM locations WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(location)
    }

    /// count_posts
    ///
    /// Runs the composer's count query; the handler needs it to resolve the page
    /// number before fetching rows.
    async fn count_posts(&self, query: &PostQuery, now: DateTime<Utc>) -> AppResult<i64> {
        let mut builder = query.count(now);
        let total = builder
            .build_query_scalar::<i64>()
            .fetch_one(&self.pool)
            .await?;
        Ok(total)
    }

    async fn list_posts(
        &self,
        query: &PostQuery,
        now: DateTime<Utc>,
        limit: i64,
        offset: i64,
    ) -> AppResult<Vec<PostSummary>> {
        let mut builder = query.select(now, limit, offset);
        let posts = builder
            .build_query_as::<PostSummary>()
            .fetch_all(&self.pool)
            .await?;
        Ok(posts)
    }

    async fn get_post(&self, id: i64) -> AppResult<Option<PostSummary>> {
        let mut builder = query::post_by_id(id);
        let post = builder
            .build_query_as::<PostSummary>()
            .fetch_optional(&self.pool)
            .await?;
        Ok(post)
    }

    async fn create_post(
        &self,
        author_id: Uuid,
        form: PostForm,
        pub_date: DateTime<Utc>,
    ) -> AppResult<Post> {
        let query = format!(
            r#"INSERT INTO posts (title, text, image, pub_date, location_id, category_id, author_id)
               VALUES ($1, $2, $3, $4, $5, $6, $7)
               RETURNING {POST_RETURNING}"#
        );
        let post = sqlx::query_as::<_, Post>(&query)
            .bind(form.title)
            .bind(form.text)
            .bind(form.image)
            .bind(pub_date)
            .bind(form.location_id)
            .bind(form.category_id)
            .bind(author_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(post)
    }

    /// update_post
    ///
    /// Replaces the editable fields. `COALESCE` keeps the stored publish time and
    /// image when the form leaves them out.
    async fn update_post(
        &self,
        id: i64,
        author_id: Uuid,
        form: PostForm,
    ) -> AppResult<Option<Post>> {
        let query = format!(
            r#"UPDATE posts
               SET title = $3,
                   text = $4,
                   pub_date = COALESCE($5, pub_date),
                   category_id = $6,
                   location_id = $7,
                   image = COALESCE($8, image)
               WHERE id = $1 AND author_id = $2
               RETURNING {POST_RETURNING}"#
        );
        let post = sqlx::query_as::<_, Post>(&query)
            .bind(id)
            .bind(author_id)
            .bind(form.title)
            .bind(form.text)
            .bind(form.pub_date)
            .bind(form.category_id)
            .bind(form.location_id)
            .bind(form.image)
            .fetch_optional(&self.pool)
            .await?;
        Ok(post)
    }

    async fn delete_post(&self, id: i64, author_id: Uuid) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM posts WHERE id = $1 AND author_id = $2")
            .bind(id)
            .bind(author_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn get_published_comments(&self, post_id: i64) -> AppResult<Vec<Comment>> {
        let comments = sqlx::query_as::<_, Comment>(
            r#"
            SELECT c.id, c.text, c.post_id, c.author_id, c.is_published, c.created_at,
                   u.username AS author_username
            FROM comments c
            JOIN users u ON u.id = c.author_id
            WHERE c.post_id = $1 AND c.is_published = true
            ORDER BY c.created_at ASC, c.id ASC
            "#,
        )
        .bind(post_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(comments)
    }

    async fn get_comment(&self, post_id: i64, comment_id: i64) -> AppResult<Option<Comment>> {
        let comment = sqlx::query_as::<_, Comment>(
            r#"
            SELECT c.id, c.text, c.post_id, c.author_id, c.is_published, c.created_at,
                   u.username AS author_username
            FROM comments c
            JOIN users u ON u.id = c.author_id
            WHERE c.id = $1 AND c.post_id = $2
            "#,
        )
        .bind(comment_id)
        .bind(post_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(comment)
    }

    /// add_comment
    ///
    /// Inserts and joins the author's username in one statement through a CTE.
    async fn add_comment(
        &self,
        post_id: i64,
        author_id: Uuid,
        text: String,
    ) -> AppResult<Comment> {
        let comment = sqlx::query_as::<_, Comment>(
            r#"
            WITH inserted AS (
                INSERT INTO comments (post_id, author_id, text) VALUES ($1, $2, $3)
                RETURNING id, text, post_id, author_id, is_published, created_at
            )
            SELECT i.id, i.text, i.post_id, i.author_id, i.is_published, i.created_at,
                   u.username AS author_username
            FROM inserted i JOIN users u ON u.id = i.author_id
            "#,
        )
        .bind(post_id)
        .bind(author_id)
        .bind(text)
        .fetch_one(&self.pool)
        .await?;
        Ok(comment)
    }

    async fn update_comment(
        &self,
        comment_id: i64,
        author_id: Uuid,
        text: String,
    ) -> AppResult<Option<Comment>> {
        let comment = sqlx::query_as::<_, Comment>(
            r#"
            WITH updated AS (
                UPDATE comments SET text = $3 WHERE id = $1 AND author_id = $2
                RETURNING id, text, post_id, author_id, is_published, created_at
            )
            SELECT d.id, d.text, d.post_id, d.author_id, d.is_published, d.created_at,
                   u.username AS author_username
            FROM updated d JOIN users u ON u.id = d.author_id
            "#,
        )
        .bind(comment_id)
        .bind(author_id)
        .bind(text)
        .fetch_optional(&self.pool)
        .await?;
        Ok(comment)
    }

    async fn delete_comment(&self, comment_id: i64, author_id: Uuid) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM comments WHERE id = $1 AND author_id = $2")
            .bind(comment_id)
            .bind(author_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
