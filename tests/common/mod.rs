//! Shared fixtures: an in-memory `Repository` that applies the same listing rules
//! as the SQL one, and helpers to drive the router.
#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::{
    Router,
    body::Body,
    http::{HeaderMap, Method, Request, StatusCode, header},
};
use blog_backend::{
    AppConfig, AppState, FixedClock, MockStorageService, create_router,
    errors::AppResult,
    models::{Category, Comment, Location, Post, PostForm, PostSummary, ProfileForm, User},
    policy::is_comment_visible,
    query::PostQuery,
    repository::Repository,
};
use chrono::{DateTime, Duration, TimeZone, Utc};
use serde_json::Value;
use tower::util::ServiceExt;
use uuid::Uuid;

/// The instant every test runs at.
pub fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap()
}

pub fn hours_ago(hours: i64) -> DateTime<Utc> {
    now() - Duration::hours(hours)
}

pub fn in_hours(hours: i64) -> DateTime<Utc> {
    now() + Duration::hours(hours)
}

#[derive(Default)]
struct Store {
    users: Vec<User>,
    locations: Vec<Location>,
    categories: Vec<Category>,
    posts: Vec<Post>,
    comments: Vec<Comment>,
    next_id: i64,
}

impl Store {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn username(&self, id: Uuid) -> Option<String> {
        self.users
            .iter()
            .find(|user| user.id == id)
            .map(|user| user.username.clone())
    }

    fn summarize(&self, post: &Post) -> PostSummary {
        let category = post
            .category_id
            .and_then(|id| self.categories.iter().find(|c| c.id == id));
        let location = post
            .location_id
            .and_then(|id| self.locations.iter().find(|l| l.id == id));

        PostSummary {
            id: post.id,
            title: post.title.clone(),
            text: post.text.clone(),
            image: post.image.clone(),
            pub_date: post.pub_date,
            is_published: post.is_published,
            created_at: post.created_at,
            author_id: post.author_id,
            author_username: self.username(post.author_id).unwrap_or_default(),
            category_id: category.map(|c| c.id),
            category_title: category.map(|c| c.title.clone()),
            category_slug: category.map(|c| c.slug.clone()),
            category_is_published: category.map(|c| c.is_published),
            location_id: location.map(|l| l.id),
            location_name: location.map(|l| l.name.clone()),
            location_is_published: location.map(|l| l.is_published),
            comment_count: None,
            image_url: None,
        }
    }

    fn with_username(&self, mut comment: Comment) -> Comment {
        comment.author_username = self.username(comment.author_id);
        comment
    }
}

/// InMemoryRepository
///
/// Listing filters and ordering come from `PostQuery::matches` and
/// `PostQuery::compare`, so the handlers see the same results they would get
/// from Postgres.
#[derive(Default)]
pub struct InMemoryRepository {
    store: Mutex<Store>,
}

/// What a seeded post looks like unless a test says otherwise: published an hour
/// ago, no category, no location.
pub struct PostSeed {
    pub title: String,
    pub author_id: Uuid,
    pub pub_date: DateTime<Utc>,
    pub is_published: bool,
    pub category_id: Option<i64>,
    pub location_id: Option<i64>,
    pub image: Option<String>,
}

impl PostSeed {
    pub fn new(title: &str, author_id: Uuid) -> Self {
        Self {
            title: title.to_string(),
            author_id,
            pub_date: hours_ago(1),
            is_published: true,
            category_id: None,
            location_id: None,
            image: None,
        }
    }
}

impl InMemoryRepository {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn add_user(&self, username: &str) -> User {
        self.add_user_with_email(username, &format!("{}@example.com", username))
    }

    pub fn add_user_with_email(&self, username: &str, email: &str) -> User {
        let user = User {
            id: Uuid::new_v4(),
            username: username.to_string(),
            first_name: String::new(),
            last_name: String::new(),
            email: email.to_string(),
            created_at: hours_ago(24 * 30),
        };
        self.store.lock().unwrap().users.push(user.clone());
        user
    }

    pub fn add_category(&self, slug: &str, is_published: bool) -> Category {
        let mut store = self.store.lock().unwrap();
        let category = Category {
            id: store.next_id(),
            title: format!("Category {}", slug),
            description: String::new(),
            slug: slug.to_string(),
            is_published,
            created_at: hours_ago(48),
        };
        store.categories.push(category.clone());
        category
    }

    pub fn add_location(&self, name: &str, is_published: bool) -> Location {
        let mut store = self.store.lock().unwrap();
        let location = Location {
            id: store.next_id(),
            name: name.to_string(),
            is_published,
            created_at: hours_ago(48),
        };
        store.locations.push(location.clone());
        location
    }

    pub fn add_post(&self, seed: PostSeed) -> Post {
        let mut store = self.store.lock().unwrap();
        let post = Post {
            id: store.next_id(),
            title: seed.title,
            text: "Some text".to_string(),
            image: seed.image,
            pub_date: seed.pub_date,
            location_id: seed.location_id,
            category_id: seed.category_id,
            author_id: seed.author_id,
            is_published: seed.is_published,
            created_at: hours_ago(2),
        };
        store.posts.push(post.clone());
        post
    }

    pub fn add_comment_row(
        &self,
        post_id: i64,
        author_id: Uuid,
        text: &str,
        is_published: bool,
    ) -> Comment {
        let mut store = self.store.lock().unwrap();
        let id = store.next_id();
        let comment = Comment {
            id,
            text: text.to_string(),
            post_id,
            author_id,
            is_published,
            created_at: hours_ago(1) + Duration::seconds(id),
            author_username: None,
        };
        store.comments.push(comment.clone());
        comment
    }

    pub fn post(&self, id: i64) -> Option<Post> {
        let store = self.store.lock().unwrap();
        store.posts.iter().find(|post| post.id == id).cloned()
    }

    pub fn posts(&self) -> Vec<Post> {
        self.store.lock().unwrap().posts.clone()
    }

    pub fn comments(&self) -> Vec<Comment> {
        self.store.lock().unwrap().comments.clone()
    }

    pub fn user(&self, id: Uuid) -> Option<User> {
        let store = self.store.lock().unwrap();
        store.users.iter().find(|user| user.id == id).cloned()
    }
}

#[async_trait]
impl Repository for InMemoryRepository {
    async fn get_user(&self, id: Uuid) -> AppResult<Option<User>> {
        Ok(self.user(id))
    }

    async fn get_user_by_username(&self, username: &str) -> AppResult<Option<User>> {
        let store = self.store.lock().unwrap();
        Ok(store.users.iter().find(|u| u.username == username).cloned())
    }

    async fn update_profile(&self, id: Uuid, form: ProfileForm) -> AppResult<Option<User>> {
        let mut store = self.store.lock().unwrap();
        Ok(store.users.iter_mut().find(|u| u.id == id).map(|user| {
            user.first_name = form.first_name;
            user.last_name = form.last_name;
            user.email = form.email;
            user.clone()
        }))
    }

    async fn get_published_category(&self, slug: &str) -> AppResult<Option<Category>> {
        let store = self.store.lock().unwrap();
        Ok(store
            .categories
            .iter()
            .find(|c| c.slug == slug && c.is_published)
            .cloned())
    }

    async fn get_category(&self, id: i64) -> AppResult<Option<Category>> {
        let store = self.store.lock().unwrap();
        Ok(store.categories.iter().find(|c| c.id == id).cloned())
    }

    async fn get_location(&self, id: i64) -> AppResult<Option<Location>> {
        let store = self.store.lock().unwrap();
        Ok(store.locations.iter().find(|l| l.id == id).cloned())
    }

    async fn count_posts(&self, query: &PostQuery, now: DateTime<Utc>) -> AppResult<i64> {
        let store = self.store.lock().unwrap();
        Ok(store
            .posts
            .iter()
            .map(|post| store.summarize(post))
            .filter(|summary| query.matches(summary, now))
            .count() as i64)
    }

    async fn list_posts(
        &self,
        query: &PostQuery,
        now: DateTime<Utc>,
        limit: i64,
        offset: i64,
    ) -> AppResult<Vec<PostSummary>> {
        let store = self.store.lock().unwrap();
        let mut posts: Vec<PostSummary> = store
            .posts
            .iter()
            .map(|post| store.summarize(post))
            .filter(|summary| query.matches(summary, now))
            .collect();
        posts.sort_by(|a, b| query.compare(a, b));

        Ok(posts
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .map(|mut summary| {
                if query.is_restricted() {
                    let count = store
                        .comments
                        .iter()
                        .filter(|c| c.post_id == summary.id)
                        .count();
                    summary.comment_count = Some(count as i64);
                }
                summary
            })
            .collect())
    }

    async fn get_post(&self, id: i64) -> AppResult<Option<PostSummary>> {
        let store = self.store.lock().unwrap();
        Ok(store
            .posts
            .iter()
            .find(|post| post.id == id)
            .map(|post| store.summarize(post)))
    }

    async fn create_post(
        &self,
        author_id: Uuid,
        form: PostForm,
        pub_date: DateTime<Utc>,
    ) -> AppResult<Post> {
        let mut store = self.store.lock().unwrap();
        let post = Post {
            id: store.next_id(),
            title: form.title,
            text: form.text,
            image: form.image,
            pub_date,
            location_id: form.location_id,
            category_id: form.category_id,
            author_id,
            is_published: true,
            created_at: now(),
        };
        store.posts.push(post.clone());
        Ok(post)
    }

    async fn update_post(
        &self,
        id: i64,
        author_id: Uuid,
        form: PostForm,
    ) -> AppResult<Option<Post>> {
        let mut store = self.store.lock().unwrap();
        Ok(store
            .posts
            .iter_mut()
            .find(|post| post.id == id && post.author_id == author_id)
            .map(|post| {
                post.title = form.title;
                post.text = form.text;
                post.category_id = form.category_id;
                post.location_id = form.location_id;
                if let Some(pub_date) = form.pub_date {
                    post.pub_date = pub_date;
                }
                if form.image.is_some() {
                    post.image = form.image;
                }
                post.clone()
            }))
    }

    async fn delete_post(&self, id: i64, author_id: Uuid) -> AppResult<bool> {
        let mut store = self.store.lock().unwrap();
        let before = store.posts.len();
        store
            .posts
            .retain(|post| !(post.id == id && post.author_id == author_id));
        let deleted = store.posts.len() < before;
        if deleted {
            store.comments.retain(|comment| comment.post_id != id);
        }
        Ok(deleted)
    }

    async fn get_published_comments(&self, post_id: i64) -> AppResult<Vec<Comment>> {
        let store = self.store.lock().unwrap();
        let mut comments: Vec<Comment> = store
            .comments
            .iter()
            .filter(|c| c.post_id == post_id && is_comment_visible(c))
            .cloned()
            .map(|c| store.with_username(c))
            .collect();
        comments.sort_by_key(|c| (c.created_at, c.id));
        Ok(comments)
    }

    async fn get_comment(&self, post_id: i64, comment_id: i64) -> AppResult<Option<Comment>> {
        let store = self.store.lock().unwrap();
        Ok(store
            .comments
            .iter()
            .find(|c| c.id == comment_id && c.post_id == post_id)
            .cloned()
            .map(|c| store.with_username(c)))
    }

    async fn add_comment(&self, post_id: i64, author_id: Uuid, text: String) -> AppResult<Comment> {
        let mut store = self.store.lock().unwrap();
        let comment = Comment {
            id: store.next_id(),
            text,
            post_id,
            author_id,
            is_published: true,
            created_at: now(),
            author_username: None,
        };
        store.comments.push(comment.clone());
        Ok(store.with_username(comment))
    }

    async fn update_comment(
        &self,
        comment_id: i64,
        author_id: Uuid,
        text: String,
    ) -> AppResult<Option<Comment>> {
        let mut store = self.store.lock().unwrap();
        let updated = store
            .comments
            .iter_mut()
            .find(|c| c.id == comment_id && c.author_id == author_id)
            .map(|comment| {
                comment.text = text;
                comment.clone()
            });
        Ok(updated.map(|c| store.with_username(c)))
    }

    async fn delete_comment(&self, comment_id: i64, author_id: Uuid) -> AppResult<bool> {
        let mut store = self.store.lock().unwrap();
        let before = store.comments.len();
        store
            .comments
            .retain(|c| !(c.id == comment_id && c.author_id == author_id));
        Ok(store.comments.len() < before)
    }
}

pub fn test_state(repo: Arc<InMemoryRepository>) -> AppState {
    AppState {
        repo,
        storage: Arc::new(MockStorageService::new()),
        clock: Arc::new(FixedClock::new(now())),
        config: AppConfig::default(),
    }
}

pub fn test_app(repo: Arc<InMemoryRepository>) -> Router {
    create_router(test_state(repo))
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

impl TestResponse {
    pub fn location(&self) -> Option<&str> {
        self.headers
            .get(header::LOCATION)
            .and_then(|value| value.to_str().ok())
    }
}

/// Sends one request through the router. `user` goes through the local
/// `x-user-id` bypass; `body` is sent as JSON.
pub async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    user: Option<Uuid>,
    body: Option<Value>,
) -> TestResponse {
    let mut request = Request::builder().method(method).uri(uri);
    if let Some(user_id) = user {
        request = request.header("x-user-id", user_id.to_string());
    }
    let request = match body {
        Some(json) => request
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(serde_json::to_vec(&json).unwrap()))
            .unwrap(),
        None => request.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);

    TestResponse {
        status,
        headers,
        body,
    }
}

pub async fn get(app: &Router, uri: &str, user: Option<Uuid>) -> TestResponse {
    send(app, Method::GET, uri, user, None).await
}

pub async fn post_json(app: &Router, uri: &str, user: Option<Uuid>, body: Value) -> TestResponse {
    send(app, Method::POST, uri, user, Some(body)).await
}

/// Titles of the posts in a listing response, in order.
pub fn titles(body: &Value) -> Vec<String> {
    body["posts"]
        .as_array()
        .map(|posts| {
            posts
                .iter()
                .filter_map(|p| p["title"].as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}
