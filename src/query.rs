use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use sqlx::{Postgres, QueryBuilder};
use uuid::Uuid;

use crate::{models::PostSummary, policy};

/// Columns of `PostSummary`, fetched with the author, category and location in a
/// single round trip.
const POST_COLUMNS: &str = r#"
    SELECT p.id, p.title, p.text, p.image, p.pub_date, p.is_published, p.created_at,
           p.author_id, u.username AS author_username,
           p.category_id, c.title AS category_title, c.slug AS category_slug,
           c.is_published AS category_is_published,
           p.location_id, l.name AS location_name, l.is_published AS location_is_published
"#;

const POST_JOINS: &str = r#"
    FROM posts p
    JOIN users u ON u.id = p.author_id
    LEFT JOIN categories c ON c.id = p.category_id
    LEFT JOIN locations l ON l.id = p.location_id
"#;

const COMMENT_COUNT: &str =
    ", (SELECT COUNT(*) FROM comments cm WHERE cm.post_id = p.id) AS comment_count";

const NO_COMMENT_COUNT: &str = ", NULL::BIGINT AS comment_count";

/// The base collection a listing starts from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostScope {
    All,
    Category(i64),
    Author(Uuid),
}

impl PostScope {
    fn contains(&self, post: &PostSummary) -> bool {
        match self {
            PostScope::All => true,
            PostScope::Category(id) => post.category_id == Some(*id),
            PostScope::Author(id) => post.author_id == *id,
        }
    }
}

/// PostQuery
///
/// Composes a post listing over a scope.
///
/// Restricted (the default): only publicly visible posts, each annotated with its
/// total comment count, newest publish time first.
/// Unrestricted: the scope as-is, in the default post order (newest publish time,
/// then title) and without annotation. Used when an author looks at their own profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PostQuery {
    scope: PostScope,
    restrict: bool,
}

impl PostQuery {
    pub fn new(scope: PostScope) -> Self {
        Self {
            scope,
            restrict: true,
        }
    }

    pub fn restrict(mut self, restrict: bool) -> Self {
        self.restrict = restrict;
        self
    }

    pub fn is_restricted(&self) -> bool {
        self.restrict
    }

    /// The page query: `limit` rows starting at `offset`.
    pub fn select(
        &self,
        now: DateTime<Utc>,
        limit: i64,
        offset: i64,
    ) -> QueryBuilder<'static, Postgres> {
        let mut builder = QueryBuilder::new(POST_COLUMNS);
        builder.push(if self.restrict {
            COMMENT_COUNT
        } else {
            NO_COMMENT_COUNT
        });
        builder.push(POST_JOINS);
        self.push_filters(&mut builder, now);
        builder.push(if self.restrict {
            " ORDER BY p.pub_date DESC, p.id DESC"
        } else {
            " ORDER BY p.pub_date DESC, p.title ASC"
        });
        builder.push(" LIMIT ");
        builder.push_bind(limit);
        builder.push(" OFFSET ");
        builder.push_bind(offset);
        builder
    }

    /// The total number of rows `select` pages over.
    pub fn count(&self, now: DateTime<Utc>) -> QueryBuilder<'static, Postgres> {
        let mut builder = QueryBuilder::new("SELECT COUNT(*)");
        builder.push(POST_JOINS);
        self.push_filters(&mut builder, now);
        builder
    }

    fn push_filters(&self, builder: &mut QueryBuilder<'static, Postgres>, now: DateTime<Utc>) {
        builder.push(" WHERE TRUE");
        match self.scope {
            PostScope::All => {}
            PostScope::Category(id) => {
                builder.push(" AND p.category_id = ");
                builder.push_bind(id);
            }
            PostScope::Author(id) => {
                builder.push(" AND p.author_id = ");
                builder.push_bind(id);
            }
        }
        if self.restrict {
            builder.push(" AND p.is_published AND (c.id IS NULL OR c.is_published) AND p.pub_date <= ");
            builder.push_bind(now);
        }
    }

    /// Evaluates the same filter against an already loaded post.
    pub fn matches(&self, post: &PostSummary, now: DateTime<Utc>) -> bool {
        self.scope.contains(post) && (!self.restrict || policy::is_publicly_visible(post, now))
    }

    /// The ordering `select` applies.
    pub fn compare(&self, a: &PostSummary, b: &PostSummary) -> Ordering {
        let by_date = b.pub_date.cmp(&a.pub_date);
        if self.restrict {
            by_date.then_with(|| b.id.cmp(&a.id))
        } else {
            by_date.then_with(|| a.title.cmp(&b.title))
        }
    }
}

/// A single post by id, unfiltered. Visibility is decided afterwards by the policy.
pub fn post_by_id(id: i64) -> QueryBuilder<'static, Postgres> {
    let mut builder = QueryBuilder::new(POST_COLUMNS);
    builder.push(NO_COMMENT_COUNT);
    builder.push(POST_JOINS);
    builder.push(" WHERE p.id = ");
    builder.push_bind(id);
    builder
}
