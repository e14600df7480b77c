/// PostgreSQL tree store
///
/// Comments are rows pointing at their post and parent. Nested trees are
/// rebuilt from the rows in creation order. Paginated reads hand the window to
/// PostgreSQL, ordered level by level and by creation within a level; this is
/// not the sibling-list order of the in-memory store.
use super::arena::CommentArena;
use super::CommentStore;
use crate::error::{AppError, Result};
use crate::models::{Comment, Post};
use async_trait::async_trait;
use db_pool::{create_pool, DbConfig};
use sqlx::PgPool;
use std::collections::HashMap;
use tracing::{debug, info};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS posts (
    id TEXT PRIMARY KEY,
    title TEXT NOT NULL,
    body TEXT NOT NULL,
    allow_comments BOOLEAN NOT NULL,
    seq BIGSERIAL NOT NULL
);

CREATE TABLE IF NOT EXISTS comments (
    id TEXT PRIMARY KEY,
    post_id TEXT NOT NULL REFERENCES posts (id),
    body VARCHAR(2000) NOT NULL,
    parent_id TEXT REFERENCES comments (id),
    seq BIGSERIAL NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_comments_post_seq ON comments (post_id, seq);
CREATE INDEX IF NOT EXISTS idx_comments_parent ON comments (parent_id);
"#;

#[derive(sqlx::FromRow)]
struct PostRow {
    id: String,
    title: String,
    body: String,
    allow_comments: bool,
}

impl PostRow {
    fn into_post(self, comments: Vec<Comment>) -> Post {
        Post {
            id: self.id,
            title: self.title,
            body: self.body,
            allow_comments: self.allow_comments,
            comments,
        }
    }
}

#[derive(sqlx::FromRow)]
struct CommentRow {
    id: String,
    post_id: String,
    body: String,
    parent_id: Option<String>,
}

impl From<CommentRow> for Comment {
    fn from(row: CommentRow) -> Self {
        Comment {
            id: row.id,
            post_id: row.post_id,
            body: row.body,
            parent_id: row.parent_id,
            children: Vec::new(),
        }
    }
}

pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connect with bounded retries and make sure the schema exists
    pub async fn connect(config: DbConfig) -> Result<Self> {
        config.log_config();
        let pool = create_pool(config)
            .await
            .map_err(|e| AppError::DatabaseError(format!("error to create postgres db: {}", e)))?;

        let store = Self::new(pool);
        store.ensure_schema().await?;
        Ok(store)
    }

    pub async fn ensure_schema(&self) -> Result<()> {
        sqlx::raw_sql(SCHEMA)
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(format!("error to create tables: {}", e)))?;

        info!("comment store schema ready");
        Ok(())
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Every comment of a post, parents before their replies
    async fn post_comments(&self, post_id: &str) -> Result<Vec<Comment>> {
        let rows = sqlx::query_as::<_, CommentRow>(
            r#"
            SELECT id, post_id, body, parent_id
            FROM comments
            WHERE post_id = $1
            ORDER BY seq
            "#,
        )
        .bind(post_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Comment::from).collect())
    }

    async fn window_ids(&self, post_id: &str, limit: usize, offset: usize) -> Result<Vec<String>> {
        let ids = sqlx::query_scalar::<_, String>(
            r#"
            WITH RECURSIVE comment_tree AS (
                SELECT id, seq, 0 AS depth
                FROM comments
                WHERE post_id = $1 AND parent_id IS NULL

                UNION ALL

                SELECT c.id, c.seq, ct.depth + 1
                FROM comments c
                INNER JOIN comment_tree ct ON c.parent_id = ct.id
            )
            SELECT id FROM comment_tree
            ORDER BY depth, seq
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(post_id)
        .bind(sql_bound(limit))
        .bind(sql_bound(offset))
        .fetch_all(&self.pool)
        .await?;

        Ok(ids)
    }

    async fn exists(&self, query: &'static str, id: &str) -> Result<bool> {
        let found = sqlx::query_scalar::<_, bool>(query)
            .bind(id)
            .fetch_one(&self.pool)
            .await?;
        Ok(found)
    }
}

/// `LIMIT`/`OFFSET` take signed 64-bit values
fn sql_bound(value: usize) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

/// Root identifiers in creation order
fn root_ids(comments: &[Comment]) -> Vec<&str> {
    comments
        .iter()
        .filter(|c| c.is_root())
        .map(|c| c.id.as_str())
        .collect()
}

#[async_trait]
impl CommentStore for PostgresStore {
    async fn create_post(&self, post: &Post) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO posts (id, title, body, allow_comments)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (id) DO UPDATE
            SET title = EXCLUDED.title,
                body = EXCLUDED.body,
                allow_comments = EXCLUDED.allow_comments
            "#,
        )
        .bind(&post.id)
        .bind(&post.title)
        .bind(&post.body)
        .bind(post.allow_comments)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get_posts(&self) -> Result<Vec<Post>> {
        let posts = sqlx::query_as::<_, PostRow>(
            "SELECT id, title, body, allow_comments FROM posts ORDER BY seq",
        )
        .fetch_all(&self.pool)
        .await?;

        let comments: Vec<Comment> = sqlx::query_as::<_, CommentRow>(
            "SELECT id, post_id, body, parent_id FROM comments ORDER BY seq",
        )
        .fetch_all(&self.pool)
        .await?
        .into_iter()
        .map(Comment::from)
        .collect();

        let mut roots: HashMap<String, Vec<String>> = HashMap::new();
        for comment in comments.iter().filter(|c| c.is_root()) {
            roots
                .entry(comment.post_id.clone())
                .or_default()
                .push(comment.id.clone());
        }
        let arena = CommentArena::from_creation_order(comments);

        Ok(posts
            .into_iter()
            .map(|row| {
                let tree = roots
                    .get(&row.id)
                    .map(|ids| arena.materialize_all(ids.iter().map(String::as_str)))
                    .unwrap_or_default();
                row.into_post(tree)
            })
            .collect())
    }

    async fn get_post_by_id(
        &self,
        id: &str,
        limit: Option<usize>,
        offset: Option<usize>,
    ) -> Result<Post> {
        let row = sqlx::query_as::<_, PostRow>(
            "SELECT id, title, body, allow_comments FROM posts WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("no posts with this id: {}", id)))?;

        let comments = self.post_comments(id).await?;

        let tree = match (limit, offset) {
            (Some(limit), Some(offset)) => {
                let window = self.window_ids(id, limit, offset).await?;
                debug!(post_id = %id, limit, offset, returned = window.len(), "comment window");
                let arena = CommentArena::from_creation_order(comments);
                arena.materialize_all(window.iter().map(String::as_str))
            }
            _ => {
                let roots: Vec<String> =
                    root_ids(&comments).into_iter().map(str::to_string).collect();
                let arena = CommentArena::from_creation_order(comments);
                arena.materialize_all(roots.iter().map(String::as_str))
            }
        };

        Ok(row.into_post(tree))
    }

    async fn get_post_summary(&self, id: &str) -> Result<Post> {
        let row = sqlx::query_as::<_, PostRow>(
            "SELECT id, title, body, allow_comments FROM posts WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("no posts with this id: {}", id)))?;

        Ok(row.into_post(Vec::new()))
    }

    async fn get_comment_post_id(&self, id: &str) -> Result<String> {
        sqlx::query_scalar::<_, String>("SELECT post_id FROM comments WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("no comments with this id: {}", id)))
    }

    async fn create_comment(&self, post: &Post, comment: &Comment) -> Result<()> {
        if !self
            .exists("SELECT EXISTS (SELECT 1 FROM posts WHERE id = $1)", &post.id)
            .await?
        {
            return Err(AppError::NotFound(format!("no posts with this id: {}", post.id)));
        }

        if let Some(parent_id) = &comment.parent_id {
            if !self
                .exists("SELECT EXISTS (SELECT 1 FROM comments WHERE id = $1)", parent_id)
                .await?
            {
                return Err(AppError::NotFound(format!(
                    "no comments with this id: {}",
                    parent_id
                )));
            }
        }

        sqlx::query(
            r#"
            INSERT INTO comments (id, post_id, body, parent_id)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(&comment.id)
        .bind(&post.id)
        .bind(&comment.body)
        .bind(&comment.parent_id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get_comment_by_id(&self, id: &str) -> Result<Comment> {
        let rows = sqlx::query_as::<_, CommentRow>(
            r#"
            WITH RECURSIVE subtree AS (
                SELECT id, post_id, body, parent_id, seq
                FROM comments
                WHERE id = $1

                UNION ALL

                SELECT c.id, c.post_id, c.body, c.parent_id, c.seq
                FROM comments c
                INNER JOIN subtree s ON c.parent_id = s.id
            )
            SELECT id, post_id, body, parent_id FROM subtree ORDER BY seq
            "#,
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;

        CommentArena::from_creation_order(rows.into_iter().map(Comment::from))
            .materialize(id)
            .ok_or_else(|| AppError::NotFound(format!("no comments with this id: {}", id)))
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sql_bound_saturates() {
        assert_eq!(sql_bound(10), 10);
        assert_eq!(sql_bound(usize::MAX), i64::MAX);
    }

    #[test]
    fn test_root_ids_skip_replies() {
        let root = Comment::new("p", "root", None);
        let reply = Comment::new("p", "reply", Some(root.id.clone()));
        let other = Comment::new("p", "other", None);
        let comments = vec![root.clone(), reply, other.clone()];

        assert_eq!(root_ids(&comments), vec![root.id.as_str(), other.id.as_str()]);
    }

    #[test]
    fn test_schema_caps_comment_body() {
        assert!(SCHEMA.contains("VARCHAR(2000)"));
        assert!(SCHEMA.contains("REFERENCES comments (id)"));
    }
}
