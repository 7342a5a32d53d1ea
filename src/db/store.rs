// Repository pattern - isolates all database side effects
use std::collections::BTreeSet;

use rusqlite::{params, Connection, OptionalExtension, Row, TransactionBehavior};
use thiserror::Error;

use crate::db::models::{Comment, LikeOutcome, Post, User};
use crate::state::DbPool;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Pool error: {0}")]
    Pool(#[from] r2d2::Error),

    #[error("SQL error: {0}")]
    Sql(#[from] rusqlite::Error),

    #[error("Conflict: {0}")]
    Conflict(String),
}

/// Storage operations the blog depends on.
pub trait BlogStore: Send + Sync {
    fn find_user_by_name(&self, name: &str) -> Result<Option<User>, StoreError>;
    fn find_user_by_id(&self, id: i64) -> Result<Option<User>, StoreError>;
    /// Fails with `StoreError::Conflict` when the name is taken.
    fn create_user(
        &self,
        name: &str,
        pw_hash: &str,
        email: Option<&str>,
    ) -> Result<User, StoreError>;

    fn find_post_by_id(&self, id: i64) -> Result<Option<Post>, StoreError>;
    fn create_post(&self, created_by: &str, subject: &str, content: &str)
        -> Result<Post, StoreError>;
    /// Returns false when the post does not exist.
    fn update_post(&self, id: i64, subject: &str, content: &str) -> Result<bool, StoreError>;
    /// Deletes the post together with its comments and likes.
    fn delete_post(&self, id: i64) -> Result<bool, StoreError>;
    /// Newest first.
    fn list_posts(&self) -> Result<Vec<Post>, StoreError>;

    /// Records a like and bumps the counter as one atomic update. Self-likes
    /// and repeat likes are rejected inside the same transaction.
    fn like_post(&self, post_id: i64, username: &str) -> Result<LikeOutcome, StoreError>;

    fn find_comment_by_id(&self, id: i64) -> Result<Option<Comment>, StoreError>;
    fn create_comment(&self, post_id: i64, owner_id: i64, text: &str)
        -> Result<Comment, StoreError>;
    fn update_comment(&self, id: i64, text: &str) -> Result<bool, StoreError>;
    fn delete_comment(&self, id: i64) -> Result<bool, StoreError>;
    /// Oldest first.
    fn list_comments_for_post(&self, post_id: i64) -> Result<Vec<Comment>, StoreError>;
}

/// SQLite implementation
#[derive(Clone)]
pub struct SqliteStore {
    pool: DbPool,
}

impl SqliteStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

const USER_COLUMNS: &str = "id, name, pw_hash, email, created";
const POST_COLUMNS: &str = "id, subject, content, created_by, like_count, created, last_modified";
const COMMENT_COLUMNS: &str = "id, post_id, owner_id, text, created";

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        name: row.get(1)?,
        pw_hash: row.get(2)?,
        email: row.get(3)?,
        created: row.get(4)?,
    })
}

fn post_from_row(row: &Row<'_>) -> rusqlite::Result<Post> {
    Ok(Post {
        id: row.get(0)?,
        subject: row.get(1)?,
        content: row.get(2)?,
        created_by: row.get(3)?,
        like_count: row.get(4)?,
        liked_by: BTreeSet::new(),
        created: row.get(5)?,
        last_modified: row.get(6)?,
    })
}

fn comment_from_row(row: &Row<'_>) -> rusqlite::Result<Comment> {
    Ok(Comment {
        id: row.get(0)?,
        post_id: row.get(1)?,
        owner_id: row.get(2)?,
        text: row.get(3)?,
        created: row.get(4)?,
    })
}

fn load_liked_by(conn: &Connection, post: &mut Post) -> rusqlite::Result<()> {
    let mut stmt = conn.prepare("SELECT username FROM post_likes WHERE post_id = ?1")?;
    post.liked_by = stmt
        .query_map(params![post.id], |row| row.get(0))?
        .collect::<rusqlite::Result<BTreeSet<String>>>()?;
    Ok(())
}

fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _) if e.code == rusqlite::ErrorCode::ConstraintViolation
    )
}

impl BlogStore for SqliteStore {
    fn find_user_by_name(&self, name: &str) -> Result<Option<User>, StoreError> {
        let conn = self.pool.get()?;
        let user = conn
            .query_row(
                &format!("SELECT {USER_COLUMNS} FROM users WHERE name = ?1"),
                params![name],
                user_from_row,
            )
            .optional()?;
        Ok(user)
    }

    fn find_user_by_id(&self, id: i64) -> Result<Option<User>, StoreError> {
        let conn = self.pool.get()?;
        let user = conn
            .query_row(
                &format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"),
                params![id],
                user_from_row,
            )
            .optional()?;
        Ok(user)
    }

    fn create_user(
        &self,
        name: &str,
        pw_hash: &str,
        email: Option<&str>,
    ) -> Result<User, StoreError> {
        let conn = self.pool.get()?;
        conn.execute(
            "INSERT INTO users (name, pw_hash, email) VALUES (?1, ?2, ?3)",
            params![name, pw_hash, email],
        )
        .map_err(|e| {
            if is_unique_violation(&e) {
                StoreError::Conflict(format!("user {name} already exists"))
            } else {
                e.into()
            }
        })?;

        let user = conn.query_row(
            &format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"),
            params![conn.last_insert_rowid()],
            user_from_row,
        )?;
        Ok(user)
    }

    fn find_post_by_id(&self, id: i64) -> Result<Option<Post>, StoreError> {
        let conn = self.pool.get()?;
        let post = conn
            .query_row(
                &format!("SELECT {POST_COLUMNS} FROM posts WHERE id = ?1"),
                params![id],
                post_from_row,
            )
            .optional()?;

        match post {
            Some(mut post) => {
                load_liked_by(&conn, &mut post)?;
                Ok(Some(post))
            }
            None => Ok(None),
        }
    }

    fn create_post(
        &self,
        created_by: &str,
        subject: &str,
        content: &str,
    ) -> Result<Post, StoreError> {
        let conn = self.pool.get()?;
        conn.execute(
            "INSERT INTO posts (subject, content, created_by) VALUES (?1, ?2, ?3)",
            params![subject, content, created_by],
        )?;
        let post = conn.query_row(
            &format!("SELECT {POST_COLUMNS} FROM posts WHERE id = ?1"),
            params![conn.last_insert_rowid()],
            post_from_row,
        )?;
        Ok(post)
    }

    fn update_post(&self, id: i64, subject: &str, content: &str) -> Result<bool, StoreError> {
        let conn = self.pool.get()?;
        let rows = conn.execute(
            "UPDATE posts SET subject = ?1, content = ?2, last_modified = datetime('now')
             WHERE id = ?3",
            params![subject, content, id],
        )?;
        Ok(rows > 0)
    }

    fn delete_post(&self, id: i64) -> Result<bool, StoreError> {
        let conn = self.pool.get()?;
        let rows = conn.execute("DELETE FROM posts WHERE id = ?1", params![id])?;
        Ok(rows > 0)
    }

    fn list_posts(&self) -> Result<Vec<Post>, StoreError> {
        let conn = self.pool.get()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {POST_COLUMNS} FROM posts ORDER BY created DESC, id DESC"
        ))?;
        let mut posts = stmt
            .query_map([], post_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        for post in &mut posts {
            load_liked_by(&conn, post)?;
        }
        Ok(posts)
    }

    fn like_post(&self, post_id: i64, username: &str) -> Result<LikeOutcome, StoreError> {
        let mut conn = self.pool.get()?;
        // IMMEDIATE takes the write lock up front so the owner check, the
        // insert and the counter bump see one consistent snapshot.
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let created_by: Option<String> = tx
            .query_row(
                "SELECT created_by FROM posts WHERE id = ?1",
                params![post_id],
                |row| row.get(0),
            )
            .optional()?;

        let outcome = match created_by {
            None => LikeOutcome::PostMissing,
            Some(owner) if owner == username => LikeOutcome::SelfLike,
            Some(_) => {
                let inserted = tx.execute(
                    "INSERT OR IGNORE INTO post_likes (post_id, username) VALUES (?1, ?2)",
                    params![post_id, username],
                )?;
                if inserted == 0 {
                    LikeOutcome::AlreadyLiked
                } else {
                    tx.execute(
                        "UPDATE posts SET like_count = like_count + 1 WHERE id = ?1",
                        params![post_id],
                    )?;
                    LikeOutcome::Liked
                }
            }
        };

        tx.commit()?;
        Ok(outcome)
    }

    fn find_comment_by_id(&self, id: i64) -> Result<Option<Comment>, StoreError> {
        let conn = self.pool.get()?;
        let comment = conn
            .query_row(
                &format!("SELECT {COMMENT_COLUMNS} FROM comments WHERE id = ?1"),
                params![id],
                comment_from_row,
            )
            .optional()?;
        Ok(comment)
    }

    fn create_comment(
        &self,
        post_id: i64,
        owner_id: i64,
        text: &str,
    ) -> Result<Comment, StoreError> {
        let conn = self.pool.get()?;
        conn.execute(
            "INSERT INTO comments (post_id, owner_id, text) VALUES (?1, ?2, ?3)",
            params![post_id, owner_id, text],
        )?;
        let comment = conn.query_row(
            &format!("SELECT {COMMENT_COLUMNS} FROM comments WHERE id = ?1"),
            params![conn.last_insert_rowid()],
            comment_from_row,
        )?;
        Ok(comment)
    }

    fn update_comment(&self, id: i64, text: &str) -> Result<bool, StoreError> {
        let conn = self.pool.get()?;
        let rows = conn.execute(
            "UPDATE comments SET text = ?1 WHERE id = ?2",
            params![text, id],
        )?;
        Ok(rows > 0)
    }

    fn delete_comment(&self, id: i64) -> Result<bool, StoreError> {
        let conn = self.pool.get()?;
        let rows = conn.execute("DELETE FROM comments WHERE id = ?1", params![id])?;
        Ok(rows > 0)
    }

    fn list_comments_for_post(&self, post_id: i64) -> Result<Vec<Comment>, StoreError> {
        let conn = self.pool.get()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {COMMENT_COLUMNS} FROM comments WHERE post_id = ?1 ORDER BY created, id"
        ))?;
        let comments = stmt
            .query_map(params![post_id], comment_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(comments)
    }
}
