use std::collections::BTreeSet;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: i64,
    pub name: String,
    /// `salt,digest` as produced by `auth::password::make_pw_hash`.
    pub pw_hash: String,
    pub email: Option<String>,
    pub created: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Post {
    pub id: i64,
    pub subject: String,
    pub content: String,
    pub created_by: String,
    pub like_count: i64,
    pub liked_by: BTreeSet<String>,
    pub created: String,
    pub last_modified: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Comment {
    pub id: i64,
    pub post_id: i64,
    pub owner_id: i64,
    pub text: String,
    pub created: String,
}

/// Result of an atomic like attempt against storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LikeOutcome {
    Liked,
    SelfLike,
    AlreadyLiked,
    PostMissing,
}
