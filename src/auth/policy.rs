//! Ownership rules for every mutating action.
//!
//! All predicates take the acting user as an `Option` and fail closed: no user
//! means no permission.

use std::fmt;

use crate::db::models::{Comment, Post, User};

/// Why an authenticated user was turned away.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Forbidden {
    PostOwnership,
    Like,
    CommentOwnership,
}

impl Forbidden {
    pub fn message(self) -> &'static str {
        match self {
            Forbidden::PostOwnership => "You can only edit or delete posts you have created.",
            Forbidden::Like => "You can't like your own post & can only like a post once.",
            Forbidden::CommentOwnership => {
                "You can only edit or delete comments you have created."
            }
        }
    }
}

impl fmt::Display for Forbidden {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

pub fn can_edit_or_delete_post(user: Option<&User>, post: &Post) -> bool {
    matches!(user, Some(u) if u.name == post.created_by)
}

pub fn can_like_post(user: Option<&User>, post: &Post) -> bool {
    match user {
        Some(u) => u.name != post.created_by && !post.liked_by.contains(&u.name),
        None => false,
    }
}

pub fn can_edit_or_delete_comment(user: Option<&User>, comment: &Comment) -> bool {
    matches!(user, Some(u) if u.id == comment.owner_id)
}

/// Record `user`'s like on an in-memory post. Refuses self-likes and repeats.
pub fn apply_like(post: &mut Post, user: &User) -> Result<(), Forbidden> {
    if !can_like_post(Some(user), post) {
        return Err(Forbidden::Like);
    }
    post.like_count += 1;
    post.liked_by.insert(user.name.clone());
    Ok(())
}
