//! GitHub-shaped payloads exchanged with the diff and comment collaborators.
mod comment;
mod pr;

pub use crate::diff::Side;
pub use comment::{
    CommentRequest, CommentsSnapshot, IssueComment, NewIssueComment, NewReviewComment,
    ReviewComment,
};
pub use pr::{Comparison, DiffFile, FileStatus, User};
