use serde::{Deserialize, Serialize};

use super::pr::User;
use crate::diff::Side;

/// Line-anchored review comment (`pulls/{n}/comments`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewComment {
    #[serde(default)]
    pub id: u64,
    pub path: String,
    /// `null` once the comment is outdated by a later push
    #[serde(default)]
    pub line: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    side: Option<Side>,
    pub body: String,
    #[serde(default)]
    pub user: User,
    #[serde(default)]
    pub created_at: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub html_url: Option<String>,
}

impl ReviewComment {
    pub fn new(id: u64, path: &str, line: Option<u32>, side: Side, body: &str) -> Self {
        Self {
            id,
            path: path.to_string(),
            line,
            side: Some(side),
            body: body.to_string(),
            user: User::default(),
            created_at: String::new(),
            html_url: None,
        }
    }

    /// GitHub omits `side` on legacy comments; those refer to the new file.
    pub fn side(&self) -> Side {
        self.side.unwrap_or_default()
    }
}

/// ディスカッションコメント（PRの会話タブのコメント）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueComment {
    #[serde(default)]
    pub id: u64,
    pub body: String,
    #[serde(default)]
    pub user: User,
    #[serde(default)]
    pub created_at: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub html_url: Option<String>,
}

/// Everything the comment collaborator returns for one pull request.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CommentsSnapshot {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub head_sha: Option<String>,
    #[serde(default)]
    pub review_comments: Vec<ReviewComment>,
    #[serde(default)]
    pub issue_comments: Vec<IssueComment>,
}

/// Body of `POST repos/{repo}/pulls/{n}/comments`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewReviewComment {
    pub body: String,
    pub commit_id: String,
    pub path: String,
    pub line: u32,
    pub side: Side,
}

/// Body of `POST repos/{repo}/issues/{n}/comments`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewIssueComment {
    pub body: String,
}

/// Outgoing comment: line-anchored when possible, otherwise a PR conversation comment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum CommentRequest {
    Review(NewReviewComment),
    Issue(NewIssueComment),
}

impl CommentRequest {
    /// A review comment needs the commit, the path and an anchor; anything
    /// missing falls back to an issue comment with the same body.
    pub fn build(
        body: &str,
        commit_id: Option<&str>,
        path: Option<&str>,
        anchor: Option<(Side, u32)>,
    ) -> Self {
        match (commit_id, path, anchor) {
            (Some(commit_id), Some(path), Some((side, line)))
                if !commit_id.is_empty() && !path.is_empty() =>
            {
                CommentRequest::Review(NewReviewComment {
                    body: body.to_string(),
                    commit_id: commit_id.to_string(),
                    path: path.to_string(),
                    line,
                    side,
                })
            }
            _ => CommentRequest::Issue(NewIssueComment {
                body: body.to_string(),
            }),
        }
    }

    /// REST endpoint the request is posted to.
    pub fn endpoint(&self, repo: &str, pr_number: u32) -> String {
        match self {
            CommentRequest::Review(_) => format!("repos/{}/pulls/{}/comments", repo, pr_number),
            CommentRequest::Issue(_) => format!("repos/{}/issues/{}/comments", repo, pr_number),
        }
    }
}
