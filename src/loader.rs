//! Collaborator seams: where diff files and remote comments come from.
//!
//! GitHub itself is never contacted. Sources read snapshots of what the REST
//! API returns (or raw `git diff` / `gh pr diff` output) from disk.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

use crate::diff::{self, FilePatch};
use crate::github::{Comparison, CommentsSnapshot, DiffFile, FileStatus, ReviewComment};

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("snapshot not found: {0}")]
    NotFound(PathBuf),
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Supplies the changed files of a comparison or pull request.
#[async_trait]
pub trait DiffSource: Send + Sync {
    async fn diff_files(&self) -> Result<Vec<DiffFile>, LoadError>;

    /// Head commit of the compared branch, when the source knows it.
    async fn head_sha(&self) -> Result<Option<String>, LoadError> {
        Ok(None)
    }
}

/// Supplies review and discussion comments of a pull request.
#[async_trait]
pub trait CommentSource: Send + Sync {
    async fn comments(&self) -> Result<CommentsSnapshot, LoadError>;
}

async fn read_text(path: &Path) -> Result<String, LoadError> {
    match tokio::fs::read_to_string(path).await {
        Ok(content) => Ok(content),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(LoadError::NotFound(path.to_path_buf()))
        }
        Err(source) => Err(LoadError::Io {
            path: path.to_path_buf(),
            source,
        }),
    }
}

async fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, LoadError> {
    let content = read_text(path).await?;
    serde_json::from_str(&content).map_err(|source| LoadError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Either a compare payload (`{"files": [...]}`) or a bare pulls/{n}/files array.
#[derive(Deserialize)]
#[serde(untagged)]
enum FilesPayload {
    Comparison(Comparison),
    Files(Vec<DiffFile>),
}

impl From<FilesPayload> for Comparison {
    fn from(payload: FilesPayload) -> Self {
        match payload {
            FilesPayload::Comparison(comparison) => comparison,
            FilesPayload::Files(files) => Comparison {
                head_sha: None,
                files,
            },
        }
    }
}

/// JSON snapshot of the compare or pulls/{n}/files endpoint.
pub struct SnapshotDiffSource {
    path: PathBuf,
}

impl SnapshotDiffSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub async fn comparison(&self) -> Result<Comparison, LoadError> {
        let payload: FilesPayload = read_json(&self.path).await?;
        let comparison = Comparison::from(payload);
        debug!(path = %self.path.display(), files = comparison.files.len(), "loaded diff snapshot");
        Ok(comparison)
    }
}

#[async_trait]
impl DiffSource for SnapshotDiffSource {
    async fn diff_files(&self) -> Result<Vec<DiffFile>, LoadError> {
        Ok(self.comparison().await?.files)
    }

    async fn head_sha(&self) -> Result<Option<String>, LoadError> {
        Ok(self.comparison().await?.head_sha)
    }
}

/// Raw unified diff (`git diff`, `gh pr diff`).
pub struct UnifiedDiffSource {
    path: PathBuf,
}

impl UnifiedDiffSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl DiffSource for UnifiedDiffSource {
    async fn diff_files(&self) -> Result<Vec<DiffFile>, LoadError> {
        let content = read_text(&self.path).await?;
        let files: Vec<DiffFile> = diff::split_unified_diff(&content)
            .into_iter()
            .map(diff_file_from_patch)
            .collect();
        debug!(path = %self.path.display(), files = files.len(), "loaded unified diff");
        Ok(files)
    }
}

/// Build the record GitHub would report for one file of a unified diff.
pub fn diff_file_from_patch(file: FilePatch) -> DiffFile {
    let (additions, deletions) = diff::count_changes(&diff::parse_patch(file.patch.as_deref()));
    let status = if file.new_file {
        FileStatus::Added
    } else if file.deleted_file {
        FileStatus::Removed
    } else if file.previous_filename.is_some() {
        FileStatus::Renamed
    } else {
        FileStatus::Modified
    };

    DiffFile {
        filename: file.filename,
        status,
        additions,
        deletions,
        changes: additions + deletions,
        patch: file.patch,
        previous_filename: file.previous_filename,
    }
}

/// Either the comments route payload or a bare review-comment array.
#[derive(Deserialize)]
#[serde(untagged)]
enum CommentsPayload {
    Snapshot(CommentsSnapshot),
    Review(Vec<ReviewComment>),
}

/// JSON snapshot of a pull request's comments.
pub struct SnapshotCommentSource {
    path: PathBuf,
}

impl SnapshotCommentSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl CommentSource for SnapshotCommentSource {
    async fn comments(&self) -> Result<CommentsSnapshot, LoadError> {
        let payload: CommentsPayload = read_json(&self.path).await?;
        let snapshot = match payload {
            CommentsPayload::Snapshot(snapshot) => snapshot,
            CommentsPayload::Review(review_comments) => CommentsSnapshot {
                review_comments,
                ..Default::default()
            },
        };
        debug!(
            path = %self.path.display(),
            review = snapshot.review_comments.len(),
            issue = snapshot.issue_comments.len(),
            "loaded comments snapshot"
        );
        Ok(snapshot)
    }
}

/// Pick a diff source by file extension: `.json` snapshots, anything else is a unified diff.
pub fn diff_source_for(path: &Path) -> Box<dyn DiffSource> {
    if path.extension().is_some_and(|ext| ext == "json") {
        Box::new(SnapshotDiffSource::new(path))
    } else {
        Box::new(UnifiedDiffSource::new(path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diff::Side;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn temp_file(suffix: &str, content: &str) -> NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[tokio::test]
    async fn test_snapshot_diff_source_compare_payload() {
        let file = temp_file(
            ".json",
            r#"{"head_sha": "abc", "files": [{"filename": "a.ts", "status": "added", "additions": 1, "deletions": 0, "changes": 1, "patch": "@@ -0,0 +1 @@\n+x"}]}"#,
        );
        let source = SnapshotDiffSource::new(file.path());
        let files = source.diff_files().await.unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].status, FileStatus::Added);
        assert_eq!(source.head_sha().await.unwrap().as_deref(), Some("abc"));
    }

    #[tokio::test]
    async fn test_snapshot_diff_source_plain_array() {
        let file = temp_file(".json", r#"[{"filename": "b.ts"}, {"filename": "a.ts"}]"#);
        let source = SnapshotDiffSource::new(file.path());
        let files = source.diff_files().await.unwrap();
        assert_eq!(files.len(), 2);
        assert_eq!(files[0].filename, "b.ts");
        assert_eq!(source.head_sha().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_snapshot_missing_file() {
        let source = SnapshotDiffSource::new("/nonexistent/atlas/files.json");
        let err = source.diff_files().await.unwrap_err();
        assert!(matches!(err, LoadError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_snapshot_invalid_json() {
        let file = temp_file(".json", "{ not json");
        let err = SnapshotCommentSource::new(file.path())
            .comments()
            .await
            .unwrap_err();
        assert!(matches!(err, LoadError::Parse { .. }));
        assert!(err.to_string().starts_with("failed to parse"));
    }

    #[tokio::test]
    async fn test_unified_diff_source() {
        let file = temp_file(
            ".diff",
            "diff --git a/src/new.rs b/src/new.rs\nnew file mode 100644\n--- /dev/null\n+++ b/src/new.rs\n@@ -0,0 +1,2 @@\n+a\n+b\ndiff --git a/src/lib.rs b/src/lib.rs\n--- a/src/lib.rs\n+++ b/src/lib.rs\n@@ -1,2 +1,2 @@\n-x\n+y\n z\n",
        );
        let files = UnifiedDiffSource::new(file.path()).diff_files().await.unwrap();
        assert_eq!(files.len(), 2);
        assert_eq!(files[0].filename, "src/new.rs");
        assert_eq!(files[0].status, FileStatus::Added);
        assert_eq!((files[0].additions, files[0].deletions), (2, 0));
        assert_eq!(files[1].status, FileStatus::Modified);
        assert_eq!(files[1].changes, 2);
    }

    #[tokio::test]
    async fn test_snapshot_comment_source_route_payload() {
        let file = temp_file(
            ".json",
            r#"{
                "head_sha": "6dcb09b",
                "review_comments": [{"id": 1, "path": "a.ts", "line": 3, "side": "LEFT", "body": "why?", "user": {"login": "octocat"}}],
                "issue_comments": [{"id": 2, "body": "LGTM", "user": {"login": "hubot"}}]
            }"#,
        );
        let snapshot = SnapshotCommentSource::new(file.path()).comments().await.unwrap();
        assert_eq!(snapshot.head_sha.as_deref(), Some("6dcb09b"));
        assert_eq!(snapshot.review_comments[0].side(), Side::Left);
        assert_eq!(snapshot.issue_comments[0].user.login, "hubot");
    }

    #[tokio::test]
    async fn test_snapshot_comment_source_plain_array() {
        let file = temp_file(
            ".json",
            r#"[{"id": 1, "path": "a.ts", "line": 3, "body": "nit"}]"#,
        );
        let snapshot = SnapshotCommentSource::new(file.path()).comments().await.unwrap();
        assert_eq!(snapshot.review_comments.len(), 1);
        assert!(snapshot.issue_comments.is_empty());
    }

    #[tokio::test]
    async fn test_diff_source_for_extension() {
        let patch = "diff --git a/a.rs b/a.rs\n--- a/a.rs\n+++ b/a.rs\n@@ -1 +1 @@\n-a\n+b\n";
        let diff = temp_file(".diff", patch);
        let files = diff_source_for(diff.path()).diff_files().await.unwrap();
        assert_eq!(files[0].filename, "a.rs");

        let json = temp_file(".json", r#"[{"filename": "b.rs"}]"#);
        let files = diff_source_for(json.path()).diff_files().await.unwrap();
        assert_eq!(files[0].filename, "b.rs");
    }
}
