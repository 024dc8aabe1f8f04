use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use xdg::BaseDirectories;

use crate::config::Settings;

/// A comment written locally against one row of the selected file's diff.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalComment {
    /// Index into the parsed rows of the file's patch
    pub line_index: usize,
    pub text: String,
    /// Review comment this entry was anchored from, if it came from GitHub
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote_id: Option<u64>,
}

impl LocalComment {
    pub fn new(line_index: usize, text: impl Into<String>) -> Self {
        Self {
            line_index,
            text: text.into(),
            remote_id: None,
        }
    }
}

/// Sanitize repository name to prevent path traversal attacks.
/// Only allows alphanumeric characters, underscores, hyphens, and single dots (not ".." sequences).
/// Returns a sanitized string with '/' replaced by '_'.
pub fn sanitize_repo_name(repo: &str) -> Result<String> {
    if repo.contains("..") || repo.starts_with('/') || repo.starts_with('\\') {
        anyhow::bail!("Invalid repository name: contains path traversal pattern");
    }

    let sanitized = repo.replace('/', "_");

    if let Some(c) = sanitized
        .chars()
        .find(|&c| !c.is_alphanumeric() && c != '_' && c != '-' && c != '.')
    {
        anyhow::bail!("Invalid repository name: contains invalid character '{}'", c);
    }

    if sanitized.starts_with('.') {
        anyhow::bail!("Invalid repository name: cannot start with a dot");
    }

    Ok(sanitized)
}

/// Comments of one pull request, keyed by file path.
type CommentFile = BTreeMap<String, Vec<LocalComment>>;

/// Durable local state: comments per (repository, PR, path) and view settings.
///
/// Layout under the root (`~/.local/share/atlas/` by default):
/// - `comments/{owner}_{repo}_{pr}.json`
/// - `settings.json`
#[derive(Debug, Clone)]
pub struct CommentStore {
    root: PathBuf,
}

impl CommentStore {
    pub fn at(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Store under the XDG data directory.
    pub fn open_default() -> Self {
        let root = BaseDirectories::with_prefix("atlas")
            .map(|dirs| dirs.get_data_home())
            .unwrap_or_else(|_| PathBuf::from(".local/share/atlas"));
        Self::at(root)
    }

    fn comments_path(&self, repo: &str, pr_number: u32) -> Result<PathBuf> {
        let sanitized = sanitize_repo_name(repo)?;
        Ok(self
            .root
            .join("comments")
            .join(format!("{}_{}.json", sanitized, pr_number)))
    }

    fn settings_path(&self) -> PathBuf {
        self.root.join("settings.json")
    }

    /// Local comments for one file. Missing or unreadable state yields an empty set.
    pub fn load_comments(&self, repo: &str, pr_number: u32, path: &str) -> Result<Vec<LocalComment>> {
        let file_path = self.comments_path(repo, pr_number)?;
        let mut comments: CommentFile = read_or_default(&file_path);
        Ok(comments.remove(path).unwrap_or_default())
    }

    /// Replace the stored comments of one file, leaving other files untouched.
    pub fn save_comments(
        &self,
        repo: &str,
        pr_number: u32,
        path: &str,
        comments: &[LocalComment],
    ) -> Result<()> {
        let file_path = self.comments_path(repo, pr_number)?;
        let mut all: CommentFile = read_or_default(&file_path);
        if comments.is_empty() {
            all.remove(path);
        } else {
            all.insert(path.to_string(), comments.to_vec());
        }
        write_atomic(&file_path, &all)?;
        debug!(repo, pr_number, path, count = comments.len(), "store: saved comments");
        Ok(())
    }

    pub fn load_settings(&self) -> Option<Settings> {
        read_json(&self.settings_path()).map(Settings::clamped)
    }

    pub fn save_settings(&self, settings: &Settings) -> Result<()> {
        write_atomic(&self.settings_path(), settings)
    }
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Option<T> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
        Err(e) => {
            warn!("Failed to read {}: {}", path.display(), e);
            return None;
        }
    };
    match serde_json::from_str(&content) {
        Ok(value) => Some(value),
        Err(e) => {
            warn!("Ignoring corrupt state file {}: {}", path.display(), e);
            None
        }
    }
}

fn read_or_default<T: DeserializeOwned + Default>(path: &Path) -> T {
    read_json(path).unwrap_or_default()
}

/// Serialize to a temp file in the target directory, then rename over the target.
fn write_atomic<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let dir = path
        .parent()
        .context("State file path has no parent directory")?;
    fs::create_dir_all(dir).context("Failed to create state directory")?;

    let content = serde_json::to_string_pretty(value).context("Failed to serialize state")?;
    let mut temp = tempfile::NamedTempFile::new_in(dir).context("Failed to create temporary state file")?;
    temp.write_all(content.as_bytes())
        .context("Failed to write temporary state file")?;
    temp.persist(path).context("Failed to rename state file")?;
    Ok(())
}
