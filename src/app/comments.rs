use anyhow::Result;
use tracing::debug;

use crate::diff;
use crate::github::CommentRequest;
use crate::store::LocalComment;

use super::types::*;
use super::ViewModel;

impl ViewModel {
    /// Open the comment editor on a row. Out-of-range rows are ignored.
    pub fn open_comment(&mut self, line_index: usize) -> bool {
        if line_index >= self.lines.len() {
            return false;
        }
        self.comment_line = Some(line_index);
        true
    }

    pub fn cancel_comment(&mut self) {
        self.comment_line = None;
    }

    pub fn comment_line(&self) -> Option<usize> {
        self.comment_line
    }

    /// Save the editor's text as a local comment on the open row.
    ///
    /// Blank text or a closed editor is a no-op returning `false`. The comment
    /// is also fed back into the activity log.
    pub fn save_comment(&mut self, text: &str) -> Result<bool> {
        let text = text.trim();
        let Some(line_index) = self.comment_line else {
            return Ok(false);
        };
        if text.is_empty() {
            return Ok(false);
        }

        self.comments.push(LocalComment::new(line_index, text));
        self.persist_comments()?;
        self.push_log(
            LogEntry::new(LogKind::User, "User Review")
                .items([format!("Comment on line {}", line_index + 1)])
                .text(text),
        );
        self.comment_line = None;

        debug!(line_index, "save_comment");
        Ok(true)
    }

    /// Post a free-form clarification to the activity log.
    pub fn send_clarification(&mut self, text: &str) -> bool {
        let text = text.trim();
        if text.is_empty() {
            return false;
        }
        self.push_log(LogEntry::new(LogKind::User, "User Clarification").text(text));
        true
    }

    /// Comments anchored at one row, in the order they were added.
    pub fn thread_at(&self, line_index: usize) -> Vec<&LocalComment> {
        self.comments
            .iter()
            .filter(|c| c.line_index == line_index)
            .collect()
    }

    /// Rows that carry at least one comment, with their threads.
    pub fn threads(&self) -> Vec<(usize, Vec<&LocalComment>)> {
        let mut rows: Vec<usize> = self.comments.iter().map(|c| c.line_index).collect();
        rows.sort_unstable();
        rows.dedup();
        rows.into_iter()
            .map(|row| (row, self.thread_at(row)))
            .collect()
    }

    /// GitHub request that would publish a local comment.
    ///
    /// Anchored on the row's side and line when the head commit and file are
    /// known; otherwise the comment goes to the PR conversation.
    pub fn comment_request(&self, comment: &LocalComment) -> CommentRequest {
        let anchor = diff::anchor_for_index(&self.lines, comment.line_index);
        CommentRequest::build(
            &comment.text,
            self.head_sha.as_deref(),
            self.selected_path.as_deref(),
            anchor,
        )
    }

    fn persist_comments(&self) -> Result<()> {
        if let (Some(store), Some(path)) = (&self.store, &self.selected_path) {
            store.save_comments(&self.repo, self.pr_number, path, &self.comments)?;
        }
        Ok(())
    }
}
