use anyhow::Result;

use crate::filter::{matches_any, ListFilter};
use crate::github::{DiffFile, IssueComment};

use super::ViewModel;

impl ViewModel {
    /// Changed files sorted by filename, narrowed by a case-insensitive query.
    pub fn changed_files(&self, query: &str) -> Vec<&DiffFile> {
        let mut files: Vec<&DiffFile> = self.files.iter().collect();
        files.sort_by(|a, b| a.filename.cmp(&b.filename));

        let mut filter = ListFilter::new(query);
        filter.apply(&files, |file, q| matches_any(&[file.filename.as_str()], q));
        filter.matched(&files).into_iter().copied().collect()
    }

    /// PR conversation comments whose body or author matches the query.
    pub fn issue_comments(&self, query: &str) -> Vec<&IssueComment> {
        let mut filter = ListFilter::new(query);
        filter.apply(&self.issue_comments, |comment, q| {
            matches_any(&[comment.body.as_str(), comment.user.login.as_str()], q)
        });
        filter.matched(&self.issue_comments)
    }

    /// Select the file after the current one in the filtered changed-files list.
    ///
    /// Starts at the first match when the selection isn't in the list; stays on
    /// the last one at the end. Returns the selected path.
    pub fn select_next_file(&mut self, query: &str) -> Result<Option<String>> {
        let names: Vec<String> = self
            .changed_files("")
            .into_iter()
            .map(|f| f.filename.clone())
            .collect();

        let mut filter = ListFilter::new(query);
        filter.apply(&names, |name, q| matches_any(&[name.as_str()], q));
        filter.selected = self
            .selected_path
            .as_ref()
            .and_then(|path| names.iter().position(|n| n == path))
            .and_then(|i| filter.matched_indices.iter().position(|&m| m == i));

        let next = if filter.selected.is_some() {
            filter.navigate_down()
        } else {
            filter.sync_selection()
        };

        match next {
            Some(i) => {
                let path = names[i].clone();
                self.select_file(&path)?;
                Ok(Some(path))
            }
            None => Ok(None),
        }
    }
}
