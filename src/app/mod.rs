//! View-model of the review dashboard.
//!
//! Holds everything the presentation layer renders: tab and drawer state, the
//! activity log, the changed files, the selected file's parsed diff and its
//! local comments. Local comments are persisted per (repository, PR, path)
//! when a store is attached.

use anyhow::{Context, Result};
use std::time::Duration;
use tracing::debug;

use crate::config::{Config, Settings};
use crate::diff::{self, DiffLine};
use crate::fixtures;
use crate::github::{Comparison, DiffFile, IssueComment};
use crate::store::{CommentStore, LocalComment};
use crate::sync::SyncOutcome;

mod types;
pub use types::*;

mod comments;
mod filter;
mod timeline;

pub struct ViewModel {
    pub repo: String,
    pub pr_number: u32,
    pub branch: String,
    pub tab: Tab,
    /// Open tool drawer, if any
    pub tool: Option<Tool>,
    pub mode: Mode,
    logs: Vec<LogEntry>,
    scheduled: Vec<ScheduledStep>,
    files: Vec<DiffFile>,
    head_sha: Option<String>,
    issue_comments: Vec<IssueComment>,
    selected_path: Option<String>,
    /// Parsed rows of the selected file's patch
    lines: Vec<DiffLine>,
    /// Local comments of the selected file
    comments: Vec<LocalComment>,
    /// Row the comment editor is open on
    comment_line: Option<usize>,
    settings: Settings,
    store: Option<CommentStore>,
}

impl ViewModel {
    /// Empty dashboard for one pull request, seeded with the canned activity log.
    pub fn new(config: &Config, pr_number: u32, store: Option<CommentStore>) -> Self {
        let settings = store
            .as_ref()
            .and_then(|s| s.load_settings())
            .unwrap_or_else(|| Settings::from_config(config));

        Self {
            repo: config.repo.slug(),
            pr_number,
            branch: config.agent.branch.clone(),
            tab: Tab::default(),
            tool: None,
            mode: Mode::default(),
            logs: fixtures::initial_logs(),
            scheduled: Vec::new(),
            files: Vec::new(),
            head_sha: None,
            issue_comments: Vec::new(),
            selected_path: None,
            lines: Vec::new(),
            comments: Vec::new(),
            comment_line: None,
            settings,
            store,
        }
    }

    /// Dashboard preloaded with the sample branch and its first file selected.
    pub fn sample(config: &Config, pr_number: u32, store: Option<CommentStore>) -> Result<Self> {
        let mut vm = Self::new(config, pr_number, store);
        vm.load_comparison(fixtures::sample_comparison());
        vm.set_issue_comments(fixtures::sample_issue_comments());
        vm.select_file(fixtures::SAMPLE_FILE_PATH)?;
        Ok(vm)
    }

    pub fn logs(&self) -> &[LogEntry] {
        &self.logs
    }

    pub fn files(&self) -> &[DiffFile] {
        &self.files
    }

    pub fn lines(&self) -> &[DiffLine] {
        &self.lines
    }

    pub fn comments(&self) -> &[LocalComment] {
        &self.comments
    }

    pub fn selected_path(&self) -> Option<&str> {
        self.selected_path.as_deref()
    }

    pub fn head_sha(&self) -> Option<&str> {
        self.head_sha.as_deref()
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Replace the changed files. The selected file is re-parsed from the new
    /// patch; its local comments stay as they are.
    pub fn load_comparison(&mut self, comparison: Comparison) {
        self.files = comparison.files;
        if comparison.head_sha.is_some() {
            self.head_sha = comparison.head_sha;
        }
        if let Some(path) = &self.selected_path {
            let patch = self
                .files
                .iter()
                .find(|f| &f.filename == path)
                .and_then(|f| f.patch.as_deref());
            self.lines = diff::parse_patch(patch);
        }
    }

    pub fn set_issue_comments(&mut self, comments: Vec<IssueComment>) {
        self.issue_comments = comments;
    }

    /// Show one changed file: parse its patch, close the comment editor and
    /// load that file's local comments.
    pub fn select_file(&mut self, path: &str) -> Result<()> {
        let file = self
            .files
            .iter()
            .find(|f| f.filename == path)
            .with_context(|| format!("{} is not a changed file", path))?;

        self.lines = diff::parse_patch(file.patch.as_deref());
        self.comment_line = None;
        self.comments = match &self.store {
            Some(store) => store.load_comments(&self.repo, self.pr_number, path)?,
            None => Vec::new(),
        };
        self.selected_path = Some(path.to_string());
        self.tab = Tab::Diff;

        debug!(path, rows = self.lines.len(), comments = self.comments.len(), "select_file");
        Ok(())
    }

    /// Take over the result of a synchronization pass for the selected file.
    pub fn apply_sync(&mut self, outcome: SyncOutcome, path: &str) {
        if outcome.head_sha.is_some() {
            self.head_sha = outcome.head_sha;
        }
        self.issue_comments = outcome.issue_comments;
        if self.selected_path.as_deref() == Some(path) {
            self.lines = outcome.lines;
            self.comments = outcome.comments;
        }
    }

    /// Center panel content. Source and Tests show the sample branch's file
    /// and its last test run.
    pub fn tab_content(&self) -> TabContent<'_> {
        match self.tab {
            Tab::Diff => TabContent::Diff(&self.lines),
            Tab::Source => TabContent::Source(fixtures::SAMPLE_SOURCE),
            Tab::Tests => TabContent::Tests(fixtures::TEST_OUTPUT),
        }
    }

    pub fn set_tab(&mut self, tab: Tab) {
        self.tab = tab;
    }

    /// Open a tool drawer; choosing the open one closes it.
    pub fn toggle_tool(&mut self, tool: Tool) {
        self.tool = if self.tool == Some(tool) { None } else { Some(tool) };
    }

    pub fn set_auto_refresh(&mut self, enabled: bool) -> Result<()> {
        self.settings.auto_refresh = enabled;
        self.persist_settings()
    }

    /// Rejects intervals below the floor; the previous value is kept.
    pub fn set_refresh_interval(&mut self, secs: u64) -> Result<()> {
        self.settings.set_refresh_interval(secs)?;
        self.persist_settings()
    }

    pub fn set_jira_issue_key(&mut self, key: &str) -> Result<()> {
        self.settings.set_jira_issue_key(key);
        self.persist_settings()
    }

    /// Period of the automatic refresh, or None when it's switched off.
    pub fn refresh_interval(&self) -> Option<Duration> {
        self.settings
            .auto_refresh
            .then(|| Duration::from_secs(self.settings.refresh_interval_secs))
    }

    fn persist_settings(&self) -> Result<()> {
        if let Some(store) = &self.store {
            store.save_settings(&self.settings)?;
        }
        Ok(())
    }

    pub(crate) fn push_log(&mut self, entry: LogEntry) {
        self.logs.push(entry);
    }

    /// Simulate opening a pull request for the agent branch.
    pub fn create_pr(&mut self, number: u32) {
        self.push_log(
            LogEntry::new(LogKind::Executing, "PR").text(format!("Created PR #{}", number)),
        );
    }
}
