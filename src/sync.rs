//! Synchronization of remote review comments into local comment state.
//!
//! One pass loads the selected file's patch and the PR's review comments,
//! anchors every comment on that file to a row of the parsed patch, merges
//! the result into the stored local comments and persists them.

use anyhow::{Context, Result};
use serde::Serialize;
use std::future::Future;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::config::MIN_REFRESH_INTERVAL_SECS;
use crate::diff::{self, DiffLine};
use crate::github::{IssueComment, ReviewComment};
use crate::loader::{CommentSource, DiffSource};
use crate::store::{CommentStore, LocalComment};

/// Which file of which pull request a pass synchronizes.
#[derive(Debug, Clone)]
pub struct SyncTarget {
    pub repo: String,
    pub pr_number: u32,
    pub path: String,
}

/// Counts describing what a pass did with the remote comments.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    /// Remote comments on the selected file that mapped to a row
    pub anchored: usize,
    /// Anchored comments that were not already stored locally
    pub added: usize,
    /// Comments on other files
    pub other_path: usize,
    /// Comments whose `line` is null (outdated)
    pub outdated: usize,
    /// Comments on the selected file whose line isn't in the patch
    pub unanchored: usize,
}

#[derive(Debug, Clone)]
pub struct SyncOutcome {
    pub report: SyncReport,
    pub head_sha: Option<String>,
    /// Whether the selected path is among the diff files
    pub file_found: bool,
    pub lines: Vec<DiffLine>,
    pub comments: Vec<LocalComment>,
    pub issue_comments: Vec<IssueComment>,
}

/// Map review comments on `path` to row indices of `lines`.
///
/// Comments on other files, outdated comments and comments whose line is not
/// present on their side of the patch are dropped and counted.
pub fn anchor_comments(
    lines: &[DiffLine],
    path: &str,
    remote: &[ReviewComment],
) -> (Vec<LocalComment>, SyncReport) {
    let mut report = SyncReport::default();
    let mut anchored = Vec::new();

    for comment in remote {
        if comment.path != path {
            report.other_path += 1;
            continue;
        }
        let Some(line) = comment.line else {
            report.outdated += 1;
            continue;
        };
        match diff::map_line_to_index(lines, comment.side(), line) {
            Some(index) => {
                anchored.push(LocalComment {
                    line_index: index,
                    text: comment.body.clone(),
                    remote_id: Some(comment.id),
                });
            }
            None => {
                debug!(id = comment.id, line, side = %comment.side(), "sync: comment not anchored");
                report.unanchored += 1;
            }
        }
    }

    report.anchored = anchored.len();
    (anchored, report)
}

/// Append anchored remote comments that aren't stored yet.
///
/// Existing comments keep their order. A remote comment is already present
/// when an entry carries its id, or when an entry at the same row has the
/// same text. Returns how many were added.
pub fn merge_comments(local: &mut Vec<LocalComment>, anchored: Vec<LocalComment>) -> usize {
    let mut added = 0;
    for comment in anchored {
        let present = local.iter().any(|existing| {
            (comment.remote_id.is_some() && existing.remote_id == comment.remote_id)
                || (existing.line_index == comment.line_index && existing.text == comment.text)
        });
        if !present {
            local.push(comment);
            added += 1;
        }
    }
    added
}

/// Run one synchronization pass and persist the merged comments.
pub async fn sync_once(
    diff_source: &dyn DiffSource,
    comment_source: &dyn CommentSource,
    store: &CommentStore,
    target: &SyncTarget,
) -> Result<SyncOutcome> {
    let files = diff_source
        .diff_files()
        .await
        .context("Failed to load diff files")?;
    let snapshot = comment_source
        .comments()
        .await
        .context("Failed to load comments")?;

    let file = files.iter().find(|f| f.filename == target.path);
    if file.is_none() {
        warn!("{} is not among the {} changed files", target.path, files.len());
    }
    let lines = diff::parse_patch(file.and_then(|f| f.patch.as_deref()));

    let (anchored, mut report) = anchor_comments(&lines, &target.path, &snapshot.review_comments);

    let mut comments = store.load_comments(&target.repo, target.pr_number, &target.path)?;
    report.added = merge_comments(&mut comments, anchored);
    if report.added > 0 {
        store.save_comments(&target.repo, target.pr_number, &target.path, &comments)?;
    }

    let head_sha = match snapshot.head_sha {
        Some(sha) => Some(sha),
        None => diff_source.head_sha().await.ok().flatten(),
    };

    debug!(
        path = %target.path,
        anchored = report.anchored,
        added = report.added,
        unanchored = report.unanchored,
        "sync: done"
    );

    Ok(SyncOutcome {
        report,
        head_sha,
        file_found: file.is_some(),
        lines,
        comments,
        issue_comments: snapshot.issue_comments,
    })
}

/// Repeat `pass` every `interval_secs` (never faster than the floor) until `shutdown` resolves.
///
/// The first pass runs immediately. A pass is awaited before the next tick is
/// taken and missed ticks are skipped, so passes never overlap. A failed pass
/// is logged and the loop keeps going.
pub async fn watch<S, F, Fut>(interval_secs: u64, shutdown: S, mut pass: F) -> Result<()>
where
    S: Future<Output = ()>,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<()>>,
{
    let period = Duration::from_secs(interval_secs.max(MIN_REFRESH_INTERVAL_SECS));
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    tokio::pin!(shutdown);

    info!(interval = period.as_secs(), "sync: watching");
    loop {
        tokio::select! {
            _ = &mut shutdown => {
                info!("sync: stopped");
                return Ok(());
            }
            _ = ticker.tick() => {
                if let Err(e) = pass().await {
                    warn!("sync pass failed: {:#}", e);
                }
            }
        }
    }
}

/// Resolve once `signal` fires. If the listener itself fails the error is
/// logged and this never resolves, so a watch loop keeps running instead of
/// stopping at once.
pub async fn until_signal<S>(signal: S)
where
    S: Future<Output = std::io::Result<()>>,
{
    if let Err(e) = signal.await {
        warn!("failed to listen for shutdown signal, running until killed: {}", e);
        std::future::pending::<()>().await;
    }
}
