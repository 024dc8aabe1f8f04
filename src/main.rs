use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde_json::json;
use std::cell::RefCell;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

use atlas::app::{Mode, TabContent, ViewModel};
use atlas::config::Config;
use atlas::diff::{self, DiffLine, Side};
use atlas::github::{Comparison, DiffFile};
use atlas::loader::{diff_source_for, DiffSource, SnapshotCommentSource};
use atlas::store::{CommentStore, LocalComment};
use atlas::sync::{self, SyncOutcome, SyncTarget};

#[derive(Parser, Debug)]
#[command(name = "atlas")]
#[command(about = "Parse pull-request diffs and anchor review comments to their rows")]
#[command(version)]
struct Args {
    /// Config file (default: $XDG_CONFIG_HOME/atlas/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Debug logging on stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the rows of a patch
    Parse {
        /// Patch file, `-` for stdin
        #[arg(default_value = "-")]
        file: PathBuf,
        #[arg(long)]
        json: bool,
    },
    /// Find the row a review comment anchors to
    Anchor {
        /// Patch file, `-` for stdin
        #[arg(default_value = "-")]
        file: PathBuf,
        #[arg(long)]
        side: Side,
        #[arg(long)]
        line: u32,
    },
    /// List changed files
    Files {
        /// Compare/files JSON snapshot or unified diff
        #[arg(long)]
        files: PathBuf,
        #[arg(long)]
        filter: Option<String>,
        #[arg(long)]
        json: bool,
    },
    /// Anchor remote review comments and merge them into local comments
    Sync {
        #[arg(long)]
        files: PathBuf,
        /// Comments JSON snapshot
        #[arg(long)]
        comments: PathBuf,
        #[arg(long)]
        pr: u32,
        /// Selected file
        #[arg(long)]
        path: String,
        /// Keep syncing until Ctrl-C
        #[arg(long)]
        watch: bool,
        /// Seconds between passes (minimum 5; default from settings)
        #[arg(long)]
        interval: Option<u64>,
        #[arg(long)]
        json: bool,
    },
    /// Manage local comments
    Comment {
        #[command(subcommand)]
        command: CommentCommand,
    },
    /// Replay the canned agent activity for a mode
    Demo {
        #[arg(long, value_enum, default_value_t = Mode::Run)]
        mode: Mode,
        #[arg(long, default_value = "")]
        instruction: String,
    },
}

#[derive(Subcommand, Debug)]
enum CommentCommand {
    /// Add a comment on a diff row
    Add {
        #[arg(long)]
        pr: u32,
        #[arg(long)]
        path: String,
        /// Row index in the parsed patch
        #[arg(long)]
        index: usize,
        #[arg(long)]
        text: String,
    },
    /// List local comments of a file
    List {
        #[arg(long)]
        pr: u32,
        #[arg(long)]
        path: String,
        #[arg(long)]
        json: bool,
    },
    /// Print the GitHub request that would publish local comments
    Payload {
        #[arg(long)]
        pr: u32,
        #[arg(long)]
        path: String,
        /// Row index of the comments to publish
        #[arg(long)]
        index: usize,
        /// Head commit (default: from the snapshot)
        #[arg(long)]
        commit: Option<String>,
        #[arg(long)]
        files: PathBuf,
    },
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "atlas=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose);
    let config = Config::load(args.config.as_deref())?;
    debug!(repo = %config.repo.slug(), "config loaded");

    match args.command {
        Command::Parse { file, json } => {
            let rows = diff::parse_patch(Some(read_input(&file)?.as_str()));
            if json {
                println!("{}", serde_json::to_string_pretty(&rows)?);
            } else {
                for row in &rows {
                    println!("{}", format_row(row));
                }
            }
        }
        Command::Anchor { file, side, line } => {
            let rows = diff::parse_patch(Some(read_input(&file)?.as_str()));
            match diff::map_line_to_index(&rows, side, line) {
                Some(index) => println!("{}", index),
                None => {
                    println!("not found");
                    std::process::exit(1);
                }
            }
        }
        Command::Files {
            files,
            filter,
            json,
        } => {
            let mut vm = ViewModel::new(&config, 0, None);
            vm.load_comparison(load_comparison(&files).await?);
            let listed = vm.changed_files(filter.as_deref().unwrap_or(""));
            if json {
                println!("{}", serde_json::to_string_pretty(&listed)?);
            } else {
                for file in listed {
                    println!("{}", format_file(file));
                }
            }
        }
        Command::Sync {
            files,
            comments,
            pr,
            path,
            watch,
            interval,
            json,
        } => {
            run_sync(&config, files, comments, pr, path, watch, interval, json).await?;
        }
        Command::Comment { command } => run_comment(&config, command).await?,
        Command::Demo { mode, instruction } => run_demo(&config, mode, &instruction).await?,
    }

    Ok(())
}

fn read_input(path: &Path) -> Result<String> {
    if path == Path::new("-") {
        let mut content = String::new();
        std::io::stdin()
            .read_to_string(&mut content)
            .context("Failed to read patch from stdin")?;
        Ok(content)
    } else {
        std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read patch file {}", path.display()))
    }
}

async fn load_comparison(path: &Path) -> Result<Comparison> {
    let source = diff_source_for(path);
    Ok(Comparison {
        head_sha: source.head_sha().await?,
        files: source.diff_files().await?,
    })
}

fn format_number(n: Option<u32>) -> String {
    n.map(|n| n.to_string()).unwrap_or_default()
}

fn format_row(row: &DiffLine) -> String {
    format!(
        "{:>5} {:>5} {}{}",
        format_number(row.old_line_number),
        format_number(row.new_line_number),
        row.kind.sign(),
        row.text
    )
}

fn format_file(file: &DiffFile) -> String {
    format!(
        "{} {} +{} -{}",
        file.status.symbol(),
        file.filename,
        file.additions,
        file.deletions
    )
}

fn print_threads(vm: &ViewModel) {
    for (row, thread) in vm.threads() {
        match vm.lines().get(row) {
            Some(line) => println!("{}", format_row(line)),
            None => println!("  row {} (not in patch)", row),
        }
        for comment in thread {
            println!("      > {}", comment.text);
        }
    }
}

/// Hand a pass to the view-model and print what it did.
fn show_sync(vm: &mut ViewModel, target: &SyncTarget, outcome: SyncOutcome, json: bool) -> Result<()> {
    if !outcome.file_found {
        eprintln!("warning: {} is not among the changed files", target.path);
    }
    let report = outcome.report.clone();
    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&json!({
                "path": target.path,
                "head_sha": outcome.head_sha,
                "report": report,
                "comments": outcome.comments,
            }))?
        );
    }

    vm.apply_sync(outcome, &target.path);
    if !json {
        println!(
            "{}: anchored {}, added {}, unanchored {}, outdated {}, other files {}",
            target.path,
            report.anchored,
            report.added,
            report.unanchored,
            report.outdated,
            report.other_path
        );
        print_threads(vm);
    }
    Ok(())
}

#[allow(clippy::too_many_arguments)]
async fn run_sync(
    config: &Config,
    files: PathBuf,
    comments: PathBuf,
    pr: u32,
    path: String,
    watch: bool,
    interval: Option<u64>,
    json: bool,
) -> Result<()> {
    let store = CommentStore::open_default();
    let diff_source = diff_source_for(&files);
    let comment_source = SnapshotCommentSource::new(comments);
    let target = SyncTarget {
        repo: config.repo.slug(),
        pr_number: pr,
        path,
    };

    let mut vm = ViewModel::new(config, pr, Some(store.clone()));
    vm.load_comparison(load_comparison(&files).await?);
    if let Err(e) = vm.select_file(&target.path) {
        debug!("sync: {:#}", e);
    }

    if !watch {
        let outcome =
            sync::sync_once(diff_source.as_ref(), &comment_source, &store, &target).await?;
        return show_sync(&mut vm, &target, outcome, json);
    }

    let interval_secs = match interval {
        Some(secs) => secs,
        None => {
            if !vm.settings().auto_refresh {
                warn!("auto refresh is off in settings; watching anyway");
            }
            vm.settings().refresh_interval_secs
        }
    };
    let shutdown = sync::until_signal(tokio::signal::ctrl_c());

    // passes run one at a time, so the borrow never overlaps
    let vm = RefCell::new(vm);
    let diff_source: &dyn DiffSource = diff_source.as_ref();
    let (comment_source, store, target, vm) = (&comment_source, &store, &target, &vm);
    sync::watch(interval_secs, shutdown, move || async move {
        let outcome = sync::sync_once(diff_source, comment_source, store, target).await?;
        show_sync(&mut vm.borrow_mut(), target, outcome, json)
    })
    .await
}

async fn run_comment(config: &Config, command: CommentCommand) -> Result<()> {
    let store = CommentStore::open_default();
    let repo = config.repo.slug();

    match command {
        CommentCommand::Add {
            pr,
            path,
            index,
            text,
        } => {
            let text = text.trim();
            anyhow::ensure!(!text.is_empty(), "comment text is empty");
            let mut comments = store.load_comments(&repo, pr, &path)?;
            comments.push(LocalComment::new(index, text));
            store.save_comments(&repo, pr, &path, &comments)?;
            println!("Saved comment on row {} of {}", index, path);
        }
        CommentCommand::List { pr, path, json } => {
            let comments = store.load_comments(&repo, pr, &path)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&comments)?);
            } else if comments.is_empty() {
                println!("No comments on {}", path);
            } else {
                for comment in &comments {
                    println!("{:>5}  {}", comment.line_index, comment.text);
                }
            }
        }
        CommentCommand::Payload {
            pr,
            path,
            index,
            commit,
            files,
        } => {
            let mut comparison = load_comparison(&files).await?;
            if commit.is_some() {
                comparison.head_sha = commit;
            }
            let mut vm = ViewModel::new(config, pr, Some(store));
            vm.load_comparison(comparison);
            vm.select_file(&path)?;

            let thread = vm.thread_at(index);
            anyhow::ensure!(!thread.is_empty(), "no local comment on row {} of {}", index, path);
            let requests: Vec<_> = thread
                .into_iter()
                .map(|comment| {
                    let request = vm.comment_request(comment);
                    json!({
                        "endpoint": request.endpoint(&vm.repo, vm.pr_number),
                        "body": request,
                    })
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&requests)?);
        }
    }
    Ok(())
}

async fn run_demo(config: &Config, mode: Mode, instruction: &str) -> Result<()> {
    let mut vm = ViewModel::new(config, 0, None);
    let seeded = vm.logs().len();
    vm.handle_mode(mode, instruction, Instant::now());

    while let Some(due) = vm.next_due() {
        tokio::time::sleep_until(due.into()).await;
        vm.tick(Instant::now());
    }

    for entry in &vm.logs()[seeded..] {
        println!("[{}] {} ({})", entry.ts, entry.title, entry.kind);
        for item in &entry.items {
            println!("  - {}", item);
        }
        if let Some(text) = &entry.text {
            println!("  {}", text);
        }
        if let Some(output) = &entry.output {
            for line in output.lines() {
                println!("  | {}", line);
            }
        }
    }
    println!("tab: {:?}", vm.tab);
    match vm.tab_content() {
        TabContent::Diff(rows) => {
            for row in rows {
                println!("{}", format_row(row));
            }
        }
        TabContent::Source(text) | TabContent::Tests(text) => println!("{}", text),
    }
    Ok(())
}
