//! Integration tests for the atlas binary.

use assert_cmd::cargo::cargo_bin_cmd;
use assert_cmd::Command;
use predicates::prelude::*;
use std::path::Path;
use tempfile::TempDir;

const PATCH: &str = "@@ -10,3 +10,4 @@\n line ten\n-line eleven\n+line 11\n+line 11b\n line twelve\n";

/// Binary isolated from the user's config and data directories.
fn atlas(home: &TempDir) -> Command {
    let mut cmd = cargo_bin_cmd!("atlas");
    cmd.env("XDG_DATA_HOME", home.path().join("data"))
        .env("XDG_CONFIG_HOME", home.path().join("config"))
        .env_remove("GITHUB_OWNER")
        .env_remove("GITHUB_REPO")
        .env_remove("GITHUB_BASE_BRANCH")
        .env_remove("ATLAS_JIRA_ISSUE_KEY")
        .env_remove("RUST_LOG");
    cmd
}

fn write(dir: &Path, name: &str, content: &str) -> String {
    let path = dir.join(name);
    std::fs::write(&path, content).unwrap();
    path.to_string_lossy().into_owned()
}

fn files_snapshot(dir: &Path) -> String {
    let snapshot = serde_json::json!({
        "head_sha": "abc123",
        "files": [
            {
                "filename": "src/b.ts",
                "status": "modified",
                "additions": 2,
                "deletions": 1,
                "changes": 3,
                "patch": PATCH,
            },
            {
                "filename": "src/a.ts",
                "status": "added",
                "additions": 1,
                "deletions": 0,
                "changes": 1,
                "patch": "@@ -0,0 +1 @@\n+hello",
            },
        ],
    });
    write(dir, "files.json", &snapshot.to_string())
}

fn comments_snapshot(dir: &Path) -> String {
    let snapshot = serde_json::json!({
        "review_comments": [
            { "id": 7, "path": "src/b.ts", "line": 12, "side": "RIGHT", "body": "Why two lines?" },
            { "id": 8, "path": "src/b.ts", "line": null, "body": "outdated" },
            { "id": 9, "path": "src/a.ts", "line": 1, "body": "elsewhere" },
        ],
        "issue_comments": [],
    });
    write(dir, "comments.json", &snapshot.to_string())
}

mod cli_basics {
    use super::*;

    #[test]
    fn test_help() {
        let home = TempDir::new().unwrap();
        atlas(&home)
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("anchor"))
            .stdout(predicate::str::contains("sync"));
    }

    #[test]
    fn test_unknown_command_fails() {
        let home = TempDir::new().unwrap();
        atlas(&home).arg("frobnicate").assert().failure();
    }
}

mod parse_and_anchor {
    use super::*;

    #[test]
    fn test_parse_from_file() {
        let home = TempDir::new().unwrap();
        let patch = write(home.path(), "change.patch", PATCH);
        atlas(&home)
            .args(["parse", &patch])
            .assert()
            .success()
            .stdout(predicate::str::contains("   10    10  line ten"))
            .stdout(predicate::str::contains("   11       -line eleven"))
            .stdout(predicate::str::contains("         12 +line 11b"));
    }

    #[test]
    fn test_parse_from_stdin_as_json() {
        let home = TempDir::new().unwrap();
        atlas(&home)
            .args(["parse", "--json"])
            .write_stdin(PATCH)
            .assert()
            .success()
            .stdout(predicate::str::contains("\"kind\": \"removed\""))
            .stdout(predicate::str::contains("\"new_line_number\": 13"));
    }

    #[test]
    fn test_anchor_found() {
        let home = TempDir::new().unwrap();
        let patch = write(home.path(), "change.patch", PATCH);
        atlas(&home)
            .args(["anchor", &patch, "--side", "RIGHT", "--line", "12"])
            .assert()
            .success()
            .stdout("3\n");
        atlas(&home)
            .args(["anchor", &patch, "--side", "left", "--line", "11"])
            .assert()
            .success()
            .stdout("1\n");
    }

    #[test]
    fn test_anchor_not_found_exits_1() {
        let home = TempDir::new().unwrap();
        atlas(&home)
            .args(["anchor", "-", "--side", "RIGHT", "--line", "99"])
            .write_stdin(PATCH)
            .assert()
            .code(1)
            .stdout(predicate::str::contains("not found"));
    }

    #[test]
    fn test_anchor_rejects_unknown_side() {
        let home = TempDir::new().unwrap();
        atlas(&home)
            .args(["anchor", "-", "--side", "MIDDLE", "--line", "1"])
            .write_stdin(PATCH)
            .assert()
            .failure()
            .stderr(predicate::str::contains("MIDDLE"));
    }
}

mod files {
    use super::*;

    #[test]
    fn test_files_sorted_with_symbols() {
        let home = TempDir::new().unwrap();
        let files = files_snapshot(home.path());
        atlas(&home)
            .args(["files", "--files", &files])
            .assert()
            .success()
            .stdout("+ src/a.ts +1 -0\nM src/b.ts +2 -1\n");
    }

    #[test]
    fn test_files_filter_is_case_insensitive() {
        let home = TempDir::new().unwrap();
        let files = files_snapshot(home.path());
        atlas(&home)
            .args(["files", "--files", &files, "--filter", "B.TS"])
            .assert()
            .success()
            .stdout("M src/b.ts +2 -1\n");
    }

    #[test]
    fn test_files_from_unified_diff() {
        let home = TempDir::new().unwrap();
        let diff = format!(
            "diff --git a/src/b.ts b/src/b.ts\nindex 1111111..2222222 100644\n--- a/src/b.ts\n+++ b/src/b.ts\n{}",
            PATCH
        );
        let path = write(home.path(), "pr.diff", &diff);
        atlas(&home)
            .args(["files", "--files", &path])
            .assert()
            .success()
            .stdout("M src/b.ts +2 -1\n");
    }

    #[test]
    fn test_files_missing_snapshot_fails() {
        let home = TempDir::new().unwrap();
        atlas(&home)
            .args(["files", "--files", "/nonexistent/files.json"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("not found"));
    }
}

mod sync_and_comments {
    use super::*;

    #[test]
    fn test_sync_anchors_and_persists() {
        let home = TempDir::new().unwrap();
        let files = files_snapshot(home.path());
        let comments = comments_snapshot(home.path());

        atlas(&home)
            .args(["sync", "--files", &files, "--comments", &comments])
            .args(["--pr", "5", "--path", "src/b.ts"])
            .assert()
            .success()
            .stdout(predicate::str::contains(
                "src/b.ts: anchored 1, added 1, unanchored 0, outdated 1, other files 1",
            ))
            .stdout(predicate::str::contains("> Why two lines?"));

        // 2回目は重複しない
        atlas(&home)
            .args(["sync", "--files", &files, "--comments", &comments])
            .args(["--pr", "5", "--path", "src/b.ts"])
            .assert()
            .success()
            .stdout(predicate::str::contains("added 0"));

        atlas(&home)
            .args(["comment", "list", "--pr", "5", "--path", "src/b.ts"])
            .assert()
            .success()
            .stdout("    3  Why two lines?\n");
    }

    #[test]
    fn test_sync_unknown_path_warns() {
        let home = TempDir::new().unwrap();
        let files = files_snapshot(home.path());
        let comments = comments_snapshot(home.path());

        atlas(&home)
            .args(["sync", "--files", &files, "--comments", &comments])
            .args(["--pr", "5", "--path", "src/missing.ts", "--json"])
            .assert()
            .success()
            .stderr(predicate::str::contains("not among the changed files"))
            .stdout(predicate::str::contains("\"anchored\": 0"));
    }

    #[test]
    fn test_comment_add_and_list() {
        let home = TempDir::new().unwrap();
        atlas(&home)
            .args(["comment", "add", "--pr", "1", "--path", "src/a.ts"])
            .args(["--index", "0", "--text", "  looks good  "])
            .assert()
            .success();

        atlas(&home)
            .args(["comment", "list", "--pr", "1", "--path", "src/a.ts", "--json"])
            .assert()
            .success()
            .stdout(predicate::str::contains("\"text\": \"looks good\""));

        atlas(&home)
            .args(["comment", "list", "--pr", "2", "--path", "src/a.ts"])
            .assert()
            .success()
            .stdout(predicate::str::contains("No comments"));
    }

    #[test]
    fn test_comment_add_rejects_blank_text() {
        let home = TempDir::new().unwrap();
        atlas(&home)
            .args(["comment", "add", "--pr", "1", "--path", "src/a.ts"])
            .args(["--index", "0", "--text", "   "])
            .assert()
            .failure()
            .stderr(predicate::str::contains("empty"));
    }

    #[test]
    fn test_comment_payload_anchored() {
        let home = TempDir::new().unwrap();
        let files = files_snapshot(home.path());
        atlas(&home)
            .args(["comment", "add", "--pr", "5", "--path", "src/b.ts"])
            .args(["--index", "1", "--text", "Keep this line"])
            .assert()
            .success();

        atlas(&home)
            .args(["comment", "payload", "--pr", "5", "--path", "src/b.ts"])
            .args(["--index", "1", "--files", &files])
            .assert()
            .success()
            .stdout(predicate::str::contains("repos/local/pulls/5/comments"))
            .stdout(predicate::str::contains("\"commit_id\": \"abc123\""))
            .stdout(predicate::str::contains("\"side\": \"LEFT\""))
            .stdout(predicate::str::contains("\"line\": 11"));
    }

    #[test]
    fn test_comment_payload_commit_override() {
        let home = TempDir::new().unwrap();
        let files = files_snapshot(home.path());
        atlas(&home)
            .args(["comment", "add", "--pr", "5", "--path", "src/b.ts"])
            .args(["--index", "3", "--text", "nit"])
            .assert()
            .success();

        atlas(&home)
            .args(["comment", "payload", "--pr", "5", "--path", "src/b.ts"])
            .args(["--index", "3", "--files", &files, "--commit", "def456"])
            .assert()
            .success()
            .stdout(predicate::str::contains("\"commit_id\": \"def456\""))
            .stdout(predicate::str::contains("\"line\": 12"));
    }

    #[test]
    fn test_comment_payload_without_comment_fails() {
        let home = TempDir::new().unwrap();
        let files = files_snapshot(home.path());
        atlas(&home)
            .args(["comment", "payload", "--pr", "5", "--path", "src/b.ts"])
            .args(["--index", "0", "--files", &files])
            .assert()
            .failure()
            .stderr(predicate::str::contains("no local comment"));
    }
}

mod config {
    use super::*;

    #[test]
    fn test_repo_slug_from_config_file() {
        let home = TempDir::new().unwrap();
        let files = files_snapshot(home.path());
        let config = write(
            home.path(),
            "atlas.toml",
            "[repo]\nowner = \"acme\"\nname = \"metrics\"\n",
        );
        atlas(&home)
            .args(["--config", &config, "comment", "add", "--pr", "5"])
            .args(["--path", "src/b.ts", "--index", "0", "--text", "hi"])
            .assert()
            .success();

        atlas(&home)
            .args(["--config", &config, "comment", "payload", "--pr", "5"])
            .args(["--path", "src/b.ts", "--index", "0", "--files", &files])
            .assert()
            .success()
            .stdout(predicate::str::contains("repos/acme/metrics/pulls/5/comments"));
    }

    #[test]
    fn test_missing_explicit_config_fails() {
        let home = TempDir::new().unwrap();
        atlas(&home)
            .args(["--config", "/nonexistent/atlas.toml", "parse", "-"])
            .write_stdin(PATCH)
            .assert()
            .failure();
    }
}

mod demo {
    use super::*;

    #[test]
    fn test_demo_quick() {
        let home = TempDir::new().unwrap();
        atlas(&home)
            .args(["demo", "--mode", "quick", "--instruction", "metrics.controller.ts"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Quick (researching)"))
            .stdout(predicate::str::contains("Quick read: metrics.controller.ts"))
            .stdout(predicate::str::contains("tab: Diff"));
    }

    #[test]
    fn test_demo_run_finishes_on_tests_tab() {
        let home = TempDir::new().unwrap();
        atlas(&home)
            .args(["demo", "--mode", "run"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Drafting Code (drafting)"))
            .stdout(predicate::str::contains("jest --coverage"))
            .stdout(predicate::str::contains("tab: Tests"))
            .stdout(predicate::str::contains("Ran all test suites."));
    }
}
