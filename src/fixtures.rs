//! Canned agent activity and sample review data.
//!
//! There is no agent behind the dashboard: its log entries, sample source and
//! test output come from here.

use crate::app::{LogEntry, LogKind};
use crate::diff;
use crate::github::{Comparison, DiffFile, FileStatus, IssueComment, User};

pub const SAMPLE_FILE_PATH: &str = "apps/api/src/modules/metrics/metrics.controller.ts";

pub const SAMPLE_PATCH: &str = r#"@@ -12,3 +12,3 @@ export class MetricsController {
 function ensureRequestId(headers: Headers) {
-  headers.set("X-Request-ID", `req_${Date.now()}_${Math.random().toString(36).slice(2)}`);
+  headers.set("X-Request-Id", `req_${Date.now()}_${Math.random().toString(36).slice(2)}`);
 }
@@ -16,4 +16,4 @@
 async function forward(req: NextRequest, method: string, body?: BodyInit | null) {
   const url = new URL(req.url);
   const target = new URL(makeTargetUrl(url.pathname));
   target.search = url.search;
@@ -21,1 +21,4 @@
   const hdrs = new Headers(req.headers);
+  // Attach JWT from cookie
+  const tok = cookies().get("token")?.value;
+  if (tok) hdrs.set("Authorization", `Bearer ${tok}`);
@@ -26,4 +26,4 @@
   // Remove host header to avoid mismatch
-  hdrs.set("host", url.hostname);
+  hdrs.delete("host");
   return fetch(target, { method, headers: hdrs, body });
 }"#;

pub const SAMPLE_SOURCE: &str = r#"function ensureRequestId(headers: Headers) {
  headers.set("X-Request-Id", `req_${Date.now()}_${Math.random().toString(36).slice(2)}`);
}

async function forward(req: NextRequest, method: string, body?: BodyInit | null) {
  const url = new URL(req.url);
  const target = new URL(makeTargetUrl(url.pathname));
  target.search = url.search;

  const hdrs = new Headers(req.headers);
  // Attach JWT from cookie
  const tok = cookies().get("token")?.value;
  if (tok) hdrs.set("Authorization", `Bearer ${tok}`);

  // Remove host header to avoid mismatch
  hdrs.delete("host");

  return fetch(target, { method, headers: hdrs, body });
}"#;

pub const TEST_SUMMARY: &str =
    "Test Suites: 12 passed, 0 failed | Tests: 87 passed, 0 failed | Coverage: 92.3% statements";

pub const TEST_OUTPUT: &str = " PASS  apps/api/tests/metrics.controller.spec.ts
  MetricsController
    ✓ ensures request id is set (7 ms)
    ✓ forwards with jwt from cookie (4 ms)
    ✓ removes mismatched host header (3 ms)

 PASS  apps/web/tests/proxy.spec.ts
  proxy
    ✓ passes through auth header (3 ms)

Ran all test suites.";

/// Activity log shown before the user does anything.
pub fn initial_logs() -> Vec<LogEntry> {
    vec![
        LogEntry::new(LogKind::Planning, "Planning").items([
            "1) Identify root cause in metrics.controller.ts",
            "2) Implement header fix for Request ID typo",
            "3) Ensure JWT is attached from cookie for proxy",
            "4) Remove mismatched host header",
            "5) Run unit tests and update docs",
        ]),
        LogEntry::new(LogKind::Researching, "Researching").items([
            "Reading README.md",
            "Scanning prometheus/prometheus.yml",
            "Reviewing apps/web/src/lib/api.ts",
        ]),
        LogEntry::new(LogKind::Executing, "Executing")
            .items(["npm install", "jest --coverage"])
            .output(TEST_SUMMARY),
        LogEntry::new(LogKind::Drafting, "Drafting Code")
            .items(["Modifying metrics.controller.ts", "Updating /api/proxy.ts usage"]),
    ]
}

/// Lightweight read, no planning.
pub fn quick_entry(instruction: &str) -> LogEntry {
    LogEntry::new(LogKind::Researching, "Quick")
        .items(["Reading requested file(s)"])
        .text_if(instruction, |i| format!("Quick read: {}", i))
}

pub fn think_entry(instruction: &str) -> LogEntry {
    LogEntry::new(LogKind::Planning, "Planning")
        .items([
            "Break down task into substeps",
            "Search and read relevant files",
            "Draft patch and outline tests",
            "Run validation steps",
        ])
        .text_if(instruction, |i| format!("User instruction: {}", i))
}

pub fn run_started_entry() -> LogEntry {
    LogEntry::new(LogKind::Executing, "Executing")
        .items(["npm run lint", "npm run test -- --coverage"])
}

pub fn run_drafting_entry() -> LogEntry {
    LogEntry::new(LogKind::Drafting, "Drafting Code")
        .items(["Applying diff to metrics.controller.ts"])
}

pub fn run_tests_entry() -> LogEntry {
    LogEntry::new(LogKind::Executing, "Executing")
        .items(["jest --coverage"])
        .output(TEST_SUMMARY)
}

/// Changed files of the sample branch; only the controller carries a patch.
pub fn sample_comparison() -> Comparison {
    let (additions, deletions) = diff::count_changes(&diff::parse_patch(Some(SAMPLE_PATCH)));
    let file = |filename: &str, status, additions, deletions, patch: Option<&str>| DiffFile {
        filename: filename.to_string(),
        status,
        additions,
        deletions,
        changes: additions + deletions,
        patch: patch.map(str::to_string),
        previous_filename: None,
    };

    Comparison {
        head_sha: Some("6dcb09b5b57875f334f61aebed695e2e4193db5e".to_string()),
        files: vec![
            file(
                SAMPLE_FILE_PATH,
                FileStatus::Modified,
                additions,
                deletions,
                Some(SAMPLE_PATCH),
            ),
            file("apps/web/src/lib/api.ts", FileStatus::Modified, 5, 1, None),
            file("prometheus/prometheus.yml", FileStatus::Added, 27, 0, None),
        ],
    }
}

pub fn sample_issue_comments() -> Vec<IssueComment> {
    let comment = |id, login: &str, body: &str| IssueComment {
        id,
        body: body.to_string(),
        user: User {
            login: login.to_string(),
        },
        created_at: String::new(),
        html_url: None,
    };
    vec![
        comment(
            101,
            "reviewer-1",
            "Can we rename X-Request-ID to X-Request-Id consistently?",
        ),
        comment(
            102,
            "teammate-2",
            "Looks good. Please confirm the JWT attach logic for subrequests.",
        ),
    ]
}
