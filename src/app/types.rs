use serde::Serialize;
use std::fmt;
use std::time::Instant;

use crate::diff::DiffLine;

/// Center panel view
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Tab {
    #[default]
    Diff,
    Source,
    Tests,
}

/// What the center panel shows for the current tab
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TabContent<'a> {
    /// Parsed rows of the selected file
    Diff(&'a [DiffLine]),
    Source(&'a str),
    Tests(&'a str),
}

/// Right-hand tool drawer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Tool {
    Activity,
    Comments,
    Changed,
    Files,
    Terminal,
    Integrations,
    Settings,
}

/// Bottom-bar action mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Lightweight read without planning
    #[default]
    Quick,
    /// Plan before acting
    Think,
    /// Simulated autonomous run
    Run,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogKind {
    Planning,
    Researching,
    Executing,
    Drafting,
    User,
}

impl fmt::Display for LogKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LogKind::Planning => "planning",
            LogKind::Researching => "researching",
            LogKind::Executing => "executing",
            LogKind::Drafting => "drafting",
            LogKind::User => "user",
        };
        f.write_str(s)
    }
}

/// One group in the activity log
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogEntry {
    pub kind: LogKind,
    pub title: String,
    pub items: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
    /// Local time, HH:MM
    pub ts: String,
}

impl LogEntry {
    pub fn new(kind: LogKind, title: &str) -> Self {
        Self {
            kind,
            title: title.to_string(),
            items: Vec::new(),
            text: None,
            output: None,
            ts: chrono::Local::now().format("%H:%M").to_string(),
        }
    }

    pub fn items<I, S>(mut self, items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.items = items.into_iter().map(Into::into).collect();
        self
    }

    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    /// Set `text` from a user instruction, skipping blank instructions.
    pub fn text_if(self, instruction: &str, format: impl FnOnce(&str) -> String) -> Self {
        let instruction = instruction.trim();
        if instruction.is_empty() {
            self
        } else {
            self.text(format(instruction))
        }
    }

    pub fn output(mut self, output: impl Into<String>) -> Self {
        self.output = Some(output.into());
        self
    }

    /// Entry stamped with the time it's appended rather than when it was built.
    pub(super) fn restamped(mut self) -> Self {
        self.ts = chrono::Local::now().format("%H:%M").to_string();
        self
    }
}

/// What a delayed timeline step does when it comes due.
#[derive(Debug, Clone)]
pub(super) enum StepAction {
    Append(LogEntry),
    /// Append, then bring the Tests tab forward
    AppendAndShowTests(LogEntry),
}

#[derive(Debug, Clone)]
pub(super) struct ScheduledStep {
    pub due: Instant,
    pub action: StepAction,
}
