use std::time::{Duration, Instant};
use tracing::debug;

use crate::fixtures;

use super::types::*;
use super::ViewModel;

/// Delay before the simulated run starts drafting
pub const RUN_DRAFTING_DELAY: Duration = Duration::from_millis(600);
/// Delay before the simulated run reports test results
pub const RUN_TESTS_DELAY: Duration = Duration::from_millis(1200);

impl ViewModel {
    /// Trigger a bottom-bar mode with the user's instruction.
    ///
    /// Quick and Think append one entry right away. Run appends its first
    /// entry now and schedules the rest relative to `now`; `tick` applies them.
    pub fn handle_mode(&mut self, mode: Mode, instruction: &str, now: Instant) {
        self.mode = mode;
        match mode {
            Mode::Quick => self.push_log(fixtures::quick_entry(instruction)),
            Mode::Think => self.push_log(fixtures::think_entry(instruction)),
            Mode::Run => {
                self.push_log(fixtures::run_started_entry());
                self.schedule(
                    now + RUN_DRAFTING_DELAY,
                    StepAction::Append(fixtures::run_drafting_entry()),
                );
                self.schedule(
                    now + RUN_TESTS_DELAY,
                    StepAction::AppendAndShowTests(fixtures::run_tests_entry()),
                );
            }
        }
        debug!(?mode, scheduled = self.scheduled.len(), "handle_mode");
    }

    fn schedule(&mut self, due: Instant, action: StepAction) {
        self.scheduled.push(ScheduledStep { due, action });
        // 同時刻のステップは登録順を保つ
        self.scheduled.sort_by_key(|step| step.due);
    }

    /// Apply every scheduled step due at `now`, oldest first. Returns how many ran.
    pub fn tick(&mut self, now: Instant) -> usize {
        let due = self.scheduled.partition_point(|step| step.due <= now);
        let steps: Vec<ScheduledStep> = self.scheduled.drain(..due).collect();
        let ran = steps.len();

        for step in steps {
            match step.action {
                StepAction::Append(entry) => self.push_log(entry.restamped()),
                StepAction::AppendAndShowTests(entry) => {
                    self.push_log(entry.restamped());
                    self.tab = Tab::Tests;
                }
            }
        }
        ran
    }

    /// When the next scheduled step comes due.
    pub fn next_due(&self) -> Option<Instant> {
        self.scheduled.first().map(|step| step.due)
    }
}
