//! Shared status surface for the console.
//!
//! [`StatusSnapshot`] copies everything the `status` command reports out of
//! a sequencer so the text can be rendered after the borrow ends.
//! [`StatusFormatter`] keeps the rendering consistent across hosts.

use core::fmt;
use core::time::Duration;

use crate::observer::TransitionObserver;
use crate::recipes::{CompletionPolicy, Label, SideEffectTag, StepId, StepText, write_duration};
use crate::sequencer::{Diagnostics, SequencerSnapshot, StepSequencer, TimerMode};

/// The step the sequencer is waiting on.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CurrentStep {
    pub id: StepId,
    pub description: StepText,
    pub utensil: Label,
    pub policy: CompletionPolicy,
    pub side_effect: Option<SideEffectTag>,
}

/// Snapshot of the status information surfaced by the console.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StatusSnapshot {
    pub recipe: Label,
    pub sequencer: SequencerSnapshot,
    /// `None` once the recipe is complete.
    pub step: Option<CurrentStep>,
    pub diagnostics: Diagnostics,
}

impl StatusSnapshot {
    /// Captures the current state of `sequencer`.
    #[must_use]
    pub fn capture<O: TransitionObserver>(sequencer: &StepSequencer<O>) -> Self {
        Self {
            recipe: sequencer.recipe().label().clone(),
            sequencer: sequencer.snapshot(),
            step: sequencer.current_step().ok().map(|step| CurrentStep {
                id: step.id.clone(),
                description: step.description.clone(),
                utensil: step.utensil.clone(),
                policy: step.policy,
                side_effect: step.side_effect.clone(),
            }),
            diagnostics: *sequencer.diagnostics(),
        }
    }
}

/// Helper that renders a [`StatusSnapshot`] into human-readable lines.
#[derive(Clone, Copy, Debug)]
pub struct StatusFormatter<'a> {
    snapshot: &'a StatusSnapshot,
}

impl<'a> StatusFormatter<'a> {
    /// Creates a new formatter for the provided snapshot.
    #[must_use]
    pub const fn new(snapshot: &'a StatusSnapshot) -> Self {
        Self { snapshot }
    }

    /// Writes the position line (e.g. `recipe jollof-rice step 4/8`).
    pub fn write_recipe_line<W: fmt::Write>(&self, writer: &mut W) -> fmt::Result {
        let position = &self.snapshot.sequencer;
        write!(writer, "recipe {}", self.snapshot.recipe)?;
        if position.complete {
            write!(writer, " complete ({} steps)", position.step_count)
        } else {
            write!(writer, " step {}/{}", position.index + 1, position.step_count)
        }
    }

    /// Writes the current step line (e.g. `step grind-paste utensil=Pestle policy=actions(5)`).
    pub fn write_step_line<W: fmt::Write>(&self, writer: &mut W) -> fmt::Result {
        let Some(step) = &self.snapshot.step else {
            return writer.write_str("step none");
        };

        write!(
            writer,
            "step {} utensil={} policy={}",
            step.id, step.utensil, step.policy
        )?;
        if let Some(effect) = &step.side_effect {
            write!(writer, " effect={effect}")?;
        }
        write!(writer, " \"{}\"", step.description)
    }

    /// Writes the progress line (e.g. `progress actions=2/5` or `progress timer=running 1.2s/5s`).
    pub fn write_progress_line<W: fmt::Write>(&self, writer: &mut W) -> fmt::Result {
        let Some(step) = &self.snapshot.step else {
            return writer.write_str("progress done");
        };
        let position = &self.snapshot.sequencer;

        writer.write_str("progress ")?;
        match step.policy {
            CompletionPolicy::Instant => writer.write_str("waiting for instant action"),
            CompletionPolicy::ActionCount(required) => {
                write!(writer, "actions={}/{required}", position.action_tally)
            }
            CompletionPolicy::TimeElapsed(required) | CompletionPolicy::Auto(required) => {
                writer.write_str("timer=")?;
                writer.write_str(match position.timer_mode {
                    TimerMode::Idle => "idle",
                    TimerMode::Running => "running",
                    TimerMode::Automatic => "auto",
                })?;
                writer.write_char(' ')?;
                write_elapsed(writer, position.timer_elapsed)?;
                writer.write_char('/')?;
                write_duration(writer, required)
            }
        }
    }

    /// Writes the diagnostics line (e.g. `diagnostics mismatches=1 ignored=0 observer-faults=0`).
    pub fn write_diagnostics_line<W: fmt::Write>(&self, writer: &mut W) -> fmt::Result {
        let diagnostics = &self.snapshot.diagnostics;
        write!(
            writer,
            "diagnostics mismatches={} ignored={} observer-faults={}",
            diagnostics.policy_mismatches,
            diagnostics.ignored_after_complete,
            diagnostics.observer_faults
        )?;
        if let Some(mismatch) = &diagnostics.last_mismatch {
            write!(writer, " last=\"{mismatch}\"")?;
        }
        Ok(())
    }

    /// Writes every status line, newline separated.
    pub fn write_all<W: fmt::Write>(&self, writer: &mut W) -> fmt::Result {
        self.write_recipe_line(writer)?;
        writer.write_char('\n')?;
        self.write_step_line(writer)?;
        writer.write_char('\n')?;
        self.write_progress_line(writer)?;
        writer.write_char('\n')?;
        self.write_diagnostics_line(writer)
    }
}

/// Tenths of a second, or the exact value while under a tenth.
fn write_elapsed<W: fmt::Write>(writer: &mut W, value: Duration) -> fmt::Result {
    if !value.is_zero() && value < Duration::from_millis(100) {
        return write_duration(writer, value);
    }
    let tenths = value.subsec_millis() / 100;
    write!(writer, "{}.{tenths}s", value.as_secs())
}
