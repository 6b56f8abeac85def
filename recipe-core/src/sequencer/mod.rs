//! Step sequencer state machine.
//!
//! [`StepSequencer`] owns the progression state of one recipe session: the
//! current step index, the action tally and the step timer. Every public
//! operation is a single transaction that either leaves the step in place
//! (possibly updating the tally or timer) or runs the transition protocol:
//!
//! 1. reset the tally and stop the timer,
//! 2. move to the next index,
//! 3. on the last step, mark the recipe complete and notify once,
//! 4. otherwise arm the new step and notify observers that it was entered.
//!
//! Observers are notified after the state has been committed, so a failing
//! observer cannot leave the sequencer half-transitioned. Calls arriving
//! after completion are ignored until the sequencer is reset.

use core::fmt;
use core::time::Duration;

use tracing::{debug, info, trace, warn};

use crate::observer::{NoopObserver, ObserverFault, TransitionObserver};
use crate::recipes::{CompletionPolicy, PolicyKind, Recipe, StepDefinition, StepId};

pub mod events;
pub mod timer;

pub use events::{
    DEFAULT_QUEUE_CAPACITY, DequeueError, EnqueueError, ProgressEvent, ProgressQueue,
    ProgressQueueConsumer, ProgressQueueProducer,
};
pub use timer::{TimedActionController, TimerMode, TimerProgress};

/// Inbound operation named in diagnostics.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Operation {
    InstantAction,
    Action,
    ActionUndo,
    TimerStart,
    TimerStop,
    CompleteStep,
}

impl Operation {
    pub const fn as_str(self) -> &'static str {
        match self {
            Operation::InstantAction => "instant action",
            Operation::Action => "action",
            Operation::ActionUndo => "action undo",
            Operation::TimerStart => "timer start",
            Operation::TimerStop => "timer stop",
            Operation::CompleteStep => "complete step",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A report that does not fit the current step's completion policy.
#[derive(Copy, Clone, Debug, Eq, PartialEq, thiserror::Error)]
#[error("{operation} does not apply to step {index} ({policy} completion)")]
pub struct PolicyMismatch {
    pub operation: Operation,
    pub index: usize,
    pub policy: PolicyKind,
}

/// Returned by [`StepSequencer::current_step`] once the recipe is complete.
#[derive(Copy, Clone, Debug, Eq, PartialEq, thiserror::Error)]
#[error("recipe complete: no step at index {index} of {len}")]
pub struct OutOfRange {
    pub index: usize,
    pub len: usize,
}

/// Why an operation left the sequencer untouched.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum NoChange {
    /// The recipe is already complete.
    Terminal,
    /// The report does not apply to the current policy.
    PolicyMismatch,
    /// Timer start while the timer is already running.
    AlreadyRunning,
    /// Timer stop while nothing is running.
    NotRunning,
    /// Undo with the tally already at zero.
    AtFloor,
    /// Tick with no timer counting.
    Idle,
}

/// What a mutating operation did.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum StepOutcome {
    /// Nothing changed.
    Unchanged(NoChange),
    /// The tally or timer changed; the step is still current.
    Progressed,
    /// Step `index` was entered.
    Advanced { index: usize },
    /// The last step completed.
    RecipeComplete,
}

impl StepOutcome {
    /// `true` when the operation ran the transition protocol.
    #[must_use]
    pub const fn is_transition(self) -> bool {
        matches!(
            self,
            StepOutcome::Advanced { .. } | StepOutcome::RecipeComplete
        )
    }
}

/// Counters describing ignored or failed work. They survive resets so a
/// host can inspect a whole session.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct Diagnostics {
    pub policy_mismatches: u32,
    pub ignored_after_complete: u32,
    pub observer_faults: u32,
    pub last_mismatch: Option<PolicyMismatch>,
}

/// Read-only view of the sequencer state.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct SequencerSnapshot {
    pub index: usize,
    pub step_count: usize,
    pub action_tally: u32,
    pub timer_mode: TimerMode,
    pub timer_elapsed: Duration,
    pub complete: bool,
}

impl SequencerSnapshot {
    /// `true` while the sensor-driven timer is counting.
    #[must_use]
    pub fn timer_running(&self) -> bool {
        self.timer_mode == TimerMode::Running
    }

    /// Steps left including the current one.
    #[must_use]
    pub const fn remaining_steps(&self) -> usize {
        self.step_count.saturating_sub(self.index)
    }
}

/// Totals returned by [`StepSequencer::drain`].
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct DrainSummary {
    /// Events applied.
    pub applied: usize,
    /// Events that ran the transition protocol.
    pub transitions: usize,
    /// Outcome of the last applied event.
    pub last: Option<StepOutcome>,
}

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
struct SequencerState {
    current_index: usize,
    action_tally: u32,
    timer: TimedActionController,
}

/// Counts step entries over the sequencer's lifetime. Unlike the step
/// index it never repeats, so it tells a restarted step 0 apart from the
/// previous run's step 0.
pub type StepEpoch = u64;

/// Drives one recipe from its first step to completion.
pub struct StepSequencer<O = NoopObserver> {
    recipe: Recipe,
    state: SequencerState,
    epoch: StepEpoch,
    diagnostics: Diagnostics,
    observers: O,
}

impl StepSequencer<NoopObserver> {
    /// Creates a sequencer without observers.
    #[must_use]
    pub fn new(recipe: Recipe) -> Self {
        Self::with_observers(recipe, NoopObserver)
    }
}

impl<O> StepSequencer<O>
where
    O: TransitionObserver,
{
    /// Creates a sequencer positioned on step 0. Observers are not told
    /// about step 0 until [`Self::announce_current_step`] is called.
    #[must_use]
    pub fn with_observers(recipe: Recipe, observers: O) -> Self {
        let mut sequencer = Self {
            recipe,
            state: SequencerState::default(),
            epoch: 0,
            diagnostics: Diagnostics::default(),
            observers,
        };
        sequencer.arm_current();
        sequencer
    }

    /// Reports a one-shot event. Only valid on an `Instant` step.
    pub fn report_instant_action(&mut self) -> StepOutcome {
        let Some(policy) = self.active_policy() else {
            return self.ignore_after_complete(Operation::InstantAction);
        };
        if policy != CompletionPolicy::Instant {
            return self.mismatch(Operation::InstantAction, policy);
        }
        self.advance()
    }

    /// Counts one discrete action toward an `ActionCount` step.
    pub fn report_action(&mut self) -> StepOutcome {
        let Some(policy) = self.active_policy() else {
            return self.ignore_after_complete(Operation::Action);
        };
        let CompletionPolicy::ActionCount(required) = policy else {
            return self.mismatch(Operation::Action, policy);
        };

        self.state.action_tally = self.state.action_tally.saturating_add(1);
        debug!(
            index = self.state.current_index,
            tally = self.state.action_tally,
            required,
            "action recorded"
        );

        if self.state.action_tally >= required {
            self.advance()
        } else {
            StepOutcome::Progressed
        }
    }

    /// Takes one action back, never going below zero.
    pub fn report_action_undo(&mut self) -> StepOutcome {
        if self.is_complete() {
            return self.ignore_after_complete(Operation::ActionUndo);
        }
        if self.state.action_tally == 0 {
            return StepOutcome::Unchanged(NoChange::AtFloor);
        }

        self.state.action_tally -= 1;
        debug!(
            index = self.state.current_index,
            tally = self.state.action_tally,
            "action undone"
        );
        StepOutcome::Progressed
    }

    /// Starts the timer of a `TimeElapsed` step. Repeated starts while it is
    /// running are ignored.
    pub fn report_timer_start(&mut self) -> StepOutcome {
        let Some(policy) = self.active_policy() else {
            return self.ignore_after_complete(Operation::TimerStart);
        };
        if !matches!(policy, CompletionPolicy::TimeElapsed(_)) {
            return self.mismatch(Operation::TimerStart, policy);
        }

        if self.state.timer.start() {
            debug!(index = self.state.current_index, "timer started");
            StepOutcome::Progressed
        } else {
            StepOutcome::Unchanged(NoChange::AlreadyRunning)
        }
    }

    /// Stops a running timer and throws its elapsed time away.
    pub fn report_timer_stop(&mut self) -> StepOutcome {
        if self.is_complete() {
            return self.ignore_after_complete(Operation::TimerStop);
        }

        match self.state.timer.stop() {
            Some(discarded) => {
                debug!(
                    index = self.state.current_index,
                    discarded = ?discarded,
                    "timer stopped"
                );
                StepOutcome::Progressed
            }
            None => StepOutcome::Unchanged(NoChange::NotRunning),
        }
    }

    /// Advances whichever timer is counting. Time beyond the requirement is
    /// not carried into the next step. Ticks after completion are dropped
    /// without touching the diagnostics since hosts tick every frame.
    pub fn tick(&mut self, delta: Duration) -> StepOutcome {
        if self.is_complete() {
            return StepOutcome::Unchanged(NoChange::Terminal);
        }

        match self.state.timer.advance(delta) {
            TimerProgress::Idle => StepOutcome::Unchanged(NoChange::Idle),
            TimerProgress::Counting { .. } => StepOutcome::Progressed,
            TimerProgress::Elapsed => self.advance(),
        }
    }

    /// Completes the current step regardless of its policy.
    pub fn complete_current_step(&mut self) -> StepOutcome {
        if self.is_complete() {
            return self.ignore_after_complete(Operation::CompleteStep);
        }
        self.advance()
    }

    /// Returns the current step, or [`OutOfRange`] once the recipe is done.
    pub fn current_step(&self) -> Result<&StepDefinition, OutOfRange> {
        self.recipe
            .step(self.state.current_index)
            .ok_or(OutOfRange {
                index: self.state.current_index,
                len: self.recipe.len(),
            })
    }

    /// Id of the current step, `None` once complete.
    pub fn current_step_id(&self) -> Option<&StepId> {
        self.current_step().ok().map(|step| &step.id)
    }

    /// Swaps in `recipe` and starts over from step 0.
    pub fn reset(&mut self, recipe: Recipe) -> StepOutcome {
        self.recipe = recipe;
        self.restart()
    }

    /// Starts the current recipe over from step 0 and announces it.
    pub fn restart(&mut self) -> StepOutcome {
        self.state = SequencerState::default();
        self.epoch = self.epoch.wrapping_add(1);
        self.arm_current();
        info!(recipe = self.recipe.name(), "recipe restarted");
        self.notify_entered(0);
        StepOutcome::Advanced { index: 0 }
    }

    /// Tells observers which step is current without transitioning.
    pub fn announce_current_step(&mut self) {
        self.notify_entered(self.state.current_index);
    }

    /// Routes a queued event to the matching operation.
    pub fn apply(&mut self, event: ProgressEvent) -> StepOutcome {
        match event {
            ProgressEvent::InstantAction => self.report_instant_action(),
            ProgressEvent::Action => self.report_action(),
            ProgressEvent::ActionUndo => self.report_action_undo(),
            ProgressEvent::TimerStart => self.report_timer_start(),
            ProgressEvent::TimerStop => self.report_timer_stop(),
            ProgressEvent::Tick(delta) => self.tick(delta),
            ProgressEvent::CompleteStep => self.complete_current_step(),
        }
    }

    /// Applies every waiting event in arrival order.
    pub fn drain<C>(&mut self, consumer: &mut C) -> Result<DrainSummary, DequeueError<C::Error>>
    where
        C: ProgressQueueConsumer,
    {
        let mut summary = DrainSummary::default();
        while let Some(event) = consumer.try_dequeue()? {
            let outcome = self.apply(event);
            summary.applied += 1;
            if outcome.is_transition() {
                summary.transitions += 1;
            }
            summary.last = Some(outcome);
        }
        Ok(summary)
    }

    #[must_use]
    pub fn snapshot(&self) -> SequencerSnapshot {
        SequencerSnapshot {
            index: self.state.current_index,
            step_count: self.recipe.len(),
            action_tally: self.state.action_tally,
            timer_mode: self.state.timer.mode(),
            timer_elapsed: self.state.timer.elapsed(),
            complete: self.is_complete(),
        }
    }

    #[must_use]
    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    #[must_use]
    pub fn recipe(&self) -> &Recipe {
        &self.recipe
    }

    #[must_use]
    pub fn current_index(&self) -> usize {
        self.state.current_index
    }

    /// Identifies the current step entry; changes on every advance and
    /// restart.
    #[must_use]
    pub fn current_epoch(&self) -> StepEpoch {
        self.epoch
    }

    #[must_use]
    pub fn action_tally(&self) -> u32 {
        self.state.action_tally
    }

    /// `true` while the sensor-driven timer of a `TimeElapsed` step counts.
    #[must_use]
    pub fn timer_running(&self) -> bool {
        self.state.timer.is_running()
    }

    #[must_use]
    pub fn timer(&self) -> &TimedActionController {
        &self.state.timer
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.state.current_index >= self.recipe.len()
    }

    pub fn observers(&self) -> &O {
        &self.observers
    }

    pub fn observers_mut(&mut self) -> &mut O {
        &mut self.observers
    }

    /// Consumes the sequencer and returns its observers.
    pub fn into_observers(self) -> O {
        self.observers
    }

    fn active_policy(&self) -> Option<CompletionPolicy> {
        self.recipe
            .step(self.state.current_index)
            .map(|step| step.policy)
    }

    fn arm_current(&mut self) {
        match self.recipe.step(self.state.current_index) {
            Some(step) => self.state.timer.arm_for(step.policy),
            None => self.state.timer.clear(),
        }
    }

    fn advance(&mut self) -> StepOutcome {
        self.state.action_tally = 0;
        self.state.timer.clear();
        self.state.current_index = (self.state.current_index + 1).min(self.recipe.len());
        self.epoch = self.epoch.wrapping_add(1);

        if self.is_complete() {
            info!(recipe = self.recipe.name(), "recipe complete");
            let result = self.observers.on_recipe_complete();
            self.record_fault(result);
            return StepOutcome::RecipeComplete;
        }

        let index = self.state.current_index;
        self.arm_current();
        self.notify_entered(index);
        StepOutcome::Advanced { index }
    }

    fn notify_entered(&mut self, index: usize) {
        let Some(step) = self.recipe.step(index) else {
            return;
        };
        info!(
            recipe = self.recipe.name(),
            index,
            step = %step.id,
            policy = %step.policy,
            "entered step"
        );
        let result = self.observers.on_step_entered(index, step);
        self.record_fault(result);
    }

    fn record_fault(&mut self, result: Result<(), ObserverFault>) {
        if let Err(fault) = result {
            self.diagnostics.observer_faults =
                self.diagnostics.observer_faults.saturating_add(fault.count());
            warn!(%fault, "transition observer failed");
        }
    }

    fn mismatch(&mut self, operation: Operation, policy: CompletionPolicy) -> StepOutcome {
        let mismatch = PolicyMismatch {
            operation,
            index: self.state.current_index,
            policy: policy.kind(),
        };
        self.diagnostics.policy_mismatches = self.diagnostics.policy_mismatches.saturating_add(1);
        self.diagnostics.last_mismatch = Some(mismatch);
        warn!(%mismatch, "progress report ignored");
        StepOutcome::Unchanged(NoChange::PolicyMismatch)
    }

    fn ignore_after_complete(&mut self, operation: Operation) -> StepOutcome {
        self.diagnostics.ignored_after_complete =
            self.diagnostics.ignored_after_complete.saturating_add(1);
        trace!(%operation, "recipe complete, report ignored");
        StepOutcome::Unchanged(NoChange::Terminal)
    }
}

impl<O> fmt::Debug for StepSequencer<O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StepSequencer")
            .field("recipe", &self.recipe.name())
            .field("state", &self.state)
            .field("epoch", &self.epoch)
            .field("diagnostics", &self.diagnostics)
            .finish_non_exhaustive()
    }
}
