//! Start/stop/tick bookkeeping for timed steps.
//!
//! Interruption resets the count; it never pauses it. A sensor that keeps
//! starting and stopping without holding the full duration in one go never
//! finishes the step.

use core::time::Duration;

use crate::recipes::CompletionPolicy;

/// What the timer is currently counting for.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub enum TimerMode {
    /// Nothing is counting.
    #[default]
    Idle,
    /// Sensor-driven timer of a `TimeElapsed` step.
    Running,
    /// Automatic countdown of an `Auto` step, armed on step entry.
    Automatic,
}

/// Result of feeding a tick into the controller.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum TimerProgress {
    /// No timer was counting; the tick was dropped.
    Idle,
    /// Still short of the requirement.
    Counting { elapsed: Duration },
    /// The requirement has been met.
    Elapsed,
}

/// Timer shared by `TimeElapsed` and `Auto` steps.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct TimedActionController {
    mode: TimerMode,
    elapsed: Duration,
    required: Option<Duration>,
}

impl TimedActionController {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            mode: TimerMode::Idle,
            elapsed: Duration::ZERO,
            required: None,
        }
    }

    /// Prepares the controller for a freshly entered step. `Auto` steps start
    /// counting immediately; `TimeElapsed` steps wait for [`Self::start`].
    pub fn arm_for(&mut self, policy: CompletionPolicy) {
        self.clear();
        match policy {
            CompletionPolicy::TimeElapsed(required) => {
                self.required = Some(required);
            }
            CompletionPolicy::Auto(required) => {
                self.required = Some(required);
                self.mode = TimerMode::Automatic;
            }
            CompletionPolicy::Instant | CompletionPolicy::ActionCount(_) => {}
        }
    }

    /// Starts the sensor-driven timer from zero. Returns `false` when it was
    /// already running or the armed step is not sensor-timed.
    pub fn start(&mut self) -> bool {
        if self.mode != TimerMode::Idle || self.required.is_none() {
            return false;
        }
        self.mode = TimerMode::Running;
        self.elapsed = Duration::ZERO;
        true
    }

    /// Stops the sensor-driven timer and discards the time it accumulated.
    pub fn stop(&mut self) -> Option<Duration> {
        if self.mode != TimerMode::Running {
            return None;
        }
        let discarded = self.elapsed;
        self.mode = TimerMode::Idle;
        self.elapsed = Duration::ZERO;
        Some(discarded)
    }

    /// Adds `delta` to whichever timer is counting.
    pub fn advance(&mut self, delta: Duration) -> TimerProgress {
        let Some(required) = self.required else {
            return TimerProgress::Idle;
        };
        if self.mode == TimerMode::Idle {
            return TimerProgress::Idle;
        }

        self.elapsed = self.elapsed.saturating_add(delta);
        if self.elapsed >= required {
            TimerProgress::Elapsed
        } else {
            TimerProgress::Counting {
                elapsed: self.elapsed,
            }
        }
    }

    /// Returns to idle and forgets the armed requirement.
    pub fn clear(&mut self) {
        *self = Self::new();
    }

    pub const fn mode(&self) -> TimerMode {
        self.mode
    }

    /// `true` only for the sensor-driven timer.
    pub fn is_running(&self) -> bool {
        self.mode == TimerMode::Running
    }

    pub const fn elapsed(&self) -> Duration {
        self.elapsed
    }

    pub const fn required(&self) -> Option<Duration> {
        self.required
    }

    /// Time still needed, when a requirement is armed.
    pub fn remaining(&self) -> Option<Duration> {
        self.required
            .map(|required| required.saturating_sub(self.elapsed))
    }
}
