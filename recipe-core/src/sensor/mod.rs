//! Helpers implementing the progress-source contract.
//!
//! Scene objects (cutting boards, pestles, fire pits) translate physical
//! events into sequencer calls. Before reporting they check that the step
//! they are bound to is current and that its completion policy is one they
//! can drive; anything else is suppressed locally and never reaches the
//! sequencer. [`ContactSensor`] also collapses the many colliders of one
//! body into a single contact and makes sure an exit only undoes work on
//! the step its enter counted toward.

use heapless::Vec;
use tracing::debug;

use crate::observer::TransitionObserver;
use crate::recipes::{CompletionPolicy, Label, Recipe, StepId};
use crate::sequencer::{StepEpoch, StepOutcome, StepSequencer};

/// Most bodies one zone tracks at once.
pub const MAX_TRACKED_CONTACTS: usize = 8;

/// Identifier of the root body behind a contact. Every collider attached to
/// the same body reports the same id.
pub type ContactId = u32;

/// Which sequencer calls a sensor makes.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum SensorKind {
    /// Completes an `Instant` step.
    Instant,
    /// Counts toward an `ActionCount` step; exits undo.
    Actions,
    /// Runs the timer of a `TimeElapsed` step while occupied.
    Seconds,
}

impl SensorKind {
    /// `true` when this kind of sensor can drive `policy`.
    #[must_use]
    pub const fn drives(self, policy: CompletionPolicy) -> bool {
        matches!(
            (self, policy),
            (SensorKind::Instant, CompletionPolicy::Instant)
                | (SensorKind::Actions, CompletionPolicy::ActionCount(_))
                | (SensorKind::Seconds, CompletionPolicy::TimeElapsed(_))
        )
    }
}

/// Reason a sensor kept a report to itself.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Suppression {
    /// Nothing left to progress.
    RecipeComplete,
    /// The bound step is not current, or the step an enter counted toward
    /// has already been left.
    WrongStep,
    /// The current policy is not one this sensor drives.
    WrongPolicy,
    /// The body does not carry the tag the zone requires.
    WrongTag,
    /// Every contact slot is taken.
    ContactOverflow,
    /// Other contacts still hold the timer.
    ContactsRemain,
    /// Instant sensors do nothing on exit.
    NoExitAction,
}

/// What a sensor did with a physical event.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum SensorOutcome {
    /// Forwarded to the sequencer.
    Reported(StepOutcome),
    /// Kept back for the given reason.
    Suppressed(Suppression),
    /// Another collider of a body already inside the zone.
    Duplicate,
    /// Exit from a body the zone never counted.
    Untracked,
}

/// Returned when a binding names a step the recipe does not have.
#[derive(Copy, Clone, Debug, Eq, PartialEq, thiserror::Error)]
pub enum BindingError {
    #[error("recipe has no step with that id")]
    UnknownStep,
}

/// Step a sensor is responsible for.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SensorBinding {
    step: Option<StepId>,
    kind: SensorKind,
}

impl SensorBinding {
    /// Binds to a single step id.
    #[must_use]
    pub fn new(step: StepId, kind: SensorKind) -> Self {
        Self {
            step: Some(step),
            kind,
        }
    }

    /// Waives the id check: the sensor drives whichever step is current as
    /// long as its policy matches (the pestle that pounds every fufu round).
    #[must_use]
    pub const fn any_step(kind: SensorKind) -> Self {
        Self { step: None, kind }
    }

    /// Binds to `step_id` after checking that `recipe` contains it.
    pub fn bind(recipe: &Recipe, step_id: &str, kind: SensorKind) -> Result<Self, BindingError> {
        let step = recipe
            .step_by_id(step_id)
            .ok_or(BindingError::UnknownStep)?;
        Ok(Self::new(step.id.clone(), kind))
    }

    #[must_use]
    pub const fn kind(&self) -> SensorKind {
        self.kind
    }

    /// Bound step id, `None` for waived bindings.
    #[must_use]
    pub fn step(&self) -> Option<&str> {
        self.step.as_ref().map(StepId::as_str)
    }

    /// Checks the current step against this binding.
    pub fn accepts<O>(&self, sequencer: &StepSequencer<O>) -> Result<(), Suppression>
    where
        O: TransitionObserver,
    {
        let current = sequencer
            .current_step()
            .map_err(|_| Suppression::RecipeComplete)?;

        if let Some(bound) = &self.step
            && *bound != current.id
        {
            return Err(Suppression::WrongStep);
        }

        if !self.kind.drives(current.policy) {
            return Err(Suppression::WrongPolicy);
        }

        Ok(())
    }

    /// One-shot report (a knife cut, a pestle hit). Seconds sensors start
    /// the timer.
    pub fn try_progress<O>(&self, sequencer: &mut StepSequencer<O>) -> SensorOutcome
    where
        O: TransitionObserver,
    {
        if let Err(reason) = self.accepts(sequencer) {
            debug!(?reason, step = self.step(), "sensor report suppressed");
            return SensorOutcome::Suppressed(reason);
        }
        SensorOutcome::Reported(self.report(sequencer))
    }

    fn report<O>(&self, sequencer: &mut StepSequencer<O>) -> StepOutcome
    where
        O: TransitionObserver,
    {
        match self.kind {
            SensorKind::Instant => sequencer.report_instant_action(),
            SensorKind::Actions => sequencer.report_action(),
            SensorKind::Seconds => sequencer.report_timer_start(),
        }
    }
}

/// Body touching a zone.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Contact<'a> {
    pub id: ContactId,
    pub tag: &'a str,
}

impl<'a> Contact<'a> {
    #[must_use]
    pub const fn new(id: ContactId, tag: &'a str) -> Self {
        Self { id, tag }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
struct TrackedContact {
    id: ContactId,
    epoch: StepEpoch,
}

/// Enter/exit zone sensor.
///
/// Enters report an instant action, an action or a timer start depending on
/// the sensor kind. Exits undo one action for `Actions` sensors (waived
/// bindings included) and stop the timer for `Seconds` sensors once the
/// last body leaves. Exits are only forwarded while the step the matching
/// enter counted toward is still current.
#[derive(Clone, Debug)]
pub struct ContactSensor<const N: usize = MAX_TRACKED_CONTACTS> {
    binding: SensorBinding,
    required_tag: Option<Label>,
    contacts: Vec<TrackedContact, N>,
}

impl<const N: usize> ContactSensor<N> {
    #[must_use]
    pub fn new(binding: SensorBinding) -> Self {
        Self {
            binding,
            required_tag: None,
            contacts: Vec::new(),
        }
    }

    /// Only bodies carrying `tag` count. Returns `None` when the tag is too
    /// long to store.
    #[must_use]
    pub fn with_required_tag(mut self, tag: &str) -> Option<Self> {
        let mut label = Label::new();
        label.push_str(tag).ok()?;
        self.required_tag = Some(label);
        Some(self)
    }

    #[must_use]
    pub const fn binding(&self) -> &SensorBinding {
        &self.binding
    }

    /// Number of bodies currently inside the zone.
    #[must_use]
    pub fn occupancy(&self) -> usize {
        self.contacts.len()
    }

    /// `true` when the body is already inside the zone.
    #[must_use]
    pub fn is_tracking(&self, id: ContactId) -> bool {
        self.contacts.iter().any(|contact| contact.id == id)
    }

    /// Forgets every tracked body. Stale contacts are harmless after a
    /// restart, this only frees their slots.
    pub fn clear(&mut self) {
        self.contacts.clear();
    }

    /// A collider entered the zone.
    pub fn enter<O>(&mut self, sequencer: &mut StepSequencer<O>, contact: Contact<'_>) -> SensorOutcome
    where
        O: TransitionObserver,
    {
        if let Some(required) = &self.required_tag
            && required.as_str() != contact.tag
        {
            return SensorOutcome::Suppressed(Suppression::WrongTag);
        }

        if self.is_tracking(contact.id) {
            return SensorOutcome::Duplicate;
        }

        if let Err(reason) = self.binding.accepts(sequencer) {
            debug!(contact = contact.id, ?reason, "contact enter suppressed");
            return SensorOutcome::Suppressed(reason);
        }

        let tracked = TrackedContact {
            id: contact.id,
            epoch: sequencer.current_epoch(),
        };
        if self.contacts.push(tracked).is_err() {
            return SensorOutcome::Suppressed(Suppression::ContactOverflow);
        }

        SensorOutcome::Reported(self.binding.report(sequencer))
    }

    /// A body left the zone.
    pub fn exit<O>(&mut self, sequencer: &mut StepSequencer<O>, id: ContactId) -> SensorOutcome
    where
        O: TransitionObserver,
    {
        let Some(position) = self.contacts.iter().position(|contact| contact.id == id) else {
            return SensorOutcome::Untracked;
        };
        let tracked = self.contacts.swap_remove(position);

        if sequencer.is_complete() {
            return SensorOutcome::Suppressed(Suppression::RecipeComplete);
        }
        if tracked.epoch != sequencer.current_epoch() {
            debug!(contact = id, "contact left after its step was left");
            return SensorOutcome::Suppressed(Suppression::WrongStep);
        }

        match self.binding.kind {
            SensorKind::Instant => SensorOutcome::Suppressed(Suppression::NoExitAction),
            SensorKind::Actions => SensorOutcome::Reported(sequencer.report_action_undo()),
            SensorKind::Seconds => {
                let holding = self
                    .contacts
                    .iter()
                    .any(|contact| contact.epoch == tracked.epoch);
                if holding {
                    SensorOutcome::Suppressed(Suppression::ContactsRemain)
                } else {
                    SensorOutcome::Reported(sequencer.report_timer_stop())
                }
            }
        }
    }
}
