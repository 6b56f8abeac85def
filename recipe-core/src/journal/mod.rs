//! Bounded history of step transitions.
//!
//! [`TransitionJournal`] is an observer that keeps the most recent
//! transitions in a ring buffer so consoles and tests can look back at what
//! happened without holding on to every notification.

use core::fmt;

use heapless::{HistoryBuf, OldestOrdered};

use crate::observer::{ObserverFault, TransitionObserver};
use crate::recipes::{CompletionPolicy, StepDefinition, StepId};

/// Number of transitions retained in memory.
pub const JOURNAL_CAPACITY: usize = 32;

/// Sequential identifier assigned to each journal record.
pub type RecordId = u32;

/// What happened at a transition.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum JournalEvent {
    StepEntered {
        index: usize,
        step: StepId,
        policy: CompletionPolicy,
    },
    RecipeComplete,
}

impl fmt::Display for JournalEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JournalEvent::StepEntered {
                index,
                step,
                policy,
            } => write!(f, "entered {index} {step} [{policy}]"),
            JournalEvent::RecipeComplete => f.write_str("recipe complete"),
        }
    }
}

/// Journal entry stored in the ring buffer.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct JournalRecord {
    pub id: RecordId,
    pub event: JournalEvent,
}

/// Ring buffer of the latest transitions.
pub struct TransitionJournal<const CAPACITY: usize = JOURNAL_CAPACITY> {
    ring: HistoryBuf<JournalRecord, CAPACITY>,
    next_id: RecordId,
}

impl<const CAPACITY: usize> TransitionJournal<CAPACITY> {
    /// Creates an empty journal.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            ring: HistoryBuf::new(),
            next_id: 0,
        }
    }

    /// Returns the retained records in chronological order.
    pub fn oldest_first(&self) -> OldestOrdered<'_, JournalRecord> {
        self.ring.oldest_ordered()
    }

    /// Returns the most recent record, if any.
    pub fn latest(&self) -> Option<&JournalRecord> {
        self.ring.recent()
    }

    /// Returns the number of retained records.
    pub fn len(&self) -> usize {
        self.ring.len()
    }

    /// Returns `true` when nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.ring.is_empty()
    }

    /// Total records written, including those the ring has since dropped.
    pub fn total_recorded(&self) -> RecordId {
        self.next_id
    }

    /// Appends an event and returns its id.
    pub fn record(&mut self, event: JournalEvent) -> RecordId {
        let id = self.next_id;
        self.next_id = self.next_id.wrapping_add(1);
        self.ring.write(JournalRecord { id, event });
        id
    }
}

impl<const CAPACITY: usize> Default for TransitionJournal<CAPACITY> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const CAPACITY: usize> fmt::Debug for TransitionJournal<CAPACITY> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransitionJournal")
            .field("len", &self.ring.len())
            .field("total_recorded", &self.next_id)
            .finish()
    }
}

impl<const CAPACITY: usize> TransitionObserver for TransitionJournal<CAPACITY> {
    fn on_step_entered(&mut self, index: usize, step: &StepDefinition) -> Result<(), ObserverFault> {
        self.record(JournalEvent::StepEntered {
            index,
            step: step.id.clone(),
            policy: step.policy,
        });
        Ok(())
    }

    fn on_recipe_complete(&mut self) -> Result<(), ObserverFault> {
        self.record(JournalEvent::RecipeComplete);
        Ok(())
    }
}
