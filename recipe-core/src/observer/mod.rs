//! Outbound transition notifications.
//!
//! The sequencer calls every registered [`TransitionObserver`] synchronously
//! after a transition has been committed. Observers only ever see a shared
//! reference to the step they are told about, so they cannot reach back into
//! the sequencer while it is notifying them. A failing observer reports an
//! [`ObserverFault`]; the fault is logged and counted by the sequencer and the
//! remaining observers are still notified.

use core::fmt;

use crate::recipes::StepDefinition;

#[cfg(feature = "alloc")]
use alloc::{boxed::Box, rc::Rc, vec::Vec};
#[cfg(feature = "alloc")]
use core::cell::RefCell;

/// Failure reported by an observer. Faults from several observers in one
/// fan-out merge into a single value that remembers how many occurred.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct ObserverFault {
    reason: &'static str,
    count: u32,
}

impl ObserverFault {
    /// Creates a single fault.
    #[must_use]
    pub const fn new(reason: &'static str) -> Self {
        Self { reason, count: 1 }
    }

    /// Reason given by the first failing observer.
    #[must_use]
    pub const fn reason(&self) -> &'static str {
        self.reason
    }

    /// Number of observers that failed.
    #[must_use]
    pub const fn count(&self) -> u32 {
        self.count
    }

    /// Folds `other` into this fault, keeping the first reason.
    #[must_use]
    pub const fn merge(self, other: Self) -> Self {
        Self {
            reason: self.reason,
            count: self.count.saturating_add(other.count),
        }
    }
}

impl fmt::Display for ObserverFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.reason)?;
        if self.count > 1 {
            write!(f, " (+{} more)", self.count - 1)?;
        }
        Ok(())
    }
}

impl core::error::Error for ObserverFault {}

/// Combines the results of two observers notified back to back.
pub fn merge_results(
    first: Result<(), ObserverFault>,
    second: Result<(), ObserverFault>,
) -> Result<(), ObserverFault> {
    match (first, second) {
        (Ok(()), Ok(())) => Ok(()),
        (Err(fault), Ok(())) | (Ok(()), Err(fault)) => Err(fault),
        (Err(first), Err(second)) => Err(first.merge(second)),
    }
}

/// Listener for step transitions.
pub trait TransitionObserver {
    /// Called after the sequencer entered step `index`.
    fn on_step_entered(&mut self, index: usize, step: &StepDefinition) -> Result<(), ObserverFault> {
        let _ = (index, step);
        Ok(())
    }

    /// Called once when the last step completes.
    fn on_recipe_complete(&mut self) -> Result<(), ObserverFault> {
        Ok(())
    }
}

/// Observer that ignores every notification.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct NoopObserver;

impl NoopObserver {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl TransitionObserver for NoopObserver {}

impl<T> TransitionObserver for &mut T
where
    T: TransitionObserver + ?Sized,
{
    fn on_step_entered(&mut self, index: usize, step: &StepDefinition) -> Result<(), ObserverFault> {
        (**self).on_step_entered(index, step)
    }

    fn on_recipe_complete(&mut self) -> Result<(), ObserverFault> {
        (**self).on_recipe_complete()
    }
}

impl<A, B> TransitionObserver for (A, B)
where
    A: TransitionObserver,
    B: TransitionObserver,
{
    fn on_step_entered(&mut self, index: usize, step: &StepDefinition) -> Result<(), ObserverFault> {
        let first = self.0.on_step_entered(index, step);
        merge_results(first, self.1.on_step_entered(index, step))
    }

    fn on_recipe_complete(&mut self) -> Result<(), ObserverFault> {
        let first = self.0.on_recipe_complete();
        merge_results(first, self.1.on_recipe_complete())
    }
}

impl<A, B, C> TransitionObserver for (A, B, C)
where
    A: TransitionObserver,
    B: TransitionObserver,
    C: TransitionObserver,
{
    fn on_step_entered(&mut self, index: usize, step: &StepDefinition) -> Result<(), ObserverFault> {
        let first = self.0.on_step_entered(index, step);
        let second = merge_results(first, self.1.on_step_entered(index, step));
        merge_results(second, self.2.on_step_entered(index, step))
    }

    fn on_recipe_complete(&mut self) -> Result<(), ObserverFault> {
        let first = self.0.on_recipe_complete();
        let second = merge_results(first, self.1.on_recipe_complete());
        merge_results(second, self.2.on_recipe_complete())
    }
}

#[cfg(feature = "alloc")]
impl<T> TransitionObserver for Box<T>
where
    T: TransitionObserver + ?Sized,
{
    fn on_step_entered(&mut self, index: usize, step: &StepDefinition) -> Result<(), ObserverFault> {
        (**self).on_step_entered(index, step)
    }

    fn on_recipe_complete(&mut self) -> Result<(), ObserverFault> {
        (**self).on_recipe_complete()
    }
}

/// Shared observers let the host keep a handle for inspection. A handle that
/// is already borrowed when a notification arrives counts as a fault.
#[cfg(feature = "alloc")]
impl<T> TransitionObserver for Rc<RefCell<T>>
where
    T: TransitionObserver + ?Sized,
{
    fn on_step_entered(&mut self, index: usize, step: &StepDefinition) -> Result<(), ObserverFault> {
        self.try_borrow_mut()
            .map_err(|_| ObserverFault::new(SHARED_OBSERVER_BUSY))?
            .on_step_entered(index, step)
    }

    fn on_recipe_complete(&mut self) -> Result<(), ObserverFault> {
        self.try_borrow_mut()
            .map_err(|_| ObserverFault::new(SHARED_OBSERVER_BUSY))?
            .on_recipe_complete()
    }
}

#[cfg(feature = "alloc")]
const SHARED_OBSERVER_BUSY: &str = "shared observer is borrowed elsewhere";

/// Handle returned by [`ObserverList::subscribe`].
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct SubscriptionId(u32);

/// Dynamic observer registry notified in subscription order.
#[cfg(feature = "alloc")]
#[derive(Default)]
pub struct ObserverList {
    next_id: u32,
    entries: Vec<(SubscriptionId, Box<dyn TransitionObserver>)>,
}

#[cfg(feature = "alloc")]
impl ObserverList {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            next_id: 0,
            entries: Vec::new(),
        }
    }

    /// Appends an observer; it is notified after every earlier subscriber.
    pub fn subscribe<T>(&mut self, observer: T) -> SubscriptionId
    where
        T: TransitionObserver + 'static,
    {
        let id = SubscriptionId(self.next_id);
        self.next_id = self.next_id.wrapping_add(1);
        self.entries.push((id, Box::new(observer)));
        id
    }

    /// Removes an observer. Returns `false` when the id is unknown.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|(entry, _)| *entry != id);
        self.entries.len() != before
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(feature = "alloc")]
impl fmt::Debug for ObserverList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObserverList")
            .field("subscribers", &self.entries.len())
            .finish()
    }
}

#[cfg(feature = "alloc")]
impl TransitionObserver for ObserverList {
    fn on_step_entered(&mut self, index: usize, step: &StepDefinition) -> Result<(), ObserverFault> {
        self.entries
            .iter_mut()
            .fold(Ok(()), |result, (_, observer)| {
                merge_results(result, observer.on_step_entered(index, step))
            })
    }

    fn on_recipe_complete(&mut self) -> Result<(), ObserverFault> {
        self.entries
            .iter_mut()
            .fold(Ok(()), |result, (_, observer)| {
                merge_results(result, observer.on_recipe_complete())
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recipes::RecipeKind;
    use crate::sequencer::StepSequencer;

    type CallLog = Rc<RefCell<Vec<&'static str>>>;

    /// Appends its name to a log shared with other observers.
    struct Named {
        name: &'static str,
        log: CallLog,
    }

    impl Named {
        fn new(name: &'static str, log: &CallLog) -> Self {
            Self {
                name,
                log: Rc::clone(log),
            }
        }
    }

    impl TransitionObserver for Named {
        fn on_step_entered(&mut self, _: usize, _: &StepDefinition) -> Result<(), ObserverFault> {
            self.log.borrow_mut().push(self.name);
            Ok(())
        }

        fn on_recipe_complete(&mut self) -> Result<(), ObserverFault> {
            self.log.borrow_mut().push(self.name);
            Ok(())
        }
    }

    #[derive(Default)]
    struct Counter {
        entered: u32,
        completed: u32,
        fail: bool,
    }

    impl TransitionObserver for Counter {
        fn on_step_entered(&mut self, _: usize, _: &StepDefinition) -> Result<(), ObserverFault> {
            self.entered += 1;
            if self.fail {
                Err(ObserverFault::new("counter refused"))
            } else {
                Ok(())
            }
        }

        fn on_recipe_complete(&mut self) -> Result<(), ObserverFault> {
            self.completed += 1;
            Ok(())
        }
    }

    #[test]
    fn pair_notifies_second_observer_after_first_fails() {
        let recipe = RecipeKind::Fufu.recipe().expect("fufu builds");
        let step = recipe.step(0).expect("first step");
        let mut pair = (
            Counter {
                fail: true,
                ..Counter::default()
            },
            Counter::default(),
        );

        let result = pair.on_step_entered(0, step);

        assert_eq!(result, Err(ObserverFault::new("counter refused")));
        assert_eq!(pair.0.entered, 1);
        assert_eq!(pair.1.entered, 1);
    }

    #[test]
    fn faults_merge_counts_and_keep_first_reason() {
        let merged = merge_results(
            Err(ObserverFault::new("first")),
            Err(ObserverFault::new("second")),
        )
        .expect_err("both failed");

        assert_eq!(merged.reason(), "first");
        assert_eq!(merged.count(), 2);
    }

    #[test]
    fn observer_list_notifies_in_subscription_order() {
        let recipe = RecipeKind::Fufu.recipe().expect("fufu builds");
        let step = recipe.step(0).expect("first step");
        let log = CallLog::default();
        let mut list = ObserverList::new();
        list.subscribe(Named::new("first", &log));
        list.subscribe(Named::new("second", &log));

        assert_eq!(list.on_step_entered(0, step), Ok(()));
        assert_eq!(log.borrow().as_slice(), &["first", "second"]);

        assert_eq!(list.on_recipe_complete(), Ok(()));
        assert_eq!(
            log.borrow().as_slice(),
            &["first", "second", "first", "second"]
        );
    }

    #[test]
    fn tuples_notify_left_to_right() {
        let recipe = RecipeKind::Fufu.recipe().expect("fufu builds");
        let step = recipe.step(0).expect("first step");
        let log = CallLog::default();

        let mut pair = (Named::new("first", &log), Named::new("second", &log));
        assert_eq!(pair.on_step_entered(0, step), Ok(()));
        assert_eq!(log.borrow().as_slice(), &["first", "second"]);

        log.borrow_mut().clear();
        let mut triple = (
            Named::new("first", &log),
            Named::new("second", &log),
            Named::new("third", &log),
        );
        assert_eq!(triple.on_recipe_complete(), Ok(()));
        assert_eq!(log.borrow().as_slice(), &["first", "second", "third"]);
    }

    #[test]
    fn sequencer_transitions_reach_subscribers_in_order() {
        let log = CallLog::default();
        let mut list = ObserverList::new();
        list.subscribe(Named::new("first", &log));
        list.subscribe(Named::new("second", &log));
        let mut sequencer =
            StepSequencer::with_observers(RecipeKind::Fufu.recipe().expect("fufu builds"), list);

        sequencer.complete_current_step();
        assert_eq!(log.borrow().as_slice(), &["first", "second"]);

        log.borrow_mut().clear();
        while !sequencer.is_complete() {
            sequencer.complete_current_step();
        }
        let calls = log.borrow();
        assert_eq!(calls.len() % 2, 0);
        assert!(calls.chunks(2).all(|pair| pair == ["first", "second"]));
        assert_eq!(sequencer.diagnostics().observer_faults, 0);
    }

    #[test]
    fn observer_list_unsubscribe_stops_notifications() {
        let first = Rc::new(RefCell::new(Counter::default()));
        let second = Rc::new(RefCell::new(Counter::default()));
        let mut list = ObserverList::new();
        let first_id = list.subscribe(Rc::clone(&first));
        list.subscribe(Rc::clone(&second));

        assert_eq!(list.on_recipe_complete(), Ok(()));
        assert!(list.unsubscribe(first_id));
        assert!(!list.unsubscribe(first_id));
        assert_eq!(list.on_recipe_complete(), Ok(()));

        assert_eq!(first.borrow().completed, 1);
        assert_eq!(second.borrow().completed, 2);
        assert_eq!(list.len(), 1);
    }

    #[test]
    fn borrowed_shared_observer_reports_fault() {
        let shared = Rc::new(RefCell::new(Counter::default()));
        let mut handle = Rc::clone(&shared);
        let guard = shared.borrow();

        assert_eq!(
            handle.on_recipe_complete(),
            Err(ObserverFault::new(SHARED_OBSERVER_BUSY))
        );
        drop(guard);
        assert_eq!(handle.on_recipe_complete(), Ok(()));
    }
}
