use core::time::Duration;

use recipe_core::observer::{ObserverFault, TransitionObserver};
use recipe_core::recipes::{CompletionPolicy, Recipe, RecipeKind, StepDefinition, StepSpec};
use recipe_core::sequencer::{NoChange, ProgressEvent, StepOutcome, StepSequencer, TimerMode};

/// Deterministic operation generator so failures reproduce.
struct Lcg(u64);

impl Lcg {
    fn next(&mut self) -> u64 {
        self.0 = self
            .0
            .wrapping_mul(6_364_136_223_846_793_005)
            .wrapping_add(1_442_695_040_888_963_407);
        self.0 >> 33
    }

    fn event(&mut self) -> ProgressEvent {
        match self.next() % 8 {
            0 => ProgressEvent::InstantAction,
            1 | 2 => ProgressEvent::Action,
            3 => ProgressEvent::ActionUndo,
            4 => ProgressEvent::TimerStart,
            5 => ProgressEvent::TimerStop,
            6 => ProgressEvent::Tick(Duration::from_millis(self.next() % 2_000)),
            _ => ProgressEvent::CompleteStep,
        }
    }
}

#[derive(Default)]
struct Counter {
    entered: Vec<usize>,
    completions: u32,
}

impl TransitionObserver for Counter {
    fn on_step_entered(&mut self, index: usize, _step: &StepDefinition) -> Result<(), ObserverFault> {
        self.entered.push(index);
        Ok(())
    }

    fn on_recipe_complete(&mut self) -> Result<(), ObserverFault> {
        self.completions += 1;
        Ok(())
    }
}

struct Failing;

impl TransitionObserver for Failing {
    fn on_step_entered(&mut self, _index: usize, _step: &StepDefinition) -> Result<(), ObserverFault> {
        Err(ObserverFault::new("highlight missing"))
    }

    fn on_recipe_complete(&mut self) -> Result<(), ObserverFault> {
        Err(ObserverFault::new("banner missing"))
    }
}

fn scenario_recipe() -> Recipe {
    Recipe::from_specs(
        "scenario",
        &[
            StepSpec::new("light", "Light the fire", "Match", CompletionPolicy::Instant),
            StepSpec::new("chop", "Chop", "Knife", CompletionPolicy::ActionCount(3)),
            StepSpec::new(
                "simmer",
                "Simmer",
                "Pot",
                CompletionPolicy::TimeElapsed(Duration::from_secs(5)),
            ),
        ],
    )
    .expect("scenario recipe builds")
}

#[test]
fn random_operations_keep_the_sequencer_consistent() {
    for seed in 0..64 {
        let mut rng = Lcg(seed);
        let kind = RecipeKind::ALL[usize::try_from(seed % 2).expect("index fits")];
        let recipe = kind.recipe().expect("built-in recipe builds");
        let len = recipe.len();
        let mut sequencer = StepSequencer::with_observers(recipe, Counter::default());

        let mut previous = sequencer.current_index();
        for _ in 0..400 {
            let outcome = sequencer.apply(rng.event());
            let index = sequencer.current_index();

            assert!(index >= previous, "seed {seed}: index went backwards");
            assert!(index <= len, "seed {seed}: index past the end");
            if outcome.is_transition() {
                assert_eq!(sequencer.action_tally(), 0, "seed {seed}: tally kept");
                assert!(!sequencer.timer_running(), "seed {seed}: timer kept");
                assert_eq!(sequencer.timer().elapsed(), Duration::ZERO);
            } else {
                assert_eq!(index, previous, "seed {seed}: moved without transition");
            }
            previous = index;
        }

        let counter = sequencer.observers();
        assert!(counter.completions <= 1, "seed {seed}: completed twice");
        assert_eq!(counter.entered.len(), previous.min(len - 1));
        assert!(counter.entered.windows(2).all(|pair| pair[1] == pair[0] + 1));
    }
}

#[test]
fn action_count_needs_exactly_n_reports() {
    for required in 1..=6 {
        let recipe = Recipe::from_specs(
            "count",
            &[
                StepSpec::new("count", "Count", "Hand", CompletionPolicy::ActionCount(required)),
                StepSpec::new("rest", "Rest", "Hand", CompletionPolicy::Instant),
            ],
        )
        .expect("count recipe builds");
        let mut sequencer = StepSequencer::new(recipe);

        for _ in 1..required {
            assert_eq!(sequencer.report_action(), StepOutcome::Progressed);
        }
        assert_eq!(sequencer.current_index(), 0);
        assert_eq!(
            sequencer.report_action(),
            StepOutcome::Advanced { index: 1 }
        );
    }
}

#[test]
fn undo_never_goes_below_zero() {
    let mut sequencer = StepSequencer::new(scenario_recipe());
    sequencer.complete_current_step();

    for _ in 0..3 {
        assert_eq!(
            sequencer.report_action_undo(),
            StepOutcome::Unchanged(NoChange::AtFloor)
        );
    }
    assert_eq!(sequencer.action_tally(), 0);
    assert_eq!(sequencer.diagnostics().policy_mismatches, 0);

    sequencer.report_action();
    sequencer.report_action_undo();
    sequencer.report_action_undo();
    assert_eq!(sequencer.action_tally(), 0);
}

#[test]
fn interrupted_timer_restarts_from_zero() {
    let full = Duration::from_secs(5);
    let half = full / 2;
    let mut sequencer = StepSequencer::new(scenario_recipe());
    sequencer.complete_current_step();
    sequencer.complete_current_step();

    sequencer.report_timer_start();
    sequencer.tick(half);
    sequencer.report_timer_stop();
    sequencer.report_timer_start();
    assert_eq!(sequencer.tick(half), StepOutcome::Progressed);
    assert_eq!(sequencer.current_index(), 2);

    sequencer.report_timer_stop();
    sequencer.report_timer_start();
    assert_eq!(sequencer.tick(full), StepOutcome::RecipeComplete);
}

#[test]
fn timer_start_while_running_is_ignored() {
    let mut sequencer = StepSequencer::new(scenario_recipe());
    sequencer.complete_current_step();
    sequencer.complete_current_step();

    sequencer.report_timer_start();
    sequencer.tick(Duration::from_secs(3));
    assert_eq!(
        sequencer.report_timer_start(),
        StepOutcome::Unchanged(NoChange::AlreadyRunning)
    );
    assert_eq!(sequencer.timer().elapsed(), Duration::from_secs(3));
    assert_eq!(sequencer.timer().mode(), TimerMode::Running);
}

#[test]
fn stop_then_ticks_stay_on_the_step() {
    let mut sequencer = StepSequencer::new(scenario_recipe());
    sequencer.complete_current_step();
    sequencer.complete_current_step();

    sequencer.report_timer_start();
    sequencer.tick(Duration::from_secs(3));
    sequencer.report_timer_stop();
    sequencer.tick(Duration::from_secs(10));

    assert_eq!(sequencer.current_index(), 2);
    assert!(!sequencer.is_complete());
}

#[test]
fn terminal_state_notifies_nobody() {
    let mut sequencer = StepSequencer::with_observers(scenario_recipe(), Counter::default());
    sequencer.report_instant_action();
    for _ in 0..3 {
        sequencer.report_action();
    }
    sequencer.report_timer_start();
    assert_eq!(
        sequencer.tick(Duration::from_secs(5)),
        StepOutcome::RecipeComplete
    );

    for event in [
        ProgressEvent::InstantAction,
        ProgressEvent::Action,
        ProgressEvent::ActionUndo,
        ProgressEvent::TimerStart,
        ProgressEvent::TimerStop,
        ProgressEvent::Tick(Duration::from_secs(1)),
        ProgressEvent::CompleteStep,
    ] {
        assert_eq!(
            sequencer.apply(event),
            StepOutcome::Unchanged(NoChange::Terminal)
        );
    }

    let counter = sequencer.observers();
    assert_eq!(counter.entered, [1, 2]);
    assert_eq!(counter.completions, 1);
}

#[test]
fn failing_observer_does_not_block_later_observers() {
    let mut sequencer =
        StepSequencer::with_observers(scenario_recipe(), (Failing, Counter::default()));

    assert_eq!(
        sequencer.report_instant_action(),
        StepOutcome::Advanced { index: 1 }
    );
    sequencer.complete_current_step();
    assert_eq!(
        sequencer.complete_current_step(),
        StepOutcome::RecipeComplete
    );

    let (_, counter) = sequencer.observers();
    assert_eq!(counter.entered, [1, 2]);
    assert_eq!(counter.completions, 1);
    assert_eq!(sequencer.diagnostics().observer_faults, 3);
    assert!(sequencer.is_complete());
}

#[test]
fn reset_swaps_recipes_and_announces_step_zero() {
    let mut sequencer = StepSequencer::with_observers(scenario_recipe(), Counter::default());
    sequencer.report_action();

    let fufu = RecipeKind::Fufu.recipe().expect("fufu builds");
    assert_eq!(sequencer.reset(fufu), StepOutcome::Advanced { index: 0 });
    assert_eq!(sequencer.recipe().name(), "fufu");
    assert_eq!(sequencer.observers().entered, [0]);
    assert_eq!(sequencer.diagnostics().policy_mismatches, 1);
}
