use core::time::Duration;

use recipe_core::recipes::RecipeKind;
use recipe_core::sensor::{
    Contact, ContactSensor, SensorBinding, SensorKind, SensorOutcome, Suppression,
};
use recipe_core::sequencer::{StepOutcome, StepSequencer};

fn jollof() -> StepSequencer {
    StepSequencer::new(RecipeKind::JollofRice.recipe().expect("jollof builds"))
}

fn slicing_zone(sequencer: &StepSequencer, step: &str, tag: &str) -> ContactSensor {
    let binding =
        SensorBinding::bind(sequencer.recipe(), step, SensorKind::Actions).expect("step exists");
    ContactSensor::new(binding)
        .with_required_tag(tag)
        .expect("tag fits")
}

#[test]
fn jollof_can_be_cooked_with_sensors_alone() {
    let mut sequencer = jollof();
    let mut tomatoes = slicing_zone(&sequencer, "slice-tomatoes", "tomato");
    let mut peppers = slicing_zone(&sequencer, "slice-peppers", "pepper");
    let mut onions = slicing_zone(&sequencer, "slice-onions", "onion");
    let pestle = SensorBinding::bind(sequencer.recipe(), "grind-paste", SensorKind::Actions)
        .expect("grind step exists");
    let pot = SensorBinding::any_step(SensorKind::Instant);
    let stir_binding =
        SensorBinding::bind(sequencer.recipe(), "stir-rice", SensorKind::Seconds)
            .expect("stir step exists");
    let mut spoon: ContactSensor = ContactSensor::new(stir_binding);

    // Peppers dropped in early are neither counted nor tracked.
    assert_eq!(
        peppers.enter(&mut sequencer, Contact::new(20, "pepper")),
        SensorOutcome::Suppressed(Suppression::WrongStep)
    );
    assert_eq!(peppers.occupancy(), 0);

    tomatoes.enter(&mut sequencer, Contact::new(1, "tomato"));
    tomatoes.enter(&mut sequencer, Contact::new(2, "tomato"));
    assert_eq!(
        tomatoes.exit(&mut sequencer, 2),
        SensorOutcome::Reported(StepOutcome::Progressed)
    );
    assert_eq!(sequencer.action_tally(), 1);
    tomatoes.enter(&mut sequencer, Contact::new(2, "tomato"));
    assert_eq!(
        tomatoes.enter(&mut sequencer, Contact::new(3, "tomato")),
        SensorOutcome::Reported(StepOutcome::Advanced { index: 1 })
    );

    for id in 20..22 {
        peppers.enter(&mut sequencer, Contact::new(id, "pepper"));
    }
    for id in 30..32 {
        onions.enter(&mut sequencer, Contact::new(id, "onion"));
    }
    assert_eq!(sequencer.current_index(), 3);

    // Leftover tomatoes leaving the mortar do not undo later steps.
    for id in 1..4 {
        assert_eq!(
            tomatoes.exit(&mut sequencer, id),
            SensorOutcome::Suppressed(Suppression::WrongStep)
        );
    }

    for _ in 0..5 {
        pestle.try_progress(&mut sequencer);
    }
    assert_eq!(sequencer.current_index(), 4);

    pot.try_progress(&mut sequencer);
    pot.try_progress(&mut sequencer);
    assert_eq!(
        pot.try_progress(&mut sequencer),
        SensorOutcome::Suppressed(Suppression::WrongPolicy)
    );
    assert_eq!(
        sequencer.tick(Duration::from_secs(3)),
        StepOutcome::Advanced { index: 7 }
    );

    spoon.enter(&mut sequencer, Contact::new(40, "spoon"));
    sequencer.tick(Duration::from_secs(4));
    assert_eq!(
        spoon.exit(&mut sequencer, 40),
        SensorOutcome::Reported(StepOutcome::Progressed)
    );
    spoon.enter(&mut sequencer, Contact::new(40, "spoon"));
    assert_eq!(
        sequencer.tick(Duration::from_secs(5)),
        StepOutcome::RecipeComplete
    );
    assert_eq!(
        spoon.exit(&mut sequencer, 40),
        SensorOutcome::Suppressed(Suppression::RecipeComplete)
    );

    assert_eq!(sequencer.diagnostics().policy_mismatches, 0);
}

#[test]
fn waived_action_zone_undoes_on_exit() {
    let mut sequencer = jollof();
    let mut mortar: ContactSensor = ContactSensor::new(SensorBinding::any_step(SensorKind::Actions));

    mortar.enter(&mut sequencer, Contact::new(1, "tomato"));
    mortar.enter(&mut sequencer, Contact::new(2, "tomato"));
    assert_eq!(sequencer.action_tally(), 2);

    mortar.exit(&mut sequencer, 1);
    mortar.exit(&mut sequencer, 2);
    assert_eq!(sequencer.action_tally(), 0);
    assert_eq!(mortar.exit(&mut sequencer, 2), SensorOutcome::Untracked);
    assert_eq!(sequencer.current_index(), 0);
}

#[test]
fn clearing_after_restart_forgets_bodies() {
    let mut sequencer = jollof();
    let mut mortar: ContactSensor = ContactSensor::new(SensorBinding::any_step(SensorKind::Actions));

    mortar.enter(&mut sequencer, Contact::new(1, "tomato"));
    sequencer.restart();
    mortar.clear();

    assert!(!mortar.is_tracking(1));
    assert_eq!(
        mortar.enter(&mut sequencer, Contact::new(1, "tomato")),
        SensorOutcome::Reported(StepOutcome::Progressed)
    );
    assert_eq!(sequencer.action_tally(), 1);
}
