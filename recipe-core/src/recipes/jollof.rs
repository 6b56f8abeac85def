//! Jollof rice recipe template.
//!
//! Three slicing rounds feed the mortar, the pestle grinds the paste, and the
//! pot does the rest. The rice step runs on its own once current; stirring
//! needs the spoon held in the pot for the full duration.

use core::time::Duration;

use super::{CompletionPolicy, RecipeKind, RecipeTemplate, StepSpec};

/// Time the rice needs to absorb the stew once it is in the pot.
pub const RICE_ABSORB: Duration = Duration::from_secs(3);
/// Continuous stirring required before the dish is done.
pub const STIR_UNTIL_ABSORBED: Duration = Duration::from_secs(5);

/// Ordered steps for the `JollofRice` recipe.
pub const JOLLOF_RICE_STEPS: [StepSpec<'static>; 8] = [
    StepSpec::new(
        "slice-tomatoes",
        "Slice tomatoes and place in mortar",
        "Mortar",
        CompletionPolicy::ActionCount(3),
    )
    .with_side_effect("mortar-tomatoes"),
    StepSpec::new(
        "slice-peppers",
        "Slice peppers and place in mortar",
        "Mortar",
        CompletionPolicy::ActionCount(2),
    )
    .with_side_effect("mortar-peppers"),
    StepSpec::new(
        "slice-onions",
        "Slice onions and place in mortar",
        "Mortar",
        CompletionPolicy::ActionCount(2),
    )
    .with_side_effect("mortar-onions"),
    StepSpec::new(
        "grind-paste",
        "Grind everything into a paste",
        "Pestle",
        CompletionPolicy::ActionCount(5),
    )
    .with_side_effect("mortar-paste"),
    StepSpec::new(
        "boil-water",
        "Add water to pot and bring to a boil",
        "Pot",
        CompletionPolicy::Instant,
    )
    .with_side_effect("pot-water"),
    // The stew texture swaps in here.
    StepSpec::new(
        "add-paste",
        "Add paste, spices, and meat to the stew",
        "Pot",
        CompletionPolicy::Instant,
    )
    .with_side_effect("pot-stew"),
    StepSpec::new(
        "add-rice",
        "Add rice to the pot; it will absorb the stew",
        "Pot",
        CompletionPolicy::Auto(RICE_ABSORB),
    )
    .with_side_effect("pot-rice"),
    StepSpec::new(
        "stir-rice",
        "Stir the rice until all the liquid is absorbed",
        "Pot",
        CompletionPolicy::TimeElapsed(STIR_UNTIL_ABSORBED),
    )
    .with_side_effect("pot-jollof"),
];

/// Recipe template describing the `JollofRice` dish.
pub const JOLLOF_RICE_TEMPLATE: RecipeTemplate =
    RecipeTemplate::new(RecipeKind::JollofRice, &JOLLOF_RICE_STEPS);

/// Returns the shared `JollofRice` template.
#[must_use]
pub const fn jollof_rice_template() -> RecipeTemplate {
    JOLLOF_RICE_TEMPLATE
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recipes::PolicyKind;

    #[test]
    fn jollof_rice_matches_the_kitchen_board() {
        assert_eq!(JOLLOF_RICE_TEMPLATE.kind, RecipeKind::JollofRice);
        assert_eq!(JOLLOF_RICE_TEMPLATE.step_count(), 8);

        let grind = &JOLLOF_RICE_STEPS[3];
        assert_eq!(grind.id, "grind-paste");
        assert_eq!(grind.utensil, "Pestle");
        assert_eq!(grind.policy, CompletionPolicy::ActionCount(5));

        let rice = &JOLLOF_RICE_STEPS[6];
        assert_eq!(rice.policy, CompletionPolicy::Auto(RICE_ABSORB));
        assert_eq!(rice.side_effect, Some("pot-rice"));

        let stir = &JOLLOF_RICE_STEPS[7];
        assert_eq!(stir.policy.kind(), PolicyKind::TimeElapsed);
        assert_eq!(stir.policy.required_duration(), Some(STIR_UNTIL_ABSORBED));
    }

    #[test]
    fn jollof_rice_template_validates() {
        let recipe = jollof_rice_template()
            .build()
            .expect("jollof template should validate");
        assert_eq!(recipe.name(), "jollof-rice");
        assert_eq!(recipe.index_of("add-paste"), Some(5));
        assert!(recipe.steps().iter().all(|step| step.side_effect.is_some()));
    }
}
