//! Fufu recipe template.
//!
//! The yams are peeled, boiled and drained, then pounded in three rounds
//! with water sprinkled in between. Ids are suffixed per round because
//! sensors bind to a single id.

use core::time::Duration;

use super::{CompletionPolicy, RecipeKind, RecipeTemplate, StepSpec};

/// Continuous time the pot must sit on the fire for the yams to soften.
pub const BOIL_YAMS: Duration = Duration::from_secs(5);
/// Time the pot must be tipped over the sink to drain.
pub const DRAIN_WATER: Duration = Duration::from_secs(5);
/// Time the dough must be held in hand to form a ball.
pub const ROLL_BALL: Duration = Duration::from_secs(3);
/// Pestle strikes needed per pounding round.
pub const POUNDS_PER_ROUND: u32 = 3;

/// Ordered steps for the `Fufu` recipe.
pub const FUFU_STEPS: [StepSpec<'static>; 12] = [
    StepSpec::new(
        "peel-yams",
        "Peel the yams",
        "Knife",
        CompletionPolicy::ActionCount(4),
    )
    .with_side_effect("yams-peeled"),
    StepSpec::new(
        "boil-water",
        "Add water and bring to a boil",
        "Pot",
        CompletionPolicy::Instant,
    )
    .with_side_effect("pot-water"),
    StepSpec::new(
        "yams-in-water",
        "Place yams in water",
        "Pot",
        CompletionPolicy::Instant,
    )
    .with_side_effect("pot-yams"),
    StepSpec::new(
        "boil-yams",
        "Boil yams until they are soft",
        "Pot",
        CompletionPolicy::TimeElapsed(BOIL_YAMS),
    )
    .with_side_effect("yams-soft"),
    StepSpec::new(
        "drain-water",
        "Drain water",
        "Pot",
        CompletionPolicy::TimeElapsed(DRAIN_WATER),
    )
    .with_side_effect("pot-drained"),
    StepSpec::new(
        "yams-to-mortar",
        "Move yams to mortar",
        "Pestle",
        CompletionPolicy::Instant,
    )
    .with_side_effect("mortar-yams"),
    StepSpec::new(
        "pound-1",
        "Pound yams with pestle",
        "Pestle",
        CompletionPolicy::ActionCount(POUNDS_PER_ROUND),
    )
    .with_side_effect("dough-rough"),
    StepSpec::new(
        "sprinkle-1",
        "Sprinkle water",
        "Water",
        CompletionPolicy::Instant,
    )
    .with_side_effect("dough-wet"),
    StepSpec::new(
        "pound-2",
        "Pound yams with pestle",
        "Pestle",
        CompletionPolicy::ActionCount(POUNDS_PER_ROUND),
    )
    .with_side_effect("dough-lumpy"),
    StepSpec::new(
        "sprinkle-2",
        "Sprinkle water",
        "Water",
        CompletionPolicy::Instant,
    )
    .with_side_effect("dough-wet"),
    StepSpec::new(
        "pound-3",
        "Pound yams with pestle",
        "Pestle",
        CompletionPolicy::ActionCount(POUNDS_PER_ROUND),
    )
    .with_side_effect("dough-smooth"),
    StepSpec::new(
        "roll-ball",
        "Roll into a ball",
        "Hand",
        CompletionPolicy::TimeElapsed(ROLL_BALL),
    )
    .with_side_effect("fufu-ball"),
];

/// Recipe template describing the `Fufu` dish.
pub const FUFU_TEMPLATE: RecipeTemplate = RecipeTemplate::new(RecipeKind::Fufu, &FUFU_STEPS);

/// Returns the shared `Fufu` template.
#[must_use]
pub const fn fufu_template() -> RecipeTemplate {
    FUFU_TEMPLATE
}
